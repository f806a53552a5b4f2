#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kwh_ledger::server::run().await
}
