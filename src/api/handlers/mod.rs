//! REST API handlers organized by domain.

pub mod anchoring;
pub mod batches;
pub mod logs;
pub mod proofs;

pub use anchoring::*;
pub use batches::*;
pub use logs::*;
pub use proofs::*;
