// Application layer - use cases and orchestration.
// The CLI and the integration tests only talk to `LedgerService`.

pub mod error;
mod sample;
pub mod service;

pub use error::*;
pub use sample::{SampleSummary, MANY_TXNS};
pub use service::*;
