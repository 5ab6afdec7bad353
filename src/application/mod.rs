// Application layer: the ledger service and the per-account handle.
// Validation of deposits and withdrawals is lenient: invalid requests are
// reported through the operation status, never as errors.

pub mod account;
pub mod error;
pub mod service;

pub use account::*;
pub use error::*;
pub use service::*;
