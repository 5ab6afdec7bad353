pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;
pub mod telemetry;

pub use application::{Account, AppError, Ledger};
pub use domain::*;
pub use storage::Repository;
