mod repository;

pub use repository::*;

/// SQL bootstrap for the accounts/history schema. Every statement is idempotent.
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Columns each table must expose for the store to operate on it.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("accounts", &["name", "balance"]),
    ("history", &["time", "account", "amount", "zone"]),
];
