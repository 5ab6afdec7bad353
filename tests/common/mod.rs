// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use ledgerly::application::Ledger;
use tempfile::TempDir;

/// Helper to create a ledger over a temporary database
pub async fn test_ledger() -> Result<(Ledger, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let ledger = Ledger::init(db_path.to_str().unwrap()).await?;
    Ok((ledger, temp_dir))
}

/// Path of the database file inside a test directory
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Sum of all history amounts recorded for an account
pub async fn history_total(ledger: &Ledger, account: &str) -> Result<i64> {
    Ok(ledger
        .history(Some(account))
        .await?
        .iter()
        .map(|entry| entry.amount)
        .sum())
}
