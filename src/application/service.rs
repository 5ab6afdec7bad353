use std::path::Path;

use anyhow::Context;

use crate::domain::{
    is_valid_account_name, AccountRecord, HistoryEntry, LocalHistoryRow, MinorUnits,
};
use crate::storage::Repository;

use super::{Account, AppError, OpenStatus};

/// Application service owning the store handle.
/// This is the primary interface for any client (CLI, tests, embedding programs).
pub struct Ledger {
    repo: Repository,
}

impl Ledger {
    /// Create a new ledger over the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open the store at `database_path`, creating the file, its parent
    /// directory and the schema when missing.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing store without touching the schema.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Release the store. Account handles opened from this ledger stop working.
    pub async fn close(self) {
        self.repo.close().await;
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Account operations
    // ========================

    /// Find-or-create the account `name` and return a handle over it.
    /// `initial_balance` (default 0) only applies when the account is created.
    pub async fn open_account(
        &self,
        name: &str,
        initial_balance: Option<MinorUnits>,
    ) -> Result<(Account, OpenStatus), AppError> {
        if !is_valid_account_name(name) {
            return Err(AppError::InvalidAccountName(name.to_string()));
        }
        Account::open(self.repo.clone(), name, initial_balance).await
    }

    /// Look up the stored state of an account without creating it.
    pub async fn get_account(&self, name: &str) -> Result<AccountRecord, AppError> {
        self.repo
            .get_account(name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    // ========================
    // History
    // ========================

    /// Raw history entries in chronological order.
    pub async fn history(&self, account: Option<&str>) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.repo.list_history(account).await?)
    }

    /// History rendered in the local zone of this machine.
    pub async fn local_history(
        &self,
        account: Option<&str>,
    ) -> Result<Vec<LocalHistoryRow>, AppError> {
        Ok(self.repo.local_history(account).await?)
    }

    pub async fn history_count(&self, account: &str) -> Result<i64, AppError> {
        Ok(self.repo.count_history(account).await?)
    }
}
