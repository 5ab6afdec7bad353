use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid account name: {0:?}")]
    InvalidAccountName(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Incompatible database schema: {0}")]
    Schema(String),

    #[error("Database error: {0:#}")]
    Storage(anyhow::Error),
}

impl AppError {
    /// Schema problems cannot be fixed by retrying within the same process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Schema(_))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::AccountExists(name)) => AppError::AccountAlreadyExists(name.clone()),
            Some(StoreError::AccountNotFound(name)) => AppError::AccountNotFound(name.clone()),
            Some(mismatch @ StoreError::SchemaMismatch { .. }) => {
                AppError::Schema(mismatch.to_string())
            }
            None => AppError::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_store_errors_map_to_typed_variants() {
        let err: AppError = anyhow::Error::from(StoreError::AccountExists("Tom".into())).into();
        assert!(matches!(err, AppError::AccountAlreadyExists(name) if name == "Tom"));

        let err: AppError = anyhow::Error::from(StoreError::SchemaMismatch {
            table: "history".into(),
            detail: "missing column(s): zone".into(),
        })
        .into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn test_other_errors_are_storage_errors() {
        let err: AppError = Err::<(), _>(std::io::Error::other("disk full"))
            .context("Failed to append history entry")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("disk full"));
    }
}
