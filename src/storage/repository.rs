use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    format_timestamp, parse_timestamp, timestamp_resolution, AccountRecord, HistoryEntry,
    LocalHistoryRow, MinorUnits,
};

use super::{MIGRATION_001_INITIAL, REQUIRED_COLUMNS};

/// How long a connection waits for another writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 4;

/// Typed root causes carried inside the `anyhow` errors returned by [`Repository`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("incompatible schema for table `{table}`: {detail}")]
    SchemaMismatch { table: String, detail: String },
}

/// Result of a committed balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedDelta {
    /// Balance after the change.
    pub balance: MinorUnits,
    /// Timestamp the history entry was recorded under.
    pub time: DateTime<Utc>,
}

/// Repository for persisting accounts and their history log.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    /// Use a `?mode=rwc` URL to create the file when it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = database_url
            .parse::<SqliteConnectOptions>()
            .context("Invalid database URL")?
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the tables and the local-time view when missing.
    ///
    /// Safe on every startup: existing data is untouched, and tables that
    /// already exist must expose the expected columns.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.verify_schema(false).await?;

        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        self.verify_schema(true).await?;
        debug!("schema ready");
        Ok(())
    }

    /// Initialize a database (connect + schema).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Close every pooled connection. Further queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn verify_schema(&self, require_tables: bool) -> Result<()> {
        for (table, required) in REQUIRED_COLUMNS {
            let rows = sqlx::query("SELECT name FROM pragma_table_info(?)")
                .bind(*table)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to inspect table {}", table))?;

            if rows.is_empty() {
                if require_tables {
                    return Err(StoreError::SchemaMismatch {
                        table: table.to_string(),
                        detail: "table is missing".into(),
                    }
                    .into());
                }
                continue;
            }

            let present: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
            let missing: Vec<&str> = required
                .iter()
                .copied()
                .filter(|column| !present.iter().any(|p| p.as_str() == *column))
                .collect();

            if !missing.is_empty() {
                return Err(StoreError::SchemaMismatch {
                    table: table.to_string(),
                    detail: format!("missing column(s): {}", missing.join(", ")),
                }
                .into());
            }
        }
        Ok(())
    }

    // ========================
    // Account operations
    // ========================

    /// Get an account by name.
    pub async fn get_account(&self, name: &str) -> Result<Option<AccountRecord>> {
        let row = sqlx::query("SELECT name, balance FROM accounts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        Ok(row.map(|row| AccountRecord::new(row.get::<String, _>("name"), row.get("balance"))))
    }

    /// Insert a new account row.
    /// Fails with [`StoreError::AccountExists`] when the name is taken.
    pub async fn create_account(&self, name: &str, initial_balance: MinorUnits) -> Result<()> {
        let result = sqlx::query("INSERT INTO accounts (name, balance) VALUES (?, ?)")
            .bind(name)
            .bind(initial_balance)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::AccountExists(name.to_string()).into())
            }
            Err(err) => Err(err).context("Failed to create account"),
        }
    }

    /// List all accounts ordered by name.
    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let rows = sqlx::query("SELECT name, balance FROM accounts ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        Ok(rows
            .iter()
            .map(|row| AccountRecord::new(row.get::<String, _>("name"), row.get("balance")))
            .collect())
    }

    // ========================
    // Balance changes
    // ========================

    /// Add `delta` to the balance of `name` and append the matching history
    /// entry, all in one transaction.
    ///
    /// The balance update runs first so the transaction holds the write lock
    /// before anything is read. If `timestamp` is not later than the newest
    /// entry of the account, it is moved one microsecond past that entry.
    pub async fn apply_delta(
        &self,
        name: &str,
        delta: MinorUnits,
        timestamp: DateTime<Utc>,
        zone: &[u8],
    ) -> Result<AppliedDelta> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?
            WHERE name = ?
            RETURNING balance
            "#,
        )
        .bind(delta)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update balance")?;

        let Some(row) = row else {
            return Err(StoreError::AccountNotFound(name.to_string()).into());
        };
        let balance: MinorUnits = row.get("balance");

        let latest: Option<String> =
            sqlx::query_scalar("SELECT MAX(time) FROM history WHERE account = ?")
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to read latest history timestamp")?;

        let mut time = timestamp.trunc_subsecs(6);
        if let Some(latest) = latest {
            let latest = parse_timestamp(&latest)
                .with_context(|| format!("Invalid history timestamp: {}", latest))?;
            if time <= latest {
                time = latest + timestamp_resolution();
            }
        }

        sqlx::query(
            r#"
            INSERT INTO history (time, account, amount, zone)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(format_timestamp(time))
        .bind(name)
        .bind(delta)
        .bind(zone)
        .execute(&mut *tx)
        .await
        .context("Failed to append history entry")?;

        tx.commit()
            .await
            .context("Failed to commit balance change")?;

        debug!(account = name, delta, balance, "balance change committed");
        Ok(AppliedDelta { balance, time })
    }

    // ========================
    // History queries
    // ========================

    /// List history entries in chronological order, optionally for one account.
    pub async fn list_history(&self, account: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT time, account, amount, zone
            FROM history
            WHERE ?1 IS NULL OR account = ?1
            ORDER BY time, rowid
            "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list history")?;

        rows.iter().map(Self::row_to_history).collect()
    }

    /// Read the `localhistory` view, optionally for one account.
    pub async fn local_history(&self, account: Option<&str>) -> Result<Vec<LocalHistoryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT localtime, account, amount
            FROM localhistory
            WHERE ?1 IS NULL OR account = ?1
            "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read local history")?;

        Ok(rows
            .iter()
            .map(|row| LocalHistoryRow {
                localtime: row.get("localtime"),
                account: row.get("account"),
                amount: row.get("amount"),
            })
            .collect())
    }

    /// Count history entries recorded for an account.
    pub async fn count_history(&self, account: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE account = ?")
            .bind(account)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count history")?;
        Ok(count)
    }

    fn row_to_history(row: &SqliteRow) -> Result<HistoryEntry> {
        let time_str: String = row.get("time");

        Ok(HistoryEntry {
            time: parse_timestamp(&time_str)
                .with_context(|| format!("Invalid history timestamp: {}", time_str))?,
            account: row.get("account"),
            amount: row.get("amount"),
            zone: row.get("zone"),
        })
    }
}
