use anyhow::Context;
use tracing::debug;

use crate::domain::{capture_now, format_major, to_major, AccountRecord, MinorUnits};
use crate::storage::{AppliedDelta, Repository};

use super::AppError;

/// Whether opening an account found an existing row or inserted a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Created,
    Retrieved,
}

/// Why a deposit or withdrawal was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The amount was zero or negative.
    NonPositiveAmount,
    /// The withdrawal exceeds the cached balance.
    InsufficientFunds {
        balance: MinorUnits,
        requested: MinorUnits,
    },
    /// The new balance would not fit in the balance column.
    BalanceOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Applied,
    Ignored(Rejection),
}

impl OperationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationStatus::Applied)
    }
}

/// Outcome of [`Account::deposit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositResult {
    pub status: OperationStatus,
    /// Balance after the call, changed or not.
    pub balance: MinorUnits,
}

impl DepositResult {
    /// The current balance in major units.
    pub fn major_units(&self) -> f64 {
        to_major(self.balance)
    }
}

/// Outcome of [`Account::withdraw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawResult {
    pub status: OperationStatus,
    /// Amount taken out; zero when ignored.
    pub amount: MinorUnits,
    /// Balance after the call, changed or not.
    pub balance: MinorUnits,
}

impl WithdrawResult {
    /// The withdrawn amount in major units, or 0 when nothing was withdrawn.
    /// Unlike [`DepositResult::major_units`] this is not the balance.
    pub fn major_units(&self) -> f64 {
        to_major(self.amount)
    }
}

/// Handle over one named account, caching its balance.
///
/// All balance changes go through [`Repository::apply_delta`]; the cache is
/// refreshed from the committed balance after each change. Reads of the
/// cache (`balance`, `show_balance`) never touch the store and can go stale
/// if another handle changes the same account.
pub struct Account {
    repo: Repository,
    name: String,
    balance: MinorUnits,
}

impl Account {
    /// Find the account named `name`, or create it with `initial_balance`
    /// (default 0). The initial balance is ignored for existing accounts.
    pub(crate) async fn open(
        repo: Repository,
        name: &str,
        initial_balance: Option<MinorUnits>,
    ) -> Result<(Self, OpenStatus), AppError> {
        let (record, status) = match repo.get_account(name).await? {
            Some(record) => (record, OpenStatus::Retrieved),
            None => {
                let balance = initial_balance.unwrap_or(0);
                match repo.create_account(name, balance).await.map_err(AppError::from) {
                    Ok(()) => (AccountRecord::new(name, balance), OpenStatus::Created),
                    // Another writer created it between our lookup and insert.
                    Err(AppError::AccountAlreadyExists(_)) => {
                        let record = repo
                            .get_account(name)
                            .await?
                            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))?;
                        (record, OpenStatus::Retrieved)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        match status {
            OpenStatus::Created => debug!(account = %record.name, "account created"),
            OpenStatus::Retrieved => debug!(account = %record.name, "retrieved record"),
        }

        let account = Self {
            repo,
            name: record.name,
            balance: record.balance,
        };
        account.show_balance();
        Ok((account, status))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached balance in minor units.
    pub fn balance(&self) -> MinorUnits {
        self.balance
    }

    /// The human-readable balance line, from the cache.
    pub fn balance_notice(&self) -> String {
        format!(
            "Balance on account {} is {}",
            self.name,
            format_major(self.balance)
        )
    }

    /// Emit the balance notice as a log event and return it. Reads the cache only.
    pub fn show_balance(&self) -> String {
        let notice = self.balance_notice();
        debug!(account = %self.name, balance = self.balance, "{}", notice);
        notice
    }

    /// Deposit `amount` minor units.
    ///
    /// Amounts of zero or less are ignored without touching the store.
    /// The result carries the balance after the call (see
    /// [`DepositResult::major_units`]).
    pub async fn deposit(&mut self, amount: MinorUnits) -> Result<DepositResult, AppError> {
        if amount <= 0 {
            debug!(account = %self.name, amount, "ignoring non-positive deposit");
            return Ok(self.ignored_deposit(Rejection::NonPositiveAmount));
        }
        if self.balance.checked_add(amount).is_none() {
            debug!(account = %self.name, amount, "deposit would overflow the balance");
            return Ok(self.ignored_deposit(Rejection::BalanceOverflow));
        }

        self.save_update(amount).await?;
        debug!(account = %self.name, amount, "{} Deposited", format_major(amount));

        Ok(DepositResult {
            status: OperationStatus::Applied,
            balance: self.balance,
        })
    }

    /// Withdraw `amount` minor units.
    ///
    /// Requires `0 < amount <= balance` against the cached balance; anything
    /// else is ignored with an insufficient-funds notice. The result carries
    /// the amount withdrawn, not the new balance (see
    /// [`WithdrawResult::major_units`]).
    pub async fn withdraw(&mut self, amount: MinorUnits) -> Result<WithdrawResult, AppError> {
        if amount <= 0 || amount > self.balance {
            debug!(
                account = %self.name,
                amount,
                balance = self.balance,
                "Not enough money on balance account"
            );
            let rejection = if amount <= 0 {
                Rejection::NonPositiveAmount
            } else {
                Rejection::InsufficientFunds {
                    balance: self.balance,
                    requested: amount,
                }
            };
            return Ok(WithdrawResult {
                status: OperationStatus::Ignored(rejection),
                amount: 0,
                balance: self.balance,
            });
        }

        self.save_update(-amount).await?;
        debug!(account = %self.name, amount, "{} Withdrawn", format_major(amount));

        Ok(WithdrawResult {
            status: OperationStatus::Applied,
            amount,
            balance: self.balance,
        })
    }

    fn ignored_deposit(&self, rejection: Rejection) -> DepositResult {
        DepositResult {
            status: OperationStatus::Ignored(rejection),
            balance: self.balance,
        }
    }

    async fn save_update(&mut self, delta: MinorUnits) -> Result<AppliedDelta, AppError> {
        let (now, zone) = capture_now();
        let zone_blob = zone.to_blob().context("Failed to encode zone stamp")?;

        let applied = self
            .repo
            .apply_delta(&self.name, delta, now, &zone_blob)
            .await?;
        self.balance = applied.balance;
        Ok(applied)
    }
}
