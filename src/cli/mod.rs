use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{Account, Ledger, OpenStatus, OperationStatus, Rejection};
use crate::domain::{format_major, parse_major, MinorUnits};

/// Default store location, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "DATA/accounts.sqlite";

/// Ledgerly - named accounts with an append-only balance history
#[derive(Parser)]
#[command(name = "ledgerly")]
#[command(about = "Track named accounts and every deposit and withdrawal made on them")]
#[command(version)]
pub struct Cli {
    /// Database file path (parent directory is created if absent)
    #[arg(short, long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and its schema
    Init,

    /// Open an account, creating it when it doesn't exist
    Open {
        /// Account name
        name: String,

        /// Balance for a new account (e.g., "70.00"); ignored for existing ones
        #[arg(short, long, allow_hyphen_values = true)]
        initial: Option<String>,
    },

    /// Deposit money into an account
    Deposit {
        /// Account name
        name: String,

        /// Amount (e.g., "10.10" or "10")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account name
        name: String,

        /// Amount (e.g., "0.30")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Show the balance of an account
    Balance {
        /// Account name
        name: String,
    },

    /// List all accounts and their balances
    Accounts,

    /// Print the history log in local time
    History {
        /// Only show entries for this account
        #[arg(long)]
        account: Option<String>,
    },

    /// Run the sample session (Tom, Ewa, Eric, Michael, TerryG)
    Demo,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let ledger = Ledger::init(&self.database)
            .await
            .with_context(|| format!("Failed to open database {}", self.database))?;

        let mut stdout = io::stdout();
        let result = run_command(&ledger, self.command, &self.database, &mut stdout).await;
        ledger.close().await;
        result
    }
}

/// Execute one command against an open ledger, writing the status lines to `out`.
pub async fn run_command(
    ledger: &Ledger,
    command: Commands,
    database: &str,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Commands::Init => {
            writeln!(out, "Database initialized: {}", database)?;
        }

        Commands::Open { name, initial } => {
            let initial = initial
                .map(|amount| parse_amount(&amount))
                .transpose()?;
            open(ledger, &name, initial, out).await?;
        }

        Commands::Deposit { name, amount } => {
            let amount = parse_amount(&amount)?;
            let mut account = open(ledger, &name, None, out).await?;
            deposit(&mut account, amount, out).await?;
        }

        Commands::Withdraw { name, amount } => {
            let amount = parse_amount(&amount)?;
            let mut account = open(ledger, &name, None, out).await?;
            withdraw(&mut account, amount, out).await?;
        }

        Commands::Balance { name } => {
            open(ledger, &name, None, out).await?;
        }

        Commands::Accounts => {
            let accounts = ledger.list_accounts().await?;
            if accounts.is_empty() {
                writeln!(out, "No accounts found.")?;
            } else {
                writeln!(out, "{:<20} {:>14}", "NAME", "BALANCE")?;
                writeln!(out, "{}", "-".repeat(35))?;
                for account in accounts {
                    writeln!(
                        out,
                        "{:<20} {:>14}",
                        account.name,
                        format_major(account.balance)
                    )?;
                }
            }
        }

        Commands::History { account } => {
            let rows = ledger.local_history(account.as_deref()).await?;
            if rows.is_empty() {
                writeln!(out, "No history entries found.")?;
            } else {
                writeln!(out, "{:<24} {:<20} {:>12}", "LOCAL TIME", "ACCOUNT", "AMOUNT")?;
                writeln!(out, "{}", "-".repeat(58))?;
                for row in rows {
                    writeln!(
                        out,
                        "{:<24} {:<20} {:>12}",
                        row.localtime,
                        row.account,
                        format_major(row.amount)
                    )?;
                }
            }
        }

        Commands::Demo => run_demo(ledger, out).await?,
    }

    Ok(())
}

fn parse_amount(input: &str) -> Result<MinorUnits> {
    parse_major(input).with_context(|| format!("Invalid amount '{}'. Use '10.10' or '10'", input))
}

async fn open(
    ledger: &Ledger,
    name: &str,
    initial: Option<MinorUnits>,
    out: &mut dyn Write,
) -> Result<Account> {
    let (account, status) = ledger.open_account(name, initial).await?;
    match status {
        OpenStatus::Created => writeln!(out, "Account created for {}", account.name())?,
        OpenStatus::Retrieved => writeln!(out, "Retrieved record for {}", account.name())?,
    }
    writeln!(out, "{}", account.balance_notice())?;
    Ok(account)
}

async fn deposit(account: &mut Account, amount: MinorUnits, out: &mut dyn Write) -> Result<f64> {
    let result = account.deposit(amount).await?;
    match result.status {
        OperationStatus::Applied => writeln!(out, "{} Deposited", format_major(amount))?,
        OperationStatus::Ignored(Rejection::BalanceOverflow) => writeln!(
            out,
            "Deposit of {} would overflow the balance of {}",
            format_major(amount),
            account.name()
        )?,
        OperationStatus::Ignored(_) => {}
    }
    Ok(result.major_units())
}

async fn withdraw(account: &mut Account, amount: MinorUnits, out: &mut dyn Write) -> Result<f64> {
    let result = account.withdraw(amount).await?;
    if result.status.is_applied() {
        writeln!(out, "{} Withdrawn", format_major(amount))?;
    } else {
        writeln!(out, "Not enough money on balance account")?;
    }
    Ok(result.major_units())
}

/// The sample session: a few accounts with deposits and withdrawals.
async fn run_demo(ledger: &Ledger, out: &mut dyn Write) -> Result<()> {
    let mut tom = open(ledger, "Tom", None, out).await?;
    deposit(&mut tom, 1010, out).await?;
    deposit(&mut tom, 10, out).await?;
    deposit(&mut tom, 10, out).await?;
    withdraw(&mut tom, 30, out).await?;
    withdraw(&mut tom, 0, out).await?;
    writeln!(out, "{}", tom.balance_notice())?;

    let mut ewa = open(ledger, "Ewa", None, out).await?;
    deposit(&mut ewa, 200, out).await?;
    writeln!(out, "{}", ewa.balance_notice())?;

    open(ledger, "Eric", Some(7000), out).await?;

    let mut michael = open(ledger, "Michael", None, out).await?;
    deposit(&mut michael, 100, out).await?;
    withdraw(&mut michael, 50, out).await?;

    open(ledger, "TerryG", None, out).await?;
    Ok(())
}
