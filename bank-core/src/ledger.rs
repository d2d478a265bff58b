//! Main ledger orchestration layer
//!
//! This module ties together storage, the audit log, and the writer actor
//! into a high-level API for account and money operations.
//!
//! # Example
//!
//! ```no_run
//! use bank_core::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> bank_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     // let outcome = ledger.transfer_money(&sender, &receiver, amount).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    statement::{statement_for, StatementLine},
    types::{Account, AccountNumber, AccountStatus, AccountType, Loan, User},
    Config, Result, Storage,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Result of a business operation, returned as a value
///
/// Recoverable failures surface here so callers render a message instead
/// of catching errors. Infrastructure failures stay in [`crate::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation succeeded; message is the rendered audit text
    Completed {
        /// Rendered, human-readable confirmation
        message: String,
    },
    /// The sender's balance cannot cover the requested amount
    InsufficientFunds,
    /// A referenced account or user does not exist
    NotFound {
        /// The identifier that failed to resolve
        subject: String,
    },
    /// The caller does not own the account being operated on
    Forbidden,
}

impl Outcome {
    /// Successful outcome with a rendered message
    pub fn completed(message: impl Into<String>) -> Self {
        Outcome::Completed {
            message: message.into(),
        }
    }

    /// Not-found outcome for the given identifier
    pub fn not_found(subject: impl Into<String>) -> Self {
        Outcome::NotFound {
            subject: subject.into(),
        }
    }

    /// Whether the operation went through
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// The rendered message, when completed
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Completed { message } => Some(message),
            _ => None,
        }
    }
}

/// Main ledger interface
#[derive(Clone)]
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    ///
    /// Provisions the debt-clearing sink account if it does not exist yet,
    /// then spawns the writer actor.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        let clearing = AccountNumber::new(config.clearing_account.clone());
        if storage.get_account(&clearing)?.is_none() {
            let mut sink = Account::request(clearing.clone(), AccountType::Checking);
            sink.status = AccountStatus::Active;
            storage.put_account(&sink)?;
            tracing::info!(account = %clearing, "Provisioned debt-clearing account");
        }

        let handle = spawn_ledger_actor(storage.clone(), clearing);

        Ok(Self {
            handle,
            storage,
            config,
        })
    }

    /// Configuration this ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct handle to the underlying store
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // Mutations (serialized through the writer actor)

    /// Request a new account for a user
    ///
    /// Unknown usernames yield [`Outcome::NotFound`]; the new account
    /// starts pending and carries its request log entry.
    pub async fn create_account(
        &self,
        username: &str,
        account_type: AccountType,
    ) -> Result<Outcome> {
        self.handle.create_account(username, account_type).await
    }

    /// Activate an account (idempotent)
    pub async fn enable_account(&self, number: &AccountNumber) -> Result<Outcome> {
        self.handle.enable_account(number.clone()).await
    }

    /// Transfer money between two accounts
    ///
    /// Balance conservation holds atomically: both accounts and the one
    /// shared log entry commit in a single storage batch, or nothing does.
    pub async fn transfer_money(
        &self,
        sender: &AccountNumber,
        receiver: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        self.handle
            .transfer(sender.clone(), receiver.clone(), amount)
            .await
    }

    /// Pay down an account's debt via the clearing account
    ///
    /// Debt is only reduced when the clearing transfer completed; a failed
    /// transfer outcome is propagated unchanged.
    pub async fn pay_debt(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        self.handle.pay_debt(number.clone(), amount).await
    }

    /// Originate a loan of the given principal
    pub async fn request_loan(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        self.handle.request_loan(number.clone(), amount).await
    }

    /// Deposit cash into an account
    pub async fn deposit(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        self.handle.deposit(number.clone(), amount).await
    }

    /// Withdraw cash from an account
    pub async fn withdraw(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        self.handle.withdraw(number.clone(), amount).await
    }

    /// Clear unseen notification flags for a user's accounts
    pub async fn mark_seen(&self, username: &str) -> Result<usize> {
        self.handle.mark_seen(username).await
    }

    /// Upsert a user record (registration workflows live outside this core)
    pub async fn register_user(&self, user: User) -> Result<()> {
        self.handle.upsert_user(user).await
    }

    /// Shutdown the writer actor
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    // Reads (straight to storage)

    /// Look up an account by number
    pub fn get_account(&self, number: &AccountNumber) -> Result<Option<Account>> {
        self.storage.get_account(number)
    }

    /// Look up a user by username
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.storage.get_user(username)
    }

    /// Outstanding debt of an account; zero when the account is unknown
    pub fn get_debt(&self, number: &AccountNumber) -> Result<Decimal> {
        Ok(self
            .storage
            .get_account(number)?
            .map(|a| a.debt)
            .unwrap_or(Decimal::ZERO))
    }

    /// Loans of an account; empty when the account is unknown
    pub fn get_loans(&self, number: &AccountNumber) -> Result<Vec<Loan>> {
        match self.storage.get_account(number)? {
            Some(account) => self.storage.loans_for(&account),
            None => Ok(Vec::new()),
        }
    }

    /// Resolved audit log of an account in chronological order
    pub fn logs(&self, account: &Account) -> Result<Vec<crate::audit::LogEntry>> {
        self.storage.logs_for(account)
    }

    /// Transaction statement for an account (reportable kinds only)
    pub fn statement(&self, account: &Account) -> Result<Vec<StatementLine>> {
        Ok(statement_for(&self.storage.logs_for(account)?))
    }
}
