//! Statements, notifications, and the customer-facing facade
//!
//! Statements are pure read views over an account's resolved log history,
//! restricted to the reportable kinds, in chronological order. The
//! [`Customer`] facade wraps the ledger with identity resolution and
//! ownership checks: every money-moving entry point verifies ownership
//! first and short-circuits with [`Outcome::Forbidden`].

use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::{
    access::{check_ownership, decode_bearer, Ownership},
    audit::{LogEntry, LogKind},
    types::{format_amount, Account, AccountNumber, AccountStatus, AccountType, User},
    Error, Ledger, Outcome, Result,
};

/// Sentinel key used when a statement request fails the ownership check
pub const FORBIDDEN_KEY: &str = "Forbidden";

/// One rendered statement record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementLine {
    /// Operation kind code (e.g. `TRANSFER`)
    pub kind: LogKind,

    /// When the underlying log entry was created
    pub at: DateTime<Utc>,

    /// Message rendered at log creation time
    pub message: String,
}

/// Derive a statement from resolved log entries
///
/// Pure and restartable: filters to the reportable kinds, preserving the
/// chronological order of the input sequence.
pub fn statement_for(entries: &[LogEntry]) -> Vec<StatementLine> {
    entries
        .iter()
        .filter(|e| e.kind.is_reportable())
        .map(|e| StatementLine {
            kind: e.kind,
            at: e.created_at,
            message: e.message.clone(),
        })
        .collect()
}

/// Per-account summary for a customer profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    /// Account number
    pub number: String,

    /// Product tag
    pub account_type: AccountType,

    /// Lifecycle status
    pub status: AccountStatus,

    /// Formatted balance (two decimals, grouped)
    pub balance: String,

    /// Formatted outstanding debt
    pub debt: String,
}

/// Customer profile view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Contact email
    pub email: String,

    /// Summaries of the customer's active accounts, in list order
    pub accounts: Vec<AccountSummary>,
}

/// Customer-facing operations over the ledger
///
/// Holds a ledger clone plus the token decoding key derived from the
/// configured secret.
#[derive(Clone)]
pub struct Customer {
    ledger: Ledger,
    decoding_key: DecodingKey,
}

impl Customer {
    /// Wrap a ledger with caller-identity and ownership checks
    pub fn new(ledger: Ledger) -> Self {
        let decoding_key = DecodingKey::from_secret(ledger.config().jwt_secret.as_bytes());
        Self {
            ledger,
            decoding_key,
        }
    }

    /// Resolve a caller from an authorization header value
    ///
    /// Fatal on malformed/mis-signed tokens and on unknown subjects; this
    /// step never degrades to a silent null.
    pub fn resolve_caller(&self, header: &str) -> Result<User> {
        let claims = decode_bearer(header, &self.decoding_key)?;
        self.ledger
            .get_user(&claims.sub)?
            .ok_or_else(|| Error::Auth(format!("unknown subject '{}'", claims.sub)))
    }

    /// The caller's active accounts, in account-list order
    pub fn active_accounts(&self, user: &User) -> Result<Vec<Account>> {
        let mut active = Vec::new();
        for number in &user.accounts {
            let account = self.ledger.get_account(number)?.ok_or_else(|| {
                Error::Storage(format!("account [{}] missing for {}", number, user.username))
            })?;
            if account.is_active() {
                active.push(account);
            }
        }
        Ok(active)
    }

    /// Whether the caller owns the given account
    pub fn ownership(&self, user: &User, number: &AccountNumber) -> Result<Ownership> {
        Ok(check_ownership(&self.active_accounts(user)?, number))
    }

    // Guarded entry points

    /// Request a new account for the caller
    pub async fn request_account(
        &self,
        caller: &User,
        account_type: AccountType,
    ) -> Result<Outcome> {
        self.ledger
            .create_account(&caller.username, account_type)
            .await
    }

    /// Transfer money out of one of the caller's accounts
    pub async fn transfer(
        &self,
        caller: &User,
        sender: &AccountNumber,
        receiver: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        if !self.ownership(caller, sender)?.is_owned() {
            return Ok(Outcome::Forbidden);
        }
        self.ledger.transfer_money(sender, receiver, amount).await
    }

    /// Pay down debt on one of the caller's accounts
    pub async fn pay_debt(
        &self,
        caller: &User,
        number: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        if !self.ownership(caller, number)?.is_owned() {
            return Ok(Outcome::Forbidden);
        }
        self.ledger.pay_debt(number, amount).await
    }

    /// Request a loan against one of the caller's accounts
    pub async fn request_loan(
        &self,
        caller: &User,
        number: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        if !self.ownership(caller, number)?.is_owned() {
            return Ok(Outcome::Forbidden);
        }
        self.ledger.request_loan(number, amount).await
    }

    /// Deposit into one of the caller's accounts
    pub async fn deposit(
        &self,
        caller: &User,
        number: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        if !self.ownership(caller, number)?.is_owned() {
            return Ok(Outcome::Forbidden);
        }
        self.ledger.deposit(number, amount).await
    }

    /// Withdraw from one of the caller's accounts
    pub async fn withdraw(
        &self,
        caller: &User,
        number: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        if !self.ownership(caller, number)?.is_owned() {
            return Ok(Outcome::Forbidden);
        }
        self.ledger.withdraw(number, amount).await
    }

    // Notifications

    /// All log entries across the caller's accounts, in account-list order
    ///
    /// With `include_seen` false, restricted to entries still unseen.
    /// Order is the concatenation of each account's log sequence, not a
    /// global time sort.
    pub fn notifications(&self, user: &User, include_seen: bool) -> Result<Vec<LogEntry>> {
        let mut all = Vec::new();
        for number in &user.accounts {
            let account = self.ledger.get_account(number)?.ok_or_else(|| {
                Error::Storage(format!("account [{}] missing for {}", number, user.username))
            })?;
            all.extend(self.ledger.logs(&account)?);
        }
        if include_seen {
            Ok(all)
        } else {
            Ok(all.into_iter().filter(|e| e.unseen).collect())
        }
    }

    /// Clear the unseen flag on every entry of the caller's accounts
    ///
    /// Idempotent: a second call finds nothing left to clear.
    pub async fn mark_notifications_seen(&self, user: &User) -> Result<usize> {
        self.ledger.mark_seen(&user.username).await
    }

    // Statements

    /// Statements for the caller
    ///
    /// An empty selector maps every active account number to its
    /// statement. A non-empty selector checks ownership first; on failure
    /// the result carries the single sentinel `Forbidden` entry with an
    /// empty statement.
    pub fn statements(
        &self,
        user: &User,
        selector: &str,
    ) -> Result<HashMap<String, Vec<StatementLine>>> {
        let mut out = HashMap::new();
        let active = self.active_accounts(user)?;

        if selector.is_empty() {
            for account in &active {
                out.insert(
                    account.number.as_str().to_string(),
                    statement_for(&self.ledger.logs(account)?),
                );
            }
            return Ok(out);
        }

        let number = AccountNumber::new(selector);
        match active.iter().find(|a| a.number == number) {
            Some(account) => {
                out.insert(
                    account.number.as_str().to_string(),
                    statement_for(&self.ledger.logs(account)?),
                );
            }
            None => {
                out.insert(FORBIDDEN_KEY.to_string(), Vec::new());
            }
        }
        Ok(out)
    }

    // Aggregates

    /// Total outstanding debt across the caller's active accounts
    pub fn total_debt(&self, user: &User) -> Result<Decimal> {
        Ok(self
            .active_accounts(user)?
            .iter()
            .map(|a| a.debt)
            .sum())
    }

    /// Profile view: names, email, and active-account summaries
    pub fn profile(&self, user: &User) -> Result<Profile> {
        let accounts = self
            .active_accounts(user)?
            .iter()
            .map(|a| AccountSummary {
                number: a.number.as_str().to_string(),
                account_type: a.account_type,
                status: a.status,
                balance: format_amount(a.balance),
                debt: format_amount(a.debt),
            })
            .collect();

        Ok(Profile {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            accounts,
        })
    }
}
