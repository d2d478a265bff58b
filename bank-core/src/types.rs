//! Core types for the banking ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Reference-based log sharing (accounts hold log ids, never copies)

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Externally visible account number (distinct from any store-internal key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Wrap an existing account number
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Generate a fresh 14-digit account number
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut digits = String::with_capacity(14);
        digits.push(char::from(b'1' + rng.gen_range(0..9u8)));
        for _ in 1..14 {
            digits.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        Self(digits)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account product tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AccountType {
    /// Current/checking account
    Checking,
    /// Savings account
    Savings,
}

impl AccountType {
    /// Lowercase tag used in rendered log messages
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "checking" => Some(AccountType::Checking),
            "savings" => Some(AccountType::Savings),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Requested but not yet activated by a banker
    Pending,
    /// Active and usable for money movement
    Active,
    /// Temporarily blocked
    Suspended,
}

impl AccountStatus {
    /// Lowercase tag used in rendered messages
    pub fn code(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A customer bank account
///
/// Holds money and debt plus *references* to its audit log entries and
/// loans. The log sequence is append-only; insertion order is chronological
/// order. A transfer appends the same log id to both parties' sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Externally visible account number
    pub number: AccountNumber,

    /// Product tag
    pub account_type: AccountType,

    /// Lifecycle status
    pub status: AccountStatus,

    /// Current balance (exact decimal, non-negative at rest)
    pub balance: Decimal,

    /// Outstanding debt (exact decimal, never below zero)
    pub debt: Decimal,

    /// Ordered log entry references (append-only)
    pub logs: Vec<Uuid>,

    /// Loan references
    pub loans: Vec<Uuid>,

    /// When the account was requested
    pub opened_at: DateTime<Utc>,
}

impl Account {
    /// Create a freshly requested account (pending, empty)
    pub fn request(number: AccountNumber, account_type: AccountType) -> Self {
        Self {
            number,
            account_type,
            status: AccountStatus::Pending,
            balance: Decimal::ZERO,
            debt: Decimal::ZERO,
            logs: Vec::new(),
            loans: Vec::new(),
            opened_at: Utc::now(),
        }
    }

    /// Whether the account can move money
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// A loan, immutable once originated
///
/// Repayment tracking lives on the account's debt field, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique loan ID (UUIDv7 for time-ordering)
    pub loan_id: Uuid,

    /// Principal amount (exact decimal, positive)
    pub principal: Decimal,

    /// When the loan was requested
    pub requested_at: DateTime<Utc>,
}

impl Loan {
    /// Originate a loan of the given principal
    pub fn new(principal: Decimal) -> Self {
        Self {
            loan_id: Uuid::now_v7(),
            principal,
            requested_at: Utc::now(),
        }
    }
}

/// A bank customer
///
/// Credentials are opaque to this crate; they are stored and returned
/// verbatim for the excluded authentication workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique username (store key)
    pub username: String,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Contact email
    pub email: String,

    /// Opaque password credential
    pub password_hash: String,

    /// Opaque numeric PIN
    pub pin: String,

    /// Owned accounts in creation order
    pub accounts: Vec<AccountNumber>,
}

impl User {
    /// Display name used in rendered log messages
    pub fn display_name(&self) -> String {
        format!("Mr/s. {} {}", self.first_name, self.last_name)
    }
}

/// Format a monetary amount for display: two decimals, thousands grouping
///
/// Rounds half-to-even, e.g. `1234.5` renders as `1,234.50`. Persisted
/// amounts keep full precision; this is display-only.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), format!("{:0<2}", f)),
        None => (text, "00".to_string()),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}.{}", grouped, frac_part)
    } else {
        format!("{}.{}", grouped, frac_part)
    }
}
