//! Audit log component
//!
//! Every balance- or debt-affecting operation produces exactly one
//! [`LogEntry`]. Entries are rendered from positional arguments once, at
//! creation time, and never re-rendered. Accounts reference entries by id,
//! so a transfer attaches one shared entry to both parties. The entry is
//! immutable except for its `unseen` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operation kind tag on a log entry (closed enumeration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogKind {
    /// A customer requested a new account
    RequestAccount = 1,
    /// Money moved between two accounts
    Transfer = 2,
    /// Debt was paid down via the clearing account
    PayDebt = 3,
    /// A loan was requested
    RequestLoan = 4,
    /// A loan was approved (kind reserved; no operation emits it yet)
    ApproveLoan = 5,
    /// Money was deposited
    Deposit = 6,
    /// Money was withdrawn
    Withdraw = 7,
}

impl LogKind {
    /// Stable uppercase code, used in statements
    pub fn code(&self) -> &'static str {
        match self {
            LogKind::RequestAccount => "REQUEST_ACCOUNT",
            LogKind::Transfer => "TRANSFER",
            LogKind::PayDebt => "PAY_DEBT",
            LogKind::RequestLoan => "REQUEST_LOAN",
            LogKind::ApproveLoan => "APPROVE_LOAN",
            LogKind::Deposit => "DEPOSIT",
            LogKind::Withdraw => "WITHDRAW",
        }
    }

    /// Whether entries of this kind appear on transaction statements
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            LogKind::Deposit
                | LogKind::Transfer
                | LogKind::Withdraw
                | LogKind::PayDebt
                | LogKind::ApproveLoan
        )
    }

    /// Render the fixed message template for this kind
    ///
    /// Arguments are positional; missing arguments render empty rather
    /// than panic, since templates are fixed at call sites.
    fn render(&self, args: &[&str]) -> String {
        let arg = |i: usize| args.get(i).copied().unwrap_or("");
        match self {
            LogKind::RequestAccount => format!(
                "{} requested a new {} account [{}]",
                arg(0),
                arg(1),
                arg(2)
            ),
            LogKind::Transfer => format!(
                "Transferred {} from account [{}] to account [{}]",
                arg(0),
                arg(1),
                arg(2)
            ),
            LogKind::PayDebt => format!(
                "Account [{}] paid {} towards outstanding debt",
                arg(0),
                arg(1)
            ),
            LogKind::RequestLoan => {
                format!("Account [{}] requested a loan of {}", arg(0), arg(1))
            }
            LogKind::ApproveLoan => format!("Loan approved for account [{}]", arg(0)),
            LogKind::Deposit => format!("Deposited {} into account [{}]", arg(0), arg(1)),
            LogKind::Withdraw => format!("Withdrew {} from account [{}]", arg(0), arg(1)),
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One immutable audit record
///
/// The entry does not know which accounts reference it; attachment is the
/// caller's responsibility (which is how a single transfer entry ends up
/// in two log sequences).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub log_id: Uuid,

    /// Operation kind
    pub kind: LogKind,

    /// Message rendered at creation time
    pub message: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// True until the owning customer views their notifications
    pub unseen: bool,
}

impl LogEntry {
    /// Record a new entry: render, timestamp, mark unseen
    pub fn record(kind: LogKind, args: &[&str]) -> Self {
        Self {
            log_id: Uuid::now_v7(),
            message: kind.render(args),
            kind,
            created_at: Utc::now(),
            unseen: true,
        }
    }

    /// Clear the unseen flag (idempotent)
    pub fn mark_seen(&mut self) {
        self.unseen = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_template() {
        let entry = LogEntry::record(
            LogKind::Transfer,
            &["30.00", "12345678901234", "98765432109876"],
        );
        assert_eq!(
            entry.message,
            "Transferred 30.00 from account [12345678901234] to account [98765432109876]"
        );
        assert!(entry.unseen);
        assert_eq!(entry.kind, LogKind::Transfer);
    }

    #[test]
    fn test_request_account_template() {
        let entry = LogEntry::record(
            LogKind::RequestAccount,
            &["Mr/s. Jane Doe", "savings", "12345678901234"],
        );
        assert_eq!(
            entry.message,
            "Mr/s. Jane Doe requested a new savings account [12345678901234]"
        );
    }

    #[test]
    fn test_pay_debt_template() {
        let entry = LogEntry::record(LogKind::PayDebt, &["12345678901234", "20.00"]);
        assert_eq!(
            entry.message,
            "Account [12345678901234] paid 20.00 towards outstanding debt"
        );
    }

    #[test]
    fn test_missing_args_render_empty() {
        let entry = LogEntry::record(LogKind::Deposit, &["50.00"]);
        assert_eq!(entry.message, "Deposited 50.00 into account []");
    }

    #[test]
    fn test_reportable_kinds() {
        assert!(LogKind::Deposit.is_reportable());
        assert!(LogKind::Transfer.is_reportable());
        assert!(LogKind::Withdraw.is_reportable());
        assert!(LogKind::PayDebt.is_reportable());
        assert!(LogKind::ApproveLoan.is_reportable());
        assert!(!LogKind::RequestAccount.is_reportable());
        assert!(!LogKind::RequestLoan.is_reportable());
    }

    #[test]
    fn test_mark_seen_idempotent() {
        let mut entry = LogEntry::record(LogKind::Withdraw, &["10.00", "1"]);
        entry.mark_seen();
        assert!(!entry.unseen);
        entry.mark_seen();
        assert!(!entry.unseen);
    }
}
