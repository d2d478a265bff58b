//! Actor-based concurrency for the ledger
//!
//! All mutating operations flow through one writer task over a bounded
//! mpsc mailbox with oneshot replies. The single logical writer serializes
//! concurrent transfers touching the same accounts, so balance updates can
//! never be lost to interleaving. Reads bypass the actor and hit storage
//! directly.

use crate::{
    audit::{LogEntry, LogKind},
    ledger::Outcome,
    types::{format_amount, Account, AccountNumber, AccountType, Loan, User},
    Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Request a new account for a user
    CreateAccount {
        username: String,
        account_type: AccountType,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Activate an account
    EnableAccount {
        number: AccountNumber,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Move money between two accounts
    Transfer {
        sender: AccountNumber,
        receiver: AccountNumber,
        amount: Decimal,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Pay down debt via the clearing account
    PayDebt {
        number: AccountNumber,
        amount: Decimal,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Originate a loan
    RequestLoan {
        number: AccountNumber,
        amount: Decimal,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Deposit cash into an account
    Deposit {
        number: AccountNumber,
        amount: Decimal,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Withdraw cash from an account
    Withdraw {
        number: AccountNumber,
        amount: Decimal,
        response: oneshot::Sender<Result<Outcome>>,
    },

    /// Clear unseen flags on every log entry of a user's accounts
    MarkSeen {
        username: String,
        response: oneshot::Sender<Result<usize>>,
    },

    /// Upsert a user record (store passthrough for the excluded
    /// registration workflow)
    UpsertUser {
        user: Box<User>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger mutations
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Debt-clearing sink account number
    clearing_account: AccountNumber,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        clearing_account: AccountNumber,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            storage,
            clearing_account,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::CreateAccount {
                username,
                account_type,
                response,
            } => {
                let _ = response.send(self.apply_create_account(&username, account_type));
            }

            LedgerMessage::EnableAccount { number, response } => {
                let _ = response.send(self.apply_enable_account(&number));
            }

            LedgerMessage::Transfer {
                sender,
                receiver,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_transfer(&sender, &receiver, amount));
            }

            LedgerMessage::PayDebt {
                number,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_pay_debt(&number, amount));
            }

            LedgerMessage::RequestLoan {
                number,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_request_loan(&number, amount));
            }

            LedgerMessage::Deposit {
                number,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_deposit(&number, amount));
            }

            LedgerMessage::Withdraw {
                number,
                amount,
                response,
            } => {
                let _ = response.send(self.apply_withdraw(&number, amount));
            }

            LedgerMessage::MarkSeen { username, response } => {
                let _ = response.send(self.apply_mark_seen(&username));
            }

            LedgerMessage::UpsertUser { user, response } => {
                let _ = response.send(self.storage.put_user(&user));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    // Operations (applied on the single writer)

    fn apply_create_account(&self, username: &str, account_type: AccountType) -> Result<Outcome> {
        let Some(mut user) = self.storage.get_user(username)? else {
            return Ok(Outcome::not_found(username));
        };

        let mut account = Account::request(AccountNumber::generate(), account_type);
        let entry = LogEntry::record(
            LogKind::RequestAccount,
            &[&user.display_name(), account_type.code(), account.number.as_str()],
        );
        account.logs.push(entry.log_id);
        user.accounts.push(account.number.clone());

        self.storage.commit_account_request(&user, &account, &entry)?;

        tracing::info!(username, account = %account.number, "Account requested");

        Ok(Outcome::completed(entry.message))
    }

    fn apply_enable_account(&self, number: &AccountNumber) -> Result<Outcome> {
        let Some(mut account) = self.storage.get_account(number)? else {
            return Ok(Outcome::not_found(number.as_str()));
        };

        // No state-machine guard: re-enabling an active account is a no-op
        account.status = crate::types::AccountStatus::Active;
        self.storage.put_account(&account)?;

        Ok(Outcome::completed(
            "Successfully enabled bank account! [Changed status -> `active`]",
        ))
    }

    fn apply_transfer(
        &self,
        sender_no: &AccountNumber,
        receiver_no: &AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        Self::check_amount(amount)?;
        if sender_no == receiver_no {
            return Err(Error::InvalidRequest(format!(
                "sender and receiver are the same account [{}]",
                sender_no
            )));
        }

        let Some(mut sender) = self.storage.get_account(sender_no)? else {
            return Ok(Outcome::not_found(sender_no.as_str()));
        };
        let Some(mut receiver) = self.storage.get_account(receiver_no)? else {
            return Ok(Outcome::not_found(receiver_no.as_str()));
        };

        let diff = sender.balance - amount;
        if diff < Decimal::ZERO {
            // Recoverable business outcome, not an error: no mutation, no log
            return Ok(Outcome::InsufficientFunds);
        }

        sender.balance = diff;
        receiver.balance += amount;

        let entry = LogEntry::record(
            LogKind::Transfer,
            &[&format_amount(amount), sender_no.as_str(), receiver_no.as_str()],
        );
        sender.logs.push(entry.log_id);
        receiver.logs.push(entry.log_id);

        self.storage.commit_transfer(&sender, &receiver, &entry)?;

        Ok(Outcome::completed(entry.message))
    }

    fn apply_pay_debt(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        // The clearing transfer outcome gates the debt reduction: a failed
        // transfer must leave debt untouched.
        let transfer = self.apply_transfer(number, &self.clearing_account, amount)?;
        if !transfer.is_completed() {
            return Ok(transfer);
        }

        // Re-load: the clearing transfer just changed this account
        let mut account = self
            .storage
            .get_account(number)?
            .ok_or_else(|| Error::Storage(format!("account [{}] vanished mid-payment", number)))?;

        // Debt never goes below zero; overpayment clears it
        account.debt = (account.debt - amount).max(Decimal::ZERO);

        let entry = LogEntry::record(
            LogKind::PayDebt,
            &[number.as_str(), &format_amount(amount)],
        );
        account.logs.push(entry.log_id);

        self.storage.commit_account_entry(&account, &entry)?;

        Ok(Outcome::completed(entry.message))
    }

    fn apply_request_loan(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        Self::check_amount(amount)?;

        let Some(mut account) = self.storage.get_account(number)? else {
            return Ok(Outcome::not_found(number.as_str()));
        };

        // TODO: loan eligibility rules before origination
        let loan = Loan::new(amount);
        let entry = LogEntry::record(
            LogKind::RequestLoan,
            &[number.as_str(), &format_amount(amount)],
        );
        account.loans.push(loan.loan_id);
        account.logs.push(entry.log_id);

        self.storage.commit_loan_request(&account, &loan, &entry)?;

        Ok(Outcome::completed(
            "Your loan request has successfully been submitted!",
        ))
    }

    fn apply_deposit(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        Self::check_amount(amount)?;

        let Some(mut account) = self.storage.get_account(number)? else {
            return Ok(Outcome::not_found(number.as_str()));
        };

        account.balance += amount;
        let entry = LogEntry::record(
            LogKind::Deposit,
            &[&format_amount(amount), number.as_str()],
        );
        account.logs.push(entry.log_id);

        self.storage.commit_account_entry(&account, &entry)?;

        Ok(Outcome::completed(entry.message))
    }

    fn apply_withdraw(&self, number: &AccountNumber, amount: Decimal) -> Result<Outcome> {
        Self::check_amount(amount)?;

        let Some(mut account) = self.storage.get_account(number)? else {
            return Ok(Outcome::not_found(number.as_str()));
        };

        let diff = account.balance - amount;
        if diff < Decimal::ZERO {
            return Ok(Outcome::InsufficientFunds);
        }

        account.balance = diff;
        let entry = LogEntry::record(
            LogKind::Withdraw,
            &[&format_amount(amount), number.as_str()],
        );
        account.logs.push(entry.log_id);

        self.storage.commit_account_entry(&account, &entry)?;

        Ok(Outcome::completed(entry.message))
    }

    fn apply_mark_seen(&self, username: &str) -> Result<usize> {
        let Some(user) = self.storage.get_user(username)? else {
            return Ok(0);
        };

        let mut accounts = Vec::new();
        let mut cleared = Vec::new();

        for number in &user.accounts {
            let account = self
                .storage
                .get_account(number)?
                .ok_or_else(|| Error::Storage(format!("account [{}] missing for {}", number, username)))?;

            for entry in self.storage.logs_for(&account)? {
                if entry.unseen {
                    let mut entry = entry;
                    entry.mark_seen();
                    cleared.push(entry);
                }
            }
            accounts.push(account);
        }

        let count = cleared.len();
        if count > 0 {
            self.storage.commit_notices_seen(&accounts, &cleared)?;
        }

        Ok(count)
    }

    fn check_amount(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidRequest(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        Ok(())
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        rx: oneshot::Receiver<Result<T>>,
        sent: std::result::Result<(), mpsc::error::SendError<LedgerMessage>>,
    ) -> Result<T> {
        sent.map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Request a new account for a user
    pub async fn create_account(
        &self,
        username: impl Into<String>,
        account_type: AccountType,
    ) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::CreateAccount {
                username: username.into(),
                account_type,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Activate an account
    pub async fn enable_account(&self, number: AccountNumber) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::EnableAccount {
                number,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Move money between two accounts
    pub async fn transfer(
        &self,
        sender: AccountNumber,
        receiver: AccountNumber,
        amount: Decimal,
    ) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::Transfer {
                sender,
                receiver,
                amount,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Pay down debt via the clearing account
    pub async fn pay_debt(&self, number: AccountNumber, amount: Decimal) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::PayDebt {
                number,
                amount,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Originate a loan
    pub async fn request_loan(&self, number: AccountNumber, amount: Decimal) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::RequestLoan {
                number,
                amount,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Deposit cash into an account
    pub async fn deposit(&self, number: AccountNumber, amount: Decimal) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::Deposit {
                number,
                amount,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Withdraw cash from an account
    pub async fn withdraw(&self, number: AccountNumber, amount: Decimal) -> Result<Outcome> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::Withdraw {
                number,
                amount,
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Clear unseen flags for a user; returns how many entries were cleared
    pub async fn mark_seen(&self, username: impl Into<String>) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::MarkSeen {
                username: username.into(),
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Upsert a user record
    pub async fn upsert_user(&self, user: User) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .sender
            .send(LedgerMessage::UpsertUser {
                user: Box::new(user),
                response: tx,
            })
            .await;
        self.request(rx, sent).await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(storage: Arc<Storage>, clearing_account: AccountNumber) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1024); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, clearing_account, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
