//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account records (key: account number)
//! - `users` - Customer records (key: username)
//! - `loans` - Originated loans (key: loan id)
//! - `logs` - Audit log entries (key: log id)
//!
//! Every multi-record mutation (a transfer touches two accounts and one
//! shared log entry) commits through a single `WriteBatch`, so readers
//! never observe a debit without the matching credit and log.

use crate::{
    audit::LogEntry,
    error::{Error, Result},
    types::{Account, AccountNumber, Loan, User},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_USERS: &str = "users";
const CF_LOANS: &str = "loans";
const CF_LOGS: &str = "logs";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_USERS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_LOANS, Self::cf_options_append()),
            ColumnFamilyDescriptor::new(CF_LOGS, Self::cf_options_append()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // Accounts and users are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_append() -> Options {
        let mut opts = Options::default();
        // Logs and loans are append-mostly, favour compression ratio
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Get account by number
    pub fn get_account(&self, number: &AccountNumber) -> Result<Option<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, number.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Upsert account
    pub fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;
        self.db.put_cf(cf, account.number.as_str().as_bytes(), &value)?;

        tracing::debug!(account = %account.number, "Account saved");

        Ok(())
    }

    // User operations

    /// Get user by username
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        let cf = self.cf_handle(CF_USERS)?;
        match self.db.get_cf(cf, username.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Upsert user
    pub fn put_user(&self, user: &User) -> Result<()> {
        let cf = self.cf_handle(CF_USERS)?;
        let value = bincode::serialize(user)?;
        self.db.put_cf(cf, user.username.as_bytes(), &value)?;

        tracing::debug!(username = %user.username, "User saved");

        Ok(())
    }

    // Loan operations

    /// Get loan by id
    pub fn get_loan(&self, loan_id: Uuid) -> Result<Option<Loan>> {
        let cf = self.cf_handle(CF_LOANS)?;
        match self.db.get_cf(cf, loan_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Upsert loan
    pub fn put_loan(&self, loan: &Loan) -> Result<()> {
        let cf = self.cf_handle(CF_LOANS)?;
        let value = bincode::serialize(loan)?;
        self.db.put_cf(cf, loan.loan_id.as_bytes(), &value)?;
        Ok(())
    }

    // Log operations

    /// Get log entry by id
    pub fn get_log(&self, log_id: Uuid) -> Result<Option<LogEntry>> {
        let cf = self.cf_handle(CF_LOGS)?;
        match self.db.get_cf(cf, log_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Upsert log entry (used when clearing the unseen flag)
    pub fn put_log(&self, entry: &LogEntry) -> Result<()> {
        let cf = self.cf_handle(CF_LOGS)?;
        let value = bincode::serialize(entry)?;
        self.db.put_cf(cf, entry.log_id.as_bytes(), &value)?;
        Ok(())
    }

    /// Resolve an account's log references in insertion (chronological) order
    ///
    /// A missing referenced entry is a store-integrity failure, not an
    /// empty result.
    pub fn logs_for(&self, account: &Account) -> Result<Vec<LogEntry>> {
        account
            .logs
            .iter()
            .map(|id| self.get_log(*id)?.ok_or(Error::DanglingLog(*id)))
            .collect()
    }

    /// Resolve an account's loan references
    pub fn loans_for(&self, account: &Account) -> Result<Vec<Loan>> {
        account
            .loans
            .iter()
            .map(|id| self.get_loan(*id)?.ok_or(Error::DanglingLoan(*id)))
            .collect()
    }

    // Composite atomic commits

    /// Commit an account request: user, new account, and its log entry
    pub fn commit_account_request(
        &self,
        user: &User,
        account: &Account,
        entry: &LogEntry,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_log(&mut batch, entry)?;
        self.batch_account(&mut batch, account)?;

        let cf_users = self.cf_handle(CF_USERS)?;
        batch.put_cf(cf_users, user.username.as_bytes(), bincode::serialize(user)?);

        self.db.write(batch)?;

        tracing::debug!(
            username = %user.username,
            account = %account.number,
            "Account request committed"
        );

        Ok(())
    }

    /// Commit a transfer: both accounts and the one shared log entry
    pub fn commit_transfer(
        &self,
        sender: &Account,
        receiver: &Account,
        entry: &LogEntry,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_log(&mut batch, entry)?;
        self.batch_account(&mut batch, sender)?;
        self.batch_account(&mut batch, receiver)?;
        self.db.write(batch)?;

        tracing::debug!(
            log_id = %entry.log_id,
            sender = %sender.number,
            receiver = %receiver.number,
            "Transfer committed"
        );

        Ok(())
    }

    /// Commit a single-account balance or debt change with its log entry
    pub fn commit_account_entry(&self, account: &Account, entry: &LogEntry) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_log(&mut batch, entry)?;
        self.batch_account(&mut batch, account)?;
        self.db.write(batch)?;

        tracing::debug!(
            log_id = %entry.log_id,
            account = %account.number,
            kind = %entry.kind,
            "Account entry committed"
        );

        Ok(())
    }

    /// Commit a loan origination: loan, account, and the log entry
    pub fn commit_loan_request(
        &self,
        account: &Account,
        loan: &Loan,
        entry: &LogEntry,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_log(&mut batch, entry)?;
        self.batch_account(&mut batch, account)?;

        let cf_loans = self.cf_handle(CF_LOANS)?;
        batch.put_cf(cf_loans, loan.loan_id.as_bytes(), bincode::serialize(loan)?);

        self.db.write(batch)?;

        tracing::debug!(
            account = %account.number,
            loan_id = %loan.loan_id,
            "Loan request committed"
        );

        Ok(())
    }

    /// Commit cleared unseen flags for a set of entries and their accounts
    pub fn commit_notices_seen(&self, accounts: &[Account], entries: &[LogEntry]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for entry in entries {
            self.batch_log(&mut batch, entry)?;
        }
        for account in accounts {
            self.batch_account(&mut batch, account)?;
        }
        self.db.write(batch)?;

        tracing::debug!(cleared = entries.len(), "Notifications marked seen");

        Ok(())
    }

    // Batch helpers

    fn batch_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        batch.put_cf(cf, account.number.as_str().as_bytes(), bincode::serialize(account)?);
        Ok(())
    }

    fn batch_log(&self, batch: &mut WriteBatch, entry: &LogEntry) -> Result<()> {
        let cf = self.cf_handle(CF_LOGS)?;
        batch.put_cf(cf, entry.log_id.as_bytes(), bincode::serialize(entry)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::LogKind;
    use crate::types::{AccountStatus, AccountType};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_account() -> Account {
        Account::request(AccountNumber::generate(), AccountType::Checking)
    }

    fn test_user(username: &str) -> User {
        User {
            username: username.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@example.com".into(),
            password_hash: "opaque".into(),
            pin: "1234".into(),
            accounts: vec![],
        }
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(storage.db.cf_handle(CF_USERS).is_some());
        assert!(storage.db.cf_handle(CF_LOANS).is_some());
        assert!(storage.db.cf_handle(CF_LOGS).is_some());
    }

    #[test]
    fn test_put_and_get_account() {
        let (storage, _temp) = test_storage();
        let mut account = test_account();
        account.balance = Decimal::new(10050, 2);
        account.status = AccountStatus::Active;

        storage.put_account(&account).unwrap();

        let retrieved = storage.get_account(&account.number).unwrap().unwrap();
        assert_eq!(retrieved, account);
    }

    #[test]
    fn test_missing_account_is_none() {
        let (storage, _temp) = test_storage();
        let missing = storage.get_account(&AccountNumber::new("00000000000000")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_put_and_get_user() {
        let (storage, _temp) = test_storage();
        let user = test_user("jdoe");
        storage.put_user(&user).unwrap();

        let retrieved = storage.get_user("jdoe").unwrap().unwrap();
        assert_eq!(retrieved, user);
        assert!(storage.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_commit_transfer_shares_one_log() {
        let (storage, _temp) = test_storage();
        let mut sender = test_account();
        let mut receiver = test_account();

        let entry = LogEntry::record(
            LogKind::Transfer,
            &["30.00", sender.number.as_str(), receiver.number.as_str()],
        );
        sender.logs.push(entry.log_id);
        receiver.logs.push(entry.log_id);

        storage.commit_transfer(&sender, &receiver, &entry).unwrap();

        let sender_logs = storage
            .logs_for(&storage.get_account(&sender.number).unwrap().unwrap())
            .unwrap();
        let receiver_logs = storage
            .logs_for(&storage.get_account(&receiver.number).unwrap().unwrap())
            .unwrap();

        assert_eq!(sender_logs.len(), 1);
        assert_eq!(receiver_logs.len(), 1);
        assert_eq!(sender_logs[0].log_id, receiver_logs[0].log_id);
        assert_eq!(sender_logs[0].message, receiver_logs[0].message);
    }

    #[test]
    fn test_dangling_log_reference_is_an_error() {
        let (storage, _temp) = test_storage();
        let mut account = test_account();
        account.logs.push(Uuid::now_v7());
        storage.put_account(&account).unwrap();

        let err = storage.logs_for(&account).unwrap_err();
        assert!(matches!(err, Error::DanglingLog(_)));
    }

    #[test]
    fn test_commit_loan_request() {
        let (storage, _temp) = test_storage();
        let mut account = test_account();
        let loan = Loan::new(Decimal::new(500000, 2));
        let entry = LogEntry::record(LogKind::RequestLoan, &[account.number.as_str(), "5,000.00"]);
        account.loans.push(loan.loan_id);
        account.logs.push(entry.log_id);

        storage.commit_loan_request(&account, &loan, &entry).unwrap();

        let loans = storage
            .loans_for(&storage.get_account(&account.number).unwrap().unwrap())
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].principal, Decimal::new(500000, 2));
    }
}
