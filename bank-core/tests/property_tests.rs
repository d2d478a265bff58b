//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Money conservation: a transfer debits exactly what it credits
//! - Refusals leave no partial state and no log entry
//! - Debt never drops below zero
//! - Statements only carry reportable kinds, in order
//! - Unseen notifications are a subset of the full history

use bank_core::{
    types::{AccountNumber, AccountType},
    Config, Customer, Ledger, LogKind, Outcome, User,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating valid amounts (positive decimals, cents)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Create test ledger with temp directory
async fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    (Ledger::open(config).await.unwrap(), temp_dir)
}

fn test_user(username: &str) -> User {
    User {
        username: username.into(),
        first_name: "Test".into(),
        last_name: "User".into(),
        email: format!("{}@example.com", username),
        password_hash: "opaque".into(),
        pin: "0000".into(),
        accounts: vec![],
    }
}

/// Register a user and open one active checking account, returning its number
async fn open_active_account(ledger: &Ledger, username: &str) -> AccountNumber {
    ledger.register_user(test_user(username)).await.unwrap();
    ledger
        .create_account(username, AccountType::Checking)
        .await
        .unwrap();
    let user = ledger.get_user(username).unwrap().unwrap();
    let number = user.accounts.last().unwrap().clone();
    ledger.enable_account(&number).await.unwrap();
    number
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a completed transfer conserves money and both sides share
    /// one log entry
    #[test]
    fn prop_transfer_conserves_money(
        funding in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let sender = open_active_account(&ledger, "sender").await;
            let receiver = open_active_account(&ledger, "receiver").await;
            ledger.deposit(&sender, funding).await.unwrap();

            let outcome = ledger.transfer_money(&sender, &receiver, amount).await.unwrap();

            let s = ledger.get_account(&sender).unwrap().unwrap();
            let r = ledger.get_account(&receiver).unwrap().unwrap();
            prop_assert_eq!(s.balance + r.balance, funding);

            if funding >= amount {
                prop_assert!(outcome.is_completed());
                prop_assert_eq!(s.balance, funding - amount);
                prop_assert_eq!(r.balance, amount);
                // Shared entry: last log id identical on both sides
                prop_assert_eq!(s.logs.last(), r.logs.last());
            } else {
                prop_assert_eq!(outcome, Outcome::InsufficientFunds);
                prop_assert_eq!(s.balance, funding);
                prop_assert_eq!(r.balance, Decimal::ZERO);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a refused transfer leaves no log entry on either side
    #[test]
    fn prop_refused_transfer_leaves_no_log(amount in amount_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let sender = open_active_account(&ledger, "sender").await;
            let receiver = open_active_account(&ledger, "receiver").await;

            let before_s = ledger.get_account(&sender).unwrap().unwrap().logs.len();
            let before_r = ledger.get_account(&receiver).unwrap().unwrap().logs.len();

            // Unfunded sender: every positive amount is refused
            let outcome = ledger.transfer_money(&sender, &receiver, amount).await.unwrap();
            prop_assert_eq!(outcome, Outcome::InsufficientFunds);

            let s = ledger.get_account(&sender).unwrap().unwrap();
            let r = ledger.get_account(&receiver).unwrap().unwrap();
            prop_assert_eq!(s.logs.len(), before_s);
            prop_assert_eq!(r.logs.len(), before_r);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: paying debt reduces it by the amount, floored at zero
    #[test]
    fn prop_debt_floored_at_zero(
        debt_cents in 1u64..1_000_00u64,
        pay_cents in 1u64..1_000_00u64,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let debt = Decimal::new(debt_cents as i64, 2);
            let payment = Decimal::new(pay_cents as i64, 2);

            let number = open_active_account(&ledger, "debtor").await;
            // Fund the account so the clearing transfer always completes
            ledger.deposit(&number, payment).await.unwrap();

            let mut account = ledger.get_account(&number).unwrap().unwrap();
            account.debt = debt;
            ledger.storage().put_account(&account).unwrap();

            let outcome = ledger.pay_debt(&number, payment).await.unwrap();
            prop_assert!(outcome.is_completed());

            let account = ledger.get_account(&number).unwrap().unwrap();
            let expected = if payment >= debt {
                Decimal::ZERO
            } else {
                debt - payment
            };
            prop_assert_eq!(account.debt, expected);
            prop_assert!(account.debt >= Decimal::ZERO);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: statements carry only reportable kinds, in recorded order
    #[test]
    fn prop_statement_kinds_and_order(deposit_count in 1usize..10) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let number = open_active_account(&ledger, "saver").await;
            ledger.request_loan(&number, Decimal::new(100000, 2)).await.unwrap();
            for i in 0..deposit_count {
                ledger
                    .deposit(&number, Decimal::new((i as i64 + 1) * 100, 2))
                    .await
                    .unwrap();
            }

            let account = ledger.get_account(&number).unwrap().unwrap();
            let lines = ledger.statement(&account).unwrap();

            // REQUEST_ACCOUNT and REQUEST_LOAN never appear
            prop_assert_eq!(lines.len(), deposit_count);
            prop_assert!(lines.iter().all(|l| l.kind == LogKind::Deposit));
            for pair in lines.windows(2) {
                prop_assert!(pair[0].at <= pair[1].at);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: unseen notifications are a subset of the full history, and
    /// marking seen empties them
    #[test]
    fn prop_unseen_subset_of_history(op_count in 1usize..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;
            let customer = Customer::new(ledger.clone());

            let number = open_active_account(&ledger, "reader").await;
            for _ in 0..op_count {
                ledger.deposit(&number, Decimal::new(100, 2)).await.unwrap();
            }

            let user = ledger.get_user("reader").unwrap().unwrap();
            let all = customer.notifications(&user, true).unwrap();
            let unseen = customer.notifications(&user, false).unwrap();

            prop_assert!(unseen.len() <= all.len());
            let all_ids: Vec<_> = all.iter().map(|e| e.log_id).collect();
            prop_assert!(unseen.iter().all(|e| all_ids.contains(&e.log_id)));

            let cleared = customer.mark_notifications_seen(&user).await.unwrap();
            prop_assert_eq!(cleared, unseen.len());
            prop_assert!(customer.notifications(&user, false).unwrap().is_empty());
            prop_assert_eq!(customer.notifications(&user, true).unwrap().len(), all.len());

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_customer_lifecycle() {
        let (ledger, _temp) = create_test_ledger().await;
        let customer = Customer::new(ledger.clone());

        let alice_acct = open_active_account(&ledger, "alice").await;
        let bob_acct = open_active_account(&ledger, "bob").await;

        // Fund, borrow, transfer, repay
        ledger
            .deposit(&alice_acct, Decimal::new(50000, 2))
            .await
            .unwrap();
        let outcome = ledger
            .request_loan(&alice_acct, Decimal::new(100000, 2))
            .await
            .unwrap();
        assert!(outcome.is_completed());

        let alice = ledger.get_user("alice").unwrap().unwrap();
        let outcome = customer
            .transfer(&alice, &alice_acct, &bob_acct, Decimal::new(20000, 2))
            .await
            .unwrap();
        assert!(outcome.is_completed());

        // Seed debt and pay part of it down
        let mut account = ledger.get_account(&alice_acct).unwrap().unwrap();
        account.debt = Decimal::new(30000, 2);
        ledger.storage().put_account(&account).unwrap();

        let outcome = customer
            .pay_debt(&alice, &alice_acct, Decimal::new(10000, 2))
            .await
            .unwrap();
        assert!(outcome.is_completed());

        let account = ledger.get_account(&alice_acct).unwrap().unwrap();
        assert_eq!(account.balance, Decimal::new(20000, 2)); // 500 - 200 - 100
        assert_eq!(account.debt, Decimal::new(20000, 2));
        assert_eq!(customer.total_debt(&alice).unwrap(), Decimal::new(20000, 2));

        // Statement shows deposit, transfer, and debt payment
        let statements = customer.statements(&alice, "").unwrap();
        let lines = &statements[alice_acct.as_str()];
        let kinds: Vec<_> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LogKind::Deposit, LogKind::Transfer, LogKind::PayDebt]
        );

        // Bob sees the transfer from his side
        let bob = ledger.get_user("bob").unwrap().unwrap();
        let statements = customer.statements(&bob, "").unwrap();
        let lines = &statements[bob_acct.as_str()];
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, LogKind::Transfer);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_debt_payment_refused_when_unfunded() {
        let (ledger, _temp) = create_test_ledger().await;

        let number = open_active_account(&ledger, "debtor").await;
        let mut account = ledger.get_account(&number).unwrap().unwrap();
        account.debt = Decimal::new(10000, 2);
        ledger.storage().put_account(&account).unwrap();

        // No balance: the clearing transfer is refused, debt untouched
        let outcome = ledger
            .pay_debt(&number, Decimal::new(5000, 2))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::InsufficientFunds);

        let account = ledger.get_account(&number).unwrap().unwrap();
        assert_eq!(account.debt, Decimal::new(10000, 2));
        assert_eq!(account.balance, Decimal::ZERO);

        ledger.shutdown().await.unwrap();
    }
}
