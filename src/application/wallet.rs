use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info, warn};

use crate::domain::{
    AccountId, INITIAL_WALLET_GRANT, LedgerEntry, Order, Paise, PaymentMethod, Reconciliation,
    TransactionKind, format_rupees, rupees,
};
use crate::storage::{BalanceChange, Repository};

use super::{AppError, Validator};

pub const TOP_UP_DESCRIPTION: &str = "Wallet Top-up";
pub const ORDER_PAYMENT_DESCRIPTION: &str = "Laundry Service Payment";

/// Inclusive top-up bounds enforced by [`WalletService::add_money`].
pub const MIN_TOP_UP: Paise = rupees(100);
pub const MAX_TOP_UP: Paise = rupees(10_000);

/// Entries returned by the transaction history endpoint.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Attempts at the balance compare-and-swap before giving up.
pub const MAX_CAS_ATTEMPTS: u32 = 5;

/// Result of a committed wallet mutation.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub new_balance: Paise,
    pub entry: LedgerEntry,
}

/// Per-account async locks, dropped once nobody holds them.
#[derive(Default)]
struct AccountLocks {
    inner: Mutex<HashMap<AccountId, Weak<tokio::sync::Mutex<()>>>>,
}

impl AccountLocks {
    fn for_account(&self, account_id: AccountId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&account_id).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(account_id, Arc::downgrade(&lock));
        lock
    }
}

/// Applies balance mutations and their ledger entries as one unit.
///
/// Mutations on the same account are serialized in-process by a per-account
/// lock held for the whole read-modify-write-append, and guarded against
/// other processes by a compare-and-swap on the account's balance version.
#[derive(Clone)]
pub struct WalletService {
    repo: Repository,
    locks: Arc<AccountLocks>,
}

impl WalletService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: Arc::new(AccountLocks::default()),
        }
    }

    /// Apply a credit or debit to one account and append the matching ledger entry.
    ///
    /// Fails with [`AppError::InsufficientFunds`] when a debit would take the
    /// balance negative and with [`AppError::AccountNotFound`] for unknown
    /// accounts; in both cases nothing is written.
    pub async fn apply_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Paise,
        description: &str,
        method: PaymentMethod,
    ) -> Result<TransactionResult, AppError> {
        self.apply(account_id, kind, amount, description, method, None)
            .await
    }

    /// Debit the order total from its account's wallet and persist the order
    /// in the same commit.
    pub(crate) async fn pay_for_order(&self, order: &Order) -> Result<TransactionResult, AppError> {
        self.apply(
            order.account_id,
            TransactionKind::Debit,
            order.total_amount,
            ORDER_PAYMENT_DESCRIPTION,
            PaymentMethod::Wallet,
            Some(order),
        )
        .await
    }

    async fn apply(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Paise,
        description: &str,
        method: PaymentMethod,
        order: Option<&Order>,
    ) -> Result<TransactionResult, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let lock = self.locks.for_account(account_id);
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let account = self
                .repo
                .get_account(account_id)
                .await?
                .ok_or(AppError::AccountNotFound(account_id))?;

            let new_balance = account
                .wallet_balance
                .checked_add(kind.signed(amount))
                .ok_or_else(|| AppError::InvalidAmount("Amount is too large".to_string()))?;

            if new_balance < 0 {
                warn!(
                    account_id = %account_id,
                    balance = account.wallet_balance,
                    required = amount,
                    "Rejected debit: insufficient funds"
                );
                return Err(AppError::InsufficientFunds {
                    balance: account.wallet_balance,
                    required: amount,
                });
            }

            let entry = LedgerEntry::new(
                account_id,
                account.balance_version + 1,
                kind,
                amount,
                description,
                method,
                new_balance,
            );
            let change = BalanceChange {
                account_id,
                expected_version: account.balance_version,
                new_balance,
                entry: &entry,
            };

            if self.repo.commit_balance_change(&change, order).await? {
                info!(
                    account_id = %account_id,
                    kind = %kind,
                    amount = %format_rupees(amount),
                    balance = %format_rupees(new_balance),
                    sequence = entry.sequence,
                    "Committed wallet transaction"
                );
                return Ok(TransactionResult { new_balance, entry });
            }

            debug!(account_id = %account_id, attempt, "Balance version moved, retrying");
        }

        warn!(account_id = %account_id, "Giving up on contended wallet update");
        Err(AppError::ConcurrentModification(account_id))
    }

    /// Top up a wallet from an external payment method.
    ///
    /// `amount` must lie within [`MIN_TOP_UP`, `MAX_TOP_UP`] and `method` must
    /// be one of card, upi or netbanking.
    pub async fn add_money(
        &self,
        account_id: AccountId,
        amount: Paise,
        method: &str,
    ) -> Result<TransactionResult, AppError> {
        let mut v = Validator::new();
        v.check(
            (MIN_TOP_UP..=MAX_TOP_UP).contains(&amount),
            "amount",
            "Amount must be between ₹100 and ₹10,000",
        );
        let method = v.require(
            PaymentMethod::from_str(method).filter(PaymentMethod::accepted_for_top_up),
            "paymentMethod",
            "Invalid payment method",
        );
        let method = v.finish_with(method)?;

        self.apply_transaction(
            account_id,
            TransactionKind::Credit,
            amount,
            TOP_UP_DESCRIPTION,
            method,
        )
        .await
    }

    /// Current balance of an account.
    pub async fn balance(&self, account_id: AccountId) -> Result<Paise, AppError> {
        Ok(self
            .repo
            .get_account(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?
            .wallet_balance)
    }

    /// Most recent ledger entries, newest first.
    pub async fn recent_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.repo.recent_entries(account_id, limit).await?)
    }

    /// Full ledger of an account in commit order.
    pub async fn ledger(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.repo.list_entries(account_id).await?)
    }

    /// Replay an account's ledger from the initial grant and compare with the stored balance.
    pub async fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, AppError> {
        let lock = self.locks.for_account(account_id);
        let _guard = lock.lock().await;

        let account = self
            .repo
            .get_account(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;
        let entries = self.repo.list_entries(account_id).await?;

        Ok(Reconciliation::build(
            account_id,
            INITIAL_WALLET_GRANT,
            account.wallet_balance,
            account.balance_version,
            &entries,
        ))
    }

    /// Reconcile every account.
    pub async fn reconcile_all(&self) -> Result<Vec<Reconciliation>, AppError> {
        let states = self.repo.list_wallet_states().await?;
        let mut reports = Vec::with_capacity(states.len());
        for state in states {
            reports.push(self.reconcile(state.account_id).await?);
        }
        Ok(reports)
    }
}
