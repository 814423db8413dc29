use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Paise, rupee_amount};

pub type EntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money entering the wallet (top-ups)
    Credit,
    /// Money leaving the wallet (order payments)
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(TransactionKind::Credit),
            "debit" => Some(TransactionKind::Debit),
            _ => None,
        }
    }

    /// Signed effect of `amount` on a balance.
    pub fn signed(&self, amount: Paise) -> Paise {
        match self {
            TransactionKind::Credit => amount,
            TransactionKind::Debit => -amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wallet,
    Card,
    Upi,
    Netbanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Netbanking => "netbanking",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "wallet" => Some(PaymentMethod::Wallet),
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            "netbanking" => Some(PaymentMethod::Netbanking),
            _ => None,
        }
    }

    /// Methods an order can be paid with.
    pub fn accepted_for_orders(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Wallet | PaymentMethod::Card | PaymentMethod::Upi
        )
    }

    /// External methods a wallet top-up can be funded from.
    pub fn accepted_for_top_up(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Card | PaymentMethod::Upi | PaymentMethod::Netbanking
        )
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable record of one committed wallet balance mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    /// Balance version this entry committed; dense and unique per account
    pub sequence: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Always positive
    #[serde(with = "rupee_amount")]
    pub amount: Paise,
    pub description: String,
    #[serde(rename = "paymentMethod")]
    pub method: PaymentMethod,
    #[serde(with = "rupee_amount")]
    pub balance_after: Paise,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a new entry. The sequence is the account's balance version after the mutation.
    pub fn new(
        account_id: AccountId,
        sequence: i64,
        kind: TransactionKind,
        amount: Paise,
        description: impl Into<String>,
        method: PaymentMethod,
        balance_after: Paise,
    ) -> Self {
        assert!(amount > 0, "Ledger entry amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_id,
            sequence,
            kind,
            amount,
            description: description.into(),
            method,
            balance_after,
            created_at: Utc::now(),
        }
    }

    pub fn signed_amount(&self) -> Paise {
        self.kind.signed(self.amount)
    }
}

/// Replay ledger entries on top of an opening balance.
/// Entries must be in commit (sequence) order.
pub fn replay_balance(opening: Paise, entries: &[LedgerEntry]) -> Paise {
    entries
        .iter()
        .fold(opening, |balance, entry| balance + entry.signed_amount())
}

/// Outcome of replaying an account's ledger against its stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub account_id: AccountId,
    pub stored_balance: Paise,
    pub replayed_balance: Paise,
    pub stored_version: i64,
    pub entry_count: i64,
    /// First sequence number that is missing or out of place, if any
    pub sequence_gap: Option<i64>,
}

impl Reconciliation {
    pub fn build(
        account_id: AccountId,
        opening: Paise,
        stored_balance: Paise,
        stored_version: i64,
        entries: &[LedgerEntry],
    ) -> Self {
        let sequence_gap = entries
            .iter()
            .zip(1..)
            .find(|(entry, expected)| entry.sequence != *expected)
            .map(|(_, expected)| expected)
            .or_else(|| {
                let count = entries.len() as i64;
                (count != stored_version).then_some(count + 1)
            });

        Self {
            account_id,
            stored_balance,
            replayed_balance: replay_balance(opening, entries),
            stored_version,
            entry_count: entries.len() as i64,
            sequence_gap,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.stored_balance == self.replayed_balance && self.sequence_gap.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account: AccountId, seq: i64, kind: TransactionKind, amount: Paise) -> LedgerEntry {
        LedgerEntry::new(account, seq, kind, amount, "test", PaymentMethod::Upi, 0)
    }

    #[test]
    fn test_replay_empty_is_opening() {
        assert_eq!(replay_balance(50_000, &[]), 50_000);
    }

    #[test]
    fn test_replay_mixed() {
        let account = Uuid::new_v4();
        let entries = vec![
            entry(account, 1, TransactionKind::Credit, 10_000),
            entry(account, 2, TransactionKind::Debit, 50_000),
            entry(account, 3, TransactionKind::Credit, 2_500),
        ];
        assert_eq!(replay_balance(50_000, &entries), 12_500);
    }

    #[test]
    fn test_reconciliation_consistent() {
        let account = Uuid::new_v4();
        let entries = vec![
            entry(account, 1, TransactionKind::Credit, 10_000),
            entry(account, 2, TransactionKind::Debit, 50_000),
        ];
        let report = Reconciliation::build(account, 50_000, 10_000, 2, &entries);
        assert!(report.is_consistent());
        assert_eq!(report.entry_count, 2);
    }

    #[test]
    fn test_reconciliation_detects_lost_update() {
        // Two credits were logged but the stored balance only reflects one
        let account = Uuid::new_v4();
        let entries = vec![
            entry(account, 1, TransactionKind::Credit, 10_000),
            entry(account, 2, TransactionKind::Credit, 10_000),
        ];
        let report = Reconciliation::build(account, 50_000, 60_000, 2, &entries);
        assert!(!report.is_consistent());
        assert_eq!(report.replayed_balance, 70_000);
    }

    #[test]
    fn test_reconciliation_detects_unlogged_mutation() {
        let account = Uuid::new_v4();
        let entries = vec![entry(account, 1, TransactionKind::Credit, 10_000)];
        let report = Reconciliation::build(account, 50_000, 60_000, 2, &entries);
        assert_eq!(report.sequence_gap, Some(2));
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_signed_amount() {
        assert_eq!(TransactionKind::Credit.signed(500), 500);
        assert_eq!(TransactionKind::Debit.signed(500), -500);
    }

    #[test]
    fn test_method_acceptance() {
        assert!(PaymentMethod::Wallet.accepted_for_orders());
        assert!(!PaymentMethod::Netbanking.accepted_for_orders());
        assert!(PaymentMethod::Netbanking.accepted_for_top_up());
        assert!(!PaymentMethod::Wallet.accepted_for_top_up());
    }

    #[test]
    #[should_panic(expected = "Ledger entry amount must be positive")]
    fn test_entry_requires_positive_amount() {
        entry(Uuid::new_v4(), 1, TransactionKind::Credit, 0);
    }
}
