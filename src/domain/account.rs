use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Paise, rupee_amount, rupees};

pub type AccountId = Uuid;

/// Balance every new account starts with.
pub const INITIAL_WALLET_GRANT: Paise = rupees(500);

/// A registered user and its wallet state.
///
/// `wallet_balance` is only ever written by the wallet service, and every
/// write bumps `balance_version` by one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "rupee_amount")]
    pub wallet_balance: Paise,
    #[serde(skip_serializing)]
    pub balance_version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        name: String,
        email: &str,
        phone: String,
        address: String,
        password_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: normalize_email(email),
            phone,
            address,
            password_hash,
            wallet_balance: INITIAL_WALLET_GRANT,
            balance_version: 0,
            created_at: Utc::now(),
        }
    }
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_with_grant() {
        let account = Account::new(
            "Asha".into(),
            " Asha@Example.com ",
            "9876543210".into(),
            "12 MG Road".into(),
            "hash".into(),
        );
        assert_eq!(account.wallet_balance, 50_000);
        assert_eq!(account.balance_version, 0);
        assert_eq!(account.email, "asha@example.com");
    }

    #[test]
    fn test_serialized_account_hides_credentials() {
        let account = Account::new(
            "Asha".into(),
            "asha@example.com",
            "9876543210".into(),
            "12 MG Road".into(),
            "secret-hash".into(),
        );
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("balanceVersion").is_none());
        assert_eq!(json["walletBalance"], serde_json::json!(500));
    }
}
