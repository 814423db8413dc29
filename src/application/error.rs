use serde::Serialize;
use thiserror::Error;

use crate::auth::TokenError;
use crate::domain::{AccountId, Paise};

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient wallet balance: balance {balance}, required {required}")]
    InsufficientFunds { balance: Paise, required: Paise },

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Wallet of account {0} kept changing, giving up")]
    ConcurrentModification(AccountId),

    #[error("Token could not be issued: {0}")]
    TokenIssue(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = AppError::field("weight", "Weight must be between 1 and 20 kg");
        assert_eq!(
            err.to_string(),
            "Validation failed: weight: Weight must be between 1 and 20 kg"
        );
    }
}
