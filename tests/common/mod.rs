// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{Duration, Utc};
use freshclean::application::{LaundryService, OrderRequest, SignupRequest};
use freshclean::auth::TokenSigner;
use freshclean::domain::Account;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "test-secret";

pub fn test_signer() -> TokenSigner {
    TokenSigner::from_secret(TEST_SECRET, Duration::days(7)).unwrap()
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LaundryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LaundryService::init(db_path.to_str().unwrap(), test_signer()).await?;
    Ok((service, temp_dir))
}

/// A second service on the database of `test_service`, as another process would open it
pub async fn connect_service(temp_dir: &TempDir) -> Result<LaundryService> {
    let db_path = temp_dir.path().join("test.db");
    let service = LaundryService::connect(db_path.to_str().unwrap(), test_signer()).await?;
    Ok(service)
}

pub fn signup_request(email: &str) -> SignupRequest {
    SignupRequest {
        name: "Asha Rao".into(),
        email: email.into(),
        phone: "9876543210".into(),
        address: "12 MG Road, Bengaluru".into(),
        password: "secret123".into(),
    }
}

/// Register an account and return it with its token.
pub async fn signup(service: &LaundryService, email: &str) -> Result<(Account, String)> {
    let session = service.accounts().signup(signup_request(email)).await?;
    Ok((session.account, session.token))
}

/// A valid booking request; tweak fields per test.
pub fn order_request(service_type: &str, weight: f64, express: bool, method: &str) -> OrderRequest {
    OrderRequest {
        name: "Asha Rao".into(),
        phone: "9876543210".into(),
        address: "12 MG Road, Bengaluru".into(),
        pickup_date: (Utc::now() + Duration::days(1))
            .date_naive()
            .format("%Y-%m-%d")
            .to_string(),
        pickup_time: "10:00 AM - 12:00 PM".into(),
        service_type: service_type.into(),
        weight: Some(weight),
        express,
        total_amount: None,
        payment_method: method.into(),
    }
}
