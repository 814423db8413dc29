mod common;

use anyhow::Result;
use chrono::Duration;
use freshclean::application::{AppError, LoginRequest, ProfilePatch};
use freshclean::auth::TokenSigner;
use freshclean::domain::rupees;
use uuid::Uuid;

use common::{signup, signup_request, test_service, test_signer};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn test_signup_normalizes_email_and_hashes_password() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let session = service
        .accounts()
        .signup(signup_request("  Asha@Example.COM "))
        .await?;
    assert_eq!(session.account.email, "asha@example.com");
    assert_ne!(session.account.password_hash, "secret123");
    assert!(session.account.password_hash.starts_with("sha256$"));

    let json = serde_json::to_value(&session.account)?;
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["walletBalance"], 500);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    signup(&service, "asha@example.com").await?;

    let err = service
        .accounts()
        .signup(signup_request("ASHA@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailTaken));

    Ok(())
}

#[tokio::test]
async fn test_signup_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut request = signup_request("not-an-email");
    request.phone = "98765".into();
    request.password = "123".into();
    let err = service.accounts().signup(request).await.unwrap_err();
    match err {
        AppError::Validation(errors) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["email", "phone", "password"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_login() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, _) = signup(&service, "asha@example.com").await?;

    let session = service
        .accounts()
        .login(login("ASHA@example.com", "secret123"))
        .await?;
    assert_eq!(session.account.id, account.id);
    assert_eq!(
        service.accounts().authenticate(&session.token).await?.id,
        account.id
    );

    let err = service
        .accounts()
        .login(login("asha@example.com", "wrong-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    let err = service
        .accounts()
        .login(login("nobody@example.com", "secret123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejects_bad_tokens() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, token) = signup(&service, "asha@example.com").await?;

    assert_eq!(service.accounts().authenticate(&token).await?.id, account.id);

    let err = service
        .accounts()
        .authenticate("garbage")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let foreign = TokenSigner::from_secret("other-secret", Duration::days(7))?.issue(account.id)?;
    let err = service
        .accounts()
        .authenticate(&foreign)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let ghost = test_signer().issue(Uuid::new_v4())?;
    let err = service.accounts().authenticate(&ghost).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_update_profile() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (account, _) = signup(&service, "asha@example.com").await?;
    service
        .wallet()
        .add_money(account.id, rupees(100), "card")
        .await?;

    let updated = service
        .accounts()
        .update_profile(
            account.id,
            ProfilePatch {
                name: Some("Asha R.".into()),
                address: Some("7 Residency Road".into()),
                password: Some("newsecret".into()),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.name, "Asha R.");
    assert_eq!(updated.address, "7 Residency Road");
    assert_eq!(updated.phone, account.phone);
    assert_eq!(updated.wallet_balance, rupees(600));

    service
        .accounts()
        .login(login("asha@example.com", "newsecret"))
        .await?;
    assert!(
        service
            .accounts()
            .login(login("asha@example.com", "secret123"))
            .await
            .is_err()
    );

    let err = service
        .accounts()
        .update_profile(
            account.id,
            ProfilePatch {
                phone: Some("12".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}
