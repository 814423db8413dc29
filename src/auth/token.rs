use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::AccountId;

const HKDF_SALT: &[u8] = b"freshclean-token";
const HKDF_INFO: &[u8] = b"freshclean-token-signing-key-v1";

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Longest token lifetime a signer accepts.
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token signing key could not be derived")]
    KeyDerivation,

    #[error("token lifetime is out of range")]
    InvalidLifetime,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: AccountId,
    exp: i64,
}

/// Issues and verifies compact bearer tokens: `<hex(claims)>.<hex(signature)>`.
///
/// The ed25519 key is derived from the configured secret, so every process
/// sharing the secret accepts the same tokens.
#[derive(Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn from_secret(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if ttl <= Duration::zero() || ttl > Duration::days(MAX_TOKEN_TTL_DAYS) {
            return Err(TokenError::InvalidLifetime);
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret.as_bytes());
        let mut seed = [0u8; 32];
        hk.expand(HKDF_INFO, &mut seed)
            .map_err(|_| TokenError::KeyDerivation)?;

        let signing_key = SigningKey::from_bytes(&seed);
        Ok(Self {
            verifying_key: signing_key.verifying_key(),
            signing_key,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, account_id: AccountId) -> Result<String, TokenError> {
        self.issue_at(account_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::InvalidLifetime)?;
        let claims = Claims {
            sub: account_id,
            exp: expires.timestamp(),
        };
        // Serializing a uuid and an integer cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signature = self.signing_key.sign(&payload);
        Ok(format!(
            "{}.{}",
            hex::encode(&payload),
            hex::encode(signature.to_bytes())
        ))
    }

    /// Verify a token and return the account it was issued for.
    pub fn verify(&self, token: &str) -> Result<AccountId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccountId, TokenError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = hex::decode(payload_hex).map_err(|_| TokenError::Malformed)?;
        let signature_bytes = hex::decode(signature_hex).map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

        self.verifying_key
            .verify(&payload, &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::from_secret(secret, Duration::days(DEFAULT_TOKEN_TTL_DAYS)).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer("s3cret");
        let account = Uuid::new_v4();
        let token = signer.issue(account).unwrap();
        assert_eq!(signer.verify(&token), Ok(account));
    }

    #[test]
    fn test_other_secret_rejects() {
        let token = signer("one").issue(Uuid::new_v4()).unwrap();
        assert_eq!(signer("two").verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer("s3cret");
        let issued = Utc::now() - Duration::days(8);
        let token = signer.issue_at(Uuid::new_v4(), issued).unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_payload() {
        let signer = signer("s3cret");
        let token = signer.issue(Uuid::new_v4()).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = format!(r#"{{"sub":"{}","exp":9999999999}}"#, Uuid::new_v4());
        let forged = format!("{}.{}", hex::encode(forged_claims), sig);
        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer("s3cret");
        assert_eq!(signer.verify(""), Err(TokenError::Malformed));
        assert_eq!(signer.verify("abc"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("zz.zz"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_lifetime_bounds() {
        for ttl in [Duration::zero(), Duration::days(-1), Duration::days(366)] {
            assert!(matches!(
                TokenSigner::from_secret("s3cret", ttl),
                Err(TokenError::InvalidLifetime)
            ));
        }
        assert!(TokenSigner::from_secret("s3cret", Duration::days(MAX_TOKEN_TTL_DAYS)).is_ok());
    }

    #[test]
    fn test_issue_past_max_date_fails() {
        let signer = signer("s3cret");
        assert_eq!(
            signer.issue_at(Uuid::new_v4(), DateTime::<Utc>::MAX_UTC),
            Err(TokenError::InvalidLifetime)
        );
    }
}
