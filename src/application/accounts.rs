use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{PasswordHasher, TokenSigner};
use crate::domain::{Account, AccountId, normalize_email};
use crate::storage::{ProfileUpdate, Repository};

use super::{AppError, MIN_PASSWORD_LEN, Validator, is_valid_email, is_valid_phone};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile edit; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
}

/// A freshly authenticated account and its bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

/// Signup, login, profile management and token resolution.
#[derive(Clone)]
pub struct AccountService {
    repo: Repository,
    hasher: PasswordHasher,
    tokens: TokenSigner,
}

impl AccountService {
    pub fn new(repo: Repository, hasher: PasswordHasher, tokens: TokenSigner) -> Self {
        Self {
            repo,
            hasher,
            tokens,
        }
    }

    /// Register a new account with the starting wallet grant.
    pub async fn signup(&self, request: SignupRequest) -> Result<Session, AppError> {
        let mut v = Validator::new();
        v.check(!request.name.trim().is_empty(), "name", "Name is required")
            .check(
                is_valid_email(&request.email),
                "email",
                "Please enter a valid email",
            )
            .check(
                is_valid_phone(request.phone.trim()),
                "phone",
                "Please enter a valid 10-digit phone number",
            )
            .check(
                !request.address.trim().is_empty(),
                "address",
                "Address is required",
            )
            .check(
                request.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "Password must be at least 6 characters long",
            );
        v.finish()?;

        let email = normalize_email(&request.email);
        if self.repo.get_account_by_email(&email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }

        let account = Account::new(
            request.name.trim().to_string(),
            &email,
            request.phone.trim().to_string(),
            request.address.trim().to_string(),
            self.hasher.hash(&request.password),
        );
        if let Err(err) = self.repo.save_account(&account).await {
            // Lost a race against a concurrent signup for the same email
            if self.repo.get_account_by_email(&email).await?.is_some() {
                return Err(AppError::EmailTaken);
            }
            return Err(err.into());
        }

        info!(account_id = %account.id, "Account created");
        Ok(Session {
            token: self.tokens.issue(account.id)?,
            account,
        })
    }

    /// Exchange email and password for a token.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AppError> {
        let mut v = Validator::new();
        v.check(
            is_valid_email(&request.email),
            "email",
            "Please enter a valid email",
        )
        .check(
            !request.password.is_empty(),
            "password",
            "Password is required",
        );
        v.finish()?;

        let account = self
            .repo
            .get_account_by_email(&normalize_email(&request.email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.hasher.verify(&request.password, &account.password_hash) {
            warn!(account_id = %account.id, "Rejected login: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        Ok(Session {
            token: self.tokens.issue(account.id)?,
            account,
        })
    }

    /// Resolve a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AppError> {
        let account_id = self
            .tokens
            .verify(token)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        self.repo
            .get_account(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))
    }

    pub async fn profile(&self, account_id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))
    }

    /// Update contact fields and/or password. The wallet is never touched here.
    pub async fn update_profile(
        &self,
        account_id: AccountId,
        patch: ProfilePatch,
    ) -> Result<Account, AppError> {
        let mut v = Validator::new();
        if let Some(name) = &patch.name {
            v.check(!name.trim().is_empty(), "name", "Name cannot be empty");
        }
        if let Some(phone) = &patch.phone {
            v.check(
                is_valid_phone(phone.trim()),
                "phone",
                "Please enter a valid 10-digit phone number",
            );
        }
        if let Some(address) = &patch.address {
            v.check(
                !address.trim().is_empty(),
                "address",
                "Address cannot be empty",
            );
        }
        if let Some(password) = &patch.password {
            v.check(
                password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "Password must be at least 6 characters long",
            );
        }
        v.finish()?;

        let update = ProfileUpdate {
            name: patch.name.map(|s| s.trim().to_string()),
            phone: patch.phone.map(|s| s.trim().to_string()),
            address: patch.address.map(|s| s.trim().to_string()),
            password_hash: patch.password.map(|p| self.hasher.hash(&p)),
        };
        self.repo.update_profile(account_id, &update).await?;

        self.profile(account_id).await
    }
}
