use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::application::AppError;
use crate::domain::Account;

use super::AppState;

/// The account owning the request's bearer token.
pub struct AuthAccount(pub Account);

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

        match state.service.accounts().authenticate(token).await {
            Ok(account) => Ok(Self(account)),
            Err(AppError::Unauthorized(reason)) => {
                debug!(%reason, "Rejected bearer token");
                Err(AppError::Unauthorized("Invalid token".to_string()))
            }
            Err(AppError::AccountNotFound(account_id)) => {
                debug!(%account_id, "Token for a missing account");
                Err(AppError::Unauthorized("User not found".to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
