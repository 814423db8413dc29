use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::application::{AppError, FieldError};

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidAmount(_)
            | AppError::InsufficientFunds { .. }
            | AppError::EmailTaken => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthorized(_)
            | AppError::AccountNotFound(_) => StatusCode::UNAUTHORIZED,
            AppError::ConcurrentModification(_) => StatusCode::CONFLICT,
            AppError::TokenIssue(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => ErrorBody {
                message: errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Invalid request".to_string()),
                errors,
            },
            AppError::InvalidAmount(message) => ErrorBody {
                errors: vec![FieldError::new("amount", message.clone())],
                message,
            },
            AppError::InsufficientFunds { .. } => ErrorBody::message("Insufficient wallet balance"),
            AppError::EmailTaken => ErrorBody::message("Email already registered"),
            AppError::InvalidCredentials => ErrorBody::message("Invalid credentials"),
            AppError::Unauthorized(message) => ErrorBody::message(message),
            AppError::AccountNotFound(_) => ErrorBody::message("User not found"),
            AppError::ConcurrentModification(account_id) => {
                warn!(%account_id, "Wallet update gave up after repeated conflicts");
                ErrorBody::message("Wallet is busy, please retry")
            }
            AppError::TokenIssue(err) => {
                error!(error = %err, "Request failed");
                ErrorBody::message("Server error")
            }
            AppError::Database(err) => {
                error!(error = ?err, "Request failed");
                ErrorBody::message("Server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the API error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(reject_body(rejection)),
        }
    }
}

fn reject_body(rejection: JsonRejection) -> AppError {
    AppError::field("body", rejection.body_text())
}
