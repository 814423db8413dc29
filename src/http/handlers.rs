use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::application::{
    DEFAULT_HISTORY_LIMIT, FeedbackRequest, FeedbackView, LoginRequest, OrderRequest,
    ProfilePatch, SignupRequest,
};
use crate::domain::{Account, Feedback, LedgerEntry, Order, Paise, rupee_amount};

use super::{ApiJson, AppError, AppState, AuthAccount};

type ApiResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    message: &'static str,
    token: String,
    user: Account,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    message: &'static str,
    user: Account,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddMoneyRequest {
    #[serde(with = "rupee_amount::option")]
    amount: Option<Paise>,
    payment_method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    message: &'static str,
    #[serde(with = "rupee_amount")]
    new_balance: Paise,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    message: &'static str,
    order: Order,
    #[serde(with = "rupee_amount")]
    new_balance: Paise,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    message: &'static str,
    feedback: Feedback,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = state.service.accounts().signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User created successfully",
            token: session.token,
            user: session.account,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.service.accounts().login(request).await?;
    Ok(Json(SessionResponse {
        message: "Login successful",
        token: session.token,
        user: session.account,
    }))
}

pub async fn get_profile(AuthAccount(account): AuthAccount) -> Json<Account> {
    Json(account)
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .service
        .accounts()
        .update_profile(account.id, patch)
        .await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user,
    }))
}

pub async fn add_money(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    ApiJson(request): ApiJson<AddMoneyRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    // A missing amount fails the range check
    let result = state
        .service
        .wallet()
        .add_money(
            account.id,
            request.amount.unwrap_or_default(),
            &request.payment_method,
        )
        .await?;
    Ok(Json(BalanceResponse {
        message: "Money added successfully",
        new_balance: result.new_balance,
    }))
}

pub async fn transactions(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let entries = state
        .service
        .wallet()
        .recent_transactions(account.id, DEFAULT_HISTORY_LIMIT)
        .await?;
    Ok(Json(entries))
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let placed = state
        .service
        .orders()
        .place_order(account.id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order created successfully",
            order: placed.order,
            new_balance: placed.new_balance,
        }),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.service.orders().list_orders(account.id).await?))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let feedback = state.service.feedback().submit(account.id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(FeedbackResponse {
            message: "Feedback submitted successfully",
            feedback,
        }),
    ))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
) -> ApiResult<Json<Vec<FeedbackView>>> {
    Ok(Json(state.service.feedback().list(account.id).await?))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "FreshClean API is running" }))
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "API endpoint not found" })),
    )
}
