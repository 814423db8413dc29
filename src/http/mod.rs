//! JSON API over [`LaundryService`].
//!
//! All routes live under `/api`; anything else under `/api` answers with a
//! JSON 404. Authenticated routes take an [`AuthAccount`] extractor.

mod auth;
mod error;
mod handlers;

use std::future::Future;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::{AppError, LaundryService};

pub use auth::AuthAccount;
pub use error::{ApiJson, ErrorBody};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: LaundryService,
}

impl AppState {
    pub fn new(service: LaundryService) -> Self {
        Self { service }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let api = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route(
            "/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/users/add-money", post(handlers::add_money))
        .route("/users/transactions", get(handlers::transactions))
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route(
            "/feedback",
            get(handlers::list_feedback).post(handlers::submit_feedback),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves, then release the store.
pub async fn serve<F>(listener: TcpListener, service: LaundryService, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!(%addr, "FreshClean API listening");

    let app = router(AppState::new(service.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    service.close().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: run until killed
        std::future::pending::<()>().await;
    }
}
