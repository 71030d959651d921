mod sign;

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, Method, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

pub use shared::signing::{CERTIFICATE_PATH, SIGN_PATH};

pub fn router(state: Arc<AppState>) -> Router {
    router_with_timeout(state, Duration::from_secs(30))
}

pub fn router_with_timeout(state: Arc<AppState>, timeout: Duration) -> Router {
    // 控制台在浏览器里跨域调用
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ]);

    Router::new()
        .route(SIGN_PATH, post(sign::sign_message))
        .route(CERTIFICATE_PATH, get(certificate))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(256 * 1024)) // challenges are small
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .with_state(state)
}

async fn certificate(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let cert = state
        .certificate
        .clone()
        .ok_or_else(|| AppError::NotFound("No certificate published".into()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], cert))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let signing_ready = state.signer.is_some() && state.sessions.is_some();
    let status = if signing_ready { "ok" } else { "degraded" };
    Json(serde_json::json!({
        "status": status,
        "signing_key": state.signer.is_some(),
        "session_verification": state.sessions.is_some(),
        "certificate": state.certificate.is_some(),
    }))
}
