//! JSON-RPC 2.0 dispatch over HTTP (§6, L9): method registry, bearer-key
//! auth with identity-header overrides, CORS, bit-exact error-code mapping,
//! and the supplemental (non-enveloped) watch-journal poll surface.

mod auth;
mod error;
#[cfg(test)]
mod fixtures;
mod handlers;
mod protocol;
mod state;

pub use auth::AuthContext;
pub use error::{RpcError, Result};
pub use state::AppState;

use axum::extract::{Path, State};
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::watch_ops::SubscribeBody;
use protocol::{RpcRequest, RpcResponse};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/whoami", get(whoami))
        .route("/api/nfs/status", get(status))
        .route("/api/nfs/:method", post(rpc))
        .route("/api/nfs/watch/subscribe", post(watch_subscribe))
        .route("/api/nfs/watch/poll/:subscription_id", get(watch_poll))
        .route("/api/nfs/watch/:subscription_id", axum::routing::delete(watch_unsubscribe))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn whoami(auth: AuthContext) -> impl IntoResponse {
    Json(json!({
        "admin": auth.admin,
        "subject_type": auth.subject_type,
        "subject_id": auth.subject_id,
        "tenant_id": auth.tenant_id,
    }))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "latest_seq": state.journal.latest_seq() }))
}

/// Parses the body as raw bytes rather than an axum `Json<RpcRequest>`
/// extractor so a malformed body maps to `-32700 PARSE_ERROR` instead of
/// axum's generic 400 rejection.
async fn rpc(State(state): State<AppState>, auth: AuthContext, Path(method): Path<String>, body: Bytes) -> impl IntoResponse {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return Json(RpcResponse::failure(Value::Null, &RpcError::Parse(e.to_string()))),
    };

    let tracing_span = tracing::info_span!("rpc", method = %method, tenant_id = %auth.tenant_id);
    let _enter = tracing_span.enter();

    match handlers::dispatch(&state, &auth, &method, request.params).await {
        Ok(result) => Json(RpcResponse::success(request.id, result)),
        Err(err) => {
            tracing::warn!(code = err.code(), "rpc call failed: {err}");
            Json(RpcResponse::failure(request.id, &err))
        }
    }
}

async fn watch_subscribe(State(state): State<AppState>, auth: AuthContext, Json(body): Json<SubscribeBody>) -> Result<Json<Value>> {
    Ok(Json(handlers::watch_ops::subscribe(&state, &auth, body)?))
}

async fn watch_poll(State(state): State<AppState>, auth: AuthContext, Path(subscription_id): Path<String>) -> Result<Json<Value>> {
    Ok(Json(handlers::watch_ops::poll(&state, &auth, &subscription_id)?))
}

async fn watch_unsubscribe(State(state): State<AppState>, auth: AuthContext, Path(subscription_id): Path<String>) -> Result<Json<Value>> {
    Ok(Json(handlers::watch_ops::unsubscribe(&state, &auth, &subscription_id)?))
}
