use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// A `POST /api/nfs/{method}` request body. `method` itself comes from the
/// URL path, not this struct — the body only needs to carry `id` and
/// `params` per §6's JSON-RPC 2.0 envelope.
#[derive(Debug, Default, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, err: &RpcError) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(RpcErrorBody { code: err.code(), message: err.to_string() }) }
    }
}

/// A request that failed before an `id` could be recovered from the body
/// (bad JSON, or auth rejected before the body was even read) always
/// reports `id: null`, same as any other JSON-RPC implementation faced with
/// an unparseable envelope.
impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        Json(RpcResponse::failure(Value::Null, &self)).into_response()
    }
}
