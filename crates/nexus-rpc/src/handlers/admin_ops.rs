use nexus_hash::Digest;
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;

use super::common::{parse_params, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

fn require_admin(auth: &AuthContext) -> Result<(), RpcError> {
    if auth.admin {
        Ok(())
    } else {
        Err(RpcError::PermissionDenied(format!("{}:{} is not an admin key", auth.subject_type, auth.subject_id)))
    }
}

fn new_bearer_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Deserialize)]
struct CreateKeyParams {
    #[serde(default)]
    is_admin: bool,
    subject_type: String,
    subject_id: String,
    tenant_id: Option<String>,
}

/// Generates the plaintext bearer token and returns it exactly once — only
/// its digest (`ApiKeyRecord.key_hash`) is ever stored, matching how a
/// password reset flow would hand back a one-time secret.
pub async fn admin_create_key(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    require_admin(auth)?;
    let p: CreateKeyParams = parse_params(params)?;
    let token = new_bearer_token();
    let hash = Digest::of(token.as_bytes()).to_hex();
    let tenant_id = p.tenant_id.unwrap_or_else(|| auth.tenant_id.clone());
    let record = state.metadata.create_key(hash, p.is_admin, p.subject_type, p.subject_id, tenant_id);
    Ok(serde_json::json!({
        "key_id": record.key_id,
        "token": token,
        "is_admin": record.is_admin,
        "subject_type": record.subject_type,
        "subject_id": record.subject_id,
        "tenant_id": record.tenant_id,
        "created_at": record.created_at,
    }))
}

pub async fn admin_list_keys(state: &AppState, auth: &AuthContext, _params: Value) -> Result<Value, RpcError> {
    require_admin(auth)?;
    let keys = state.metadata.list_keys(&auth.tenant_id);
    Ok(to_value(redact(keys))?)
}

#[derive(Deserialize)]
struct KeyIdParams {
    key_id: String,
}

pub async fn admin_get_key(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    require_admin(auth)?;
    let p: KeyIdParams = parse_params(params)?;
    let key = state.metadata.get_key(&p.key_id)?;
    Ok(to_value(redact(vec![key]).pop())?)
}

pub async fn admin_revoke_key(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    require_admin(auth)?;
    let p: KeyIdParams = parse_params(params)?;
    state.metadata.revoke_key(&p.key_id)?;
    Ok(serde_json::json!({ "success": true }))
}

#[derive(Deserialize)]
struct UpdateKeyParams {
    key_id: String,
    is_admin: bool,
}

pub async fn admin_update_key(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    require_admin(auth)?;
    let p: UpdateKeyParams = parse_params(params)?;
    state.metadata.set_key_admin(&p.key_id, p.is_admin)?;
    let key = state.metadata.get_key(&p.key_id)?;
    Ok(to_value(redact(vec![key]).pop())?)
}

/// Strips `key_hash` before anything touches the wire — only
/// `admin_create_key`'s one-time response ever carries key material.
fn redact(keys: Vec<nexus_metadata::ApiKeyRecord>) -> Vec<Value> {
    keys.into_iter()
        .map(|k| {
            serde_json::json!({
                "key_id": k.key_id,
                "is_admin": k.is_admin,
                "subject_type": k.subject_type,
                "subject_id": k.subject_id,
                "tenant_id": k.tenant_id,
                "created_at": k.created_at,
                "revoked": k.revoked,
            })
        })
        .collect()
}
