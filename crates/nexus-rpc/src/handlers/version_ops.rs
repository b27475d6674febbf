use nexus_metadata::normalize;
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::{parse_params, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

#[derive(Deserialize)]
struct VersionParams {
    path: String,
    version: u64,
}

pub async fn get_version(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: VersionParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    let record = state.versioning.get_version(&auth.tenant_id, &path, p.version)?;
    Ok(to_value(record)?)
}

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

pub async fn list_versions(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    let records = state.versioning.list_versions(&auth.tenant_id, &path);
    Ok(to_value(records)?)
}

#[derive(Deserialize)]
struct RollbackParams {
    path: String,
    version: u64,
}

pub async fn rollback(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: RollbackParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    let outcome = state.versioning.rollback(&auth.tenant_id, &path, p.version, Some(auth.subject_id.clone()))?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Modified, &path, None, Some(auth.subject_id.clone()));
    Ok(json!({ "etag": outcome.etag, "version": outcome.version, "size": outcome.size, "modified_at": outcome.modified_at }))
}

#[derive(Deserialize)]
struct DiffParams {
    path: String,
    v1: u64,
    v2: u64,
}

pub async fn diff_versions(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: DiffParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    let diff = state.versioning.diff_versions(&auth.tenant_id, &path, p.v1, p.v2)?;
    Ok(to_value(diff)?)
}
