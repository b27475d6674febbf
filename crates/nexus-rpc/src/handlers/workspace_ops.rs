use nexus_metadata::{normalize, WorkspaceRecord};
use nexus_versioning::SnapshotRef;
use serde::Deserialize;
use serde_json::Value;

use super::common::{parse_params, require_permission, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

#[derive(Deserialize)]
struct RegisterWorkspaceParams {
    path: String,
    name: String,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    session_id: Option<String>,
}

pub async fn register_workspace(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: RegisterWorkspaceParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "create", &path).await?;
    let record = WorkspaceRecord {
        tenant_id: auth.tenant_id.clone(),
        path,
        name: p.name,
        description: p.description,
        created_by: Some(auth.subject_id.clone()),
        created_at: chrono::Utc::now(),
        metadata: None,
        tags: p.tags,
        session_id: p.session_id,
        ttl_expires_at: None,
    };
    state.versioning.register_workspace(record.clone())?;
    Ok(to_value(record)?)
}

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

pub async fn unregister_workspace(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "delete", &path).await?;
    state.versioning.unregister_workspace(&auth.tenant_id, &path)?;
    Ok(serde_json::json!({ "success": true }))
}

pub async fn list_workspaces(state: &AppState, auth: &AuthContext, _params: Value) -> Result<Value, RpcError> {
    let records = state.versioning.list_workspaces(&auth.tenant_id);
    Ok(to_value(records)?)
}

pub async fn get_workspace_info(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "read", &path).await?;
    let record = state.versioning.get_workspace_info(&auth.tenant_id, &path)?;
    Ok(to_value(record)?)
}

#[derive(Deserialize)]
struct SnapshotParams {
    path: String,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub async fn workspace_snapshot(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: SnapshotParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "read", &path).await?;
    let snapshot = state.versioning.workspace_snapshot(&auth.tenant_id, &path, p.description, p.tags)?;
    Ok(to_value(snapshot)?)
}

#[derive(Deserialize)]
struct RestoreParams {
    path: String,
    snapshot_number: u64,
}

pub async fn workspace_restore(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: RestoreParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "write", &path).await?;
    state.versioning.workspace_restore(&auth.tenant_id, &path, p.snapshot_number, Some(auth.subject_id.clone()))?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Modified, &path, None, Some(auth.subject_id.clone()));
    Ok(serde_json::json!({ "success": true }))
}

pub async fn workspace_log(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "read", &path).await?;
    let snapshots = state.versioning.workspace_log(&auth.tenant_id, &path);
    Ok(to_value(snapshots)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRefParam {
    Number(u64),
    Current(String),
}

impl TryFrom<SnapshotRefParam> for SnapshotRef {
    type Error = RpcError;

    fn try_from(value: SnapshotRefParam) -> Result<Self, Self::Error> {
        match value {
            SnapshotRefParam::Number(n) => Ok(SnapshotRef::Number(n)),
            SnapshotRefParam::Current(s) if s == "current" => Ok(SnapshotRef::Current),
            SnapshotRefParam::Current(s) => Err(RpcError::InvalidParams(format!("expected a snapshot number or \"current\", got {s:?}"))),
        }
    }
}

#[derive(Deserialize)]
struct WorkspaceDiffParams {
    path: String,
    from: SnapshotRefParam,
    to: SnapshotRefParam,
}

pub async fn workspace_diff(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: WorkspaceDiffParams = parse_params(params)?;
    let path = normalize(&p.path)?;
    require_permission(state, auth, "read", &path).await?;
    let diff = state.versioning.workspace_diff(&auth.tenant_id, &path, p.from.try_into()?, p.to.try_into()?)?;
    Ok(to_value(diff)?)
}
