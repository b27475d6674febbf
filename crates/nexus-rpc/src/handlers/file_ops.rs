use nexus_fileservice::{GrepOptions, ListOptions, MkdirOptions, WriteOptions};
use nexus_hash::{ETag, WireBytes};
use nexus_metadata::{normalize, NormalizedPath};
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::{parse_params, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

fn path_of(raw: &str) -> Result<NormalizedPath, RpcError> {
    Ok(normalize(raw)?)
}

fn parse_etag(raw: &str) -> Result<ETag, RpcError> {
    raw.parse().map_err(|_| RpcError::InvalidParams(format!("malformed etag: {raw}")))
}

#[derive(Deserialize)]
struct ReadParams {
    path: String,
    #[serde(default)]
    return_metadata: bool,
}

pub async fn read(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ReadParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let result = state.file_service.read(&auth.tenant_id, &auth.subject(), &path, p.return_metadata).await?;
    Ok(json!({ "bytes": WireBytes(result.bytes), "metadata": result.metadata }))
}

#[derive(Deserialize)]
struct WriteParams {
    path: String,
    bytes: WireBytes,
    if_match: Option<String>,
    #[serde(default)]
    if_none_match: bool,
    created_by: Option<String>,
}

pub async fn write(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: WriteParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let if_match = p.if_match.as_deref().map(parse_etag).transpose()?;
    let options = WriteOptions { if_match, if_none_match: p.if_none_match, created_by: p.created_by };
    let result = state.file_service.write(&auth.tenant_id, &auth.subject(), &path, &p.bytes.0, options).await?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Modified, &path, None, Some(auth.subject_id.clone()));
    Ok(to_value(result)?)
}

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

pub async fn delete(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    state.file_service.delete(&auth.tenant_id, &auth.subject(), &path).await?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Deleted, &path, None, Some(auth.subject_id.clone()));
    Ok(json!({ "success": true }))
}

#[derive(Deserialize)]
struct RenameParams {
    old: String,
    new: String,
}

pub async fn rename(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: RenameParams = parse_params(params)?;
    let old = path_of(&p.old)?;
    let new = path_of(&p.new)?;
    state.file_service.rename(&auth.tenant_id, &auth.subject(), &old, &new).await?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Renamed, &new, Some(old), Some(auth.subject_id.clone()));
    Ok(json!({ "success": true }))
}

pub async fn exists(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let exists = state.file_service.exists(&auth.tenant_id, &auth.subject(), &path).await?;
    Ok(json!(exists))
}

pub async fn get_metadata(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let stat = state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    Ok(to_value(stat)?)
}

pub async fn is_directory(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: PathParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let stat = state.file_service.get_metadata(&auth.tenant_id, &auth.subject(), &path).await?;
    Ok(json!(stat.is_directory))
}

#[derive(Deserialize)]
struct MkdirParams {
    path: String,
    #[serde(default)]
    parents: bool,
    #[serde(default)]
    exist_ok: bool,
}

pub async fn mkdir(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: MkdirParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let options = MkdirOptions { parents: p.parents, exist_ok: p.exist_ok };
    let created = state.file_service.mkdir(&auth.tenant_id, &auth.subject(), &path, options).await?;
    for record in &created {
        state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Created, &record.path, None, Some(auth.subject_id.clone()));
    }
    Ok(to_value(created)?)
}

#[derive(Deserialize)]
struct RmdirParams {
    path: String,
    #[serde(default)]
    recursive: bool,
}

pub async fn rmdir(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: RmdirParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    state.file_service.rmdir(&auth.tenant_id, &auth.subject(), &path, p.recursive).await?;
    state.file_service.record_event(&auth.tenant_id, nexus_metadata::ChangeKind::Deleted, &path, None, Some(auth.subject_id.clone()));
    Ok(json!({ "success": true }))
}

#[derive(Deserialize)]
struct ListParams {
    path: String,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    details: bool,
    prefix: Option<String>,
}

pub async fn list(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ListParams = parse_params(params)?;
    let path = path_of(&p.path)?;
    let options = ListOptions { recursive: p.recursive, details: p.details, prefix: p.prefix };
    let entries = state.file_service.list(&auth.tenant_id, &auth.subject(), &path, options).await?;
    Ok(to_value(entries)?)
}

#[derive(Deserialize)]
struct GlobParams {
    pattern: String,
    root: Option<String>,
}

pub async fn glob(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: GlobParams = parse_params(params)?;
    let root = p.root.as_deref().map(path_of).transpose()?;
    let matches = state.file_service.glob(&auth.tenant_id, &auth.subject(), &p.pattern, root.as_ref()).await?;
    Ok(to_value(matches)?)
}

#[derive(Deserialize)]
struct GrepParams {
    pattern: String,
    root: Option<String>,
    file_pattern: Option<String>,
    #[serde(default)]
    ignore_case: bool,
    max_results: Option<usize>,
}

pub async fn grep(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: GrepParams = parse_params(params)?;
    let root = p.root.as_deref().map(path_of).transpose()?;
    let options = GrepOptions { file_pattern: p.file_pattern, ignore_case: p.ignore_case, max_results: p.max_results };
    let hits = state.file_service.grep(&auth.tenant_id, &auth.subject(), &p.pattern, root.as_ref(), options).await?;
    Ok(to_value(hits)?)
}
