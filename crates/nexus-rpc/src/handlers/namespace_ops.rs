use nexus_rebac::NamespaceConfig;
use serde::Deserialize;
use serde_json::Value;

use super::common::{parse_params, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

pub async fn namespace_create(state: &AppState, _auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let config: NamespaceConfig = parse_params(params)?;
    state.rebac.namespace_create(config)?;
    Ok(serde_json::json!({ "success": true }))
}

#[derive(Deserialize)]
struct ObjectTypeParams {
    object_type: String,
}

pub async fn namespace_get(state: &AppState, _auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ObjectTypeParams = parse_params(params)?;
    let config = state.rebac.namespace_get(&p.object_type)?;
    Ok(to_value(config)?)
}

pub async fn namespace_list(state: &AppState, _auth: &AuthContext, _params: Value) -> Result<Value, RpcError> {
    let configs = state.rebac.namespace_list();
    Ok(to_value(configs)?)
}

pub async fn namespace_delete(state: &AppState, _auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ObjectTypeParams = parse_params(params)?;
    state.rebac.namespace_delete(&p.object_type)?;
    Ok(serde_json::json!({ "success": true }))
}

pub async fn get_available_namespaces(state: &AppState, _auth: &AuthContext, _params: Value) -> Result<Value, RpcError> {
    let object_types: Vec<String> = state.rebac.namespace_list().into_iter().map(|c| c.object_type).collect();
    Ok(to_value(object_types)?)
}
