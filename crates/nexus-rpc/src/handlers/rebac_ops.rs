use chrono::{DateTime, Utc};
use nexus_metadata::Tuple;
use nexus_rebac::{Consistency, Entity};
use serde::Deserialize;
use serde_json::Value;

use super::common::{parse_params, to_value};
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

#[derive(Deserialize)]
struct CreateTupleParams {
    subject_type: String,
    subject_id: String,
    relation: String,
    object_type: String,
    object_id: String,
    expires_at: Option<DateTime<Utc>>,
    condition: Option<String>,
}

pub async fn rebac_create(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: CreateTupleParams = parse_params(params)?;
    let tuple = Tuple {
        tuple_id: String::new(),
        tenant_id: auth.tenant_id.clone(),
        subject_type: p.subject_type,
        subject_id: p.subject_id,
        relation: p.relation,
        object_type: p.object_type,
        object_id: p.object_id,
        expires_at: p.expires_at,
        condition: p.condition,
        created_at: Utc::now(),
    };
    let created = state.rebac.create_tuple(tuple);
    Ok(to_value(created)?)
}

#[derive(Deserialize)]
struct CheckParams {
    subject_type: String,
    subject_id: String,
    permission: String,
    object_type: String,
    object_id: String,
}

pub async fn rebac_check(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: CheckParams = parse_params(params)?;
    let subject = Entity::new(p.subject_type, p.subject_id);
    let object = Entity::new(p.object_type, p.object_id);
    let outcome = state.rebac.check(&auth.tenant_id, subject, p.permission, object, Consistency::MinimizeLatency).await?;
    Ok(to_value(outcome)?)
}

#[derive(Deserialize)]
struct ExpandParams {
    permission: String,
    object_type: String,
    object_id: String,
}

pub async fn rebac_expand(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ExpandParams = parse_params(params)?;
    let object = Entity::new(p.object_type, p.object_id);
    let tree = state.rebac.expand(&auth.tenant_id, &p.permission, &object)?;
    Ok(to_value(tree)?)
}

#[derive(Deserialize)]
struct ExplainParams {
    subject_type: String,
    subject_id: String,
    permission: String,
    object_type: String,
    object_id: String,
}

pub async fn rebac_explain(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: ExplainParams = parse_params(params)?;
    let subject = Entity::new(p.subject_type, p.subject_id);
    let object = Entity::new(p.object_type, p.object_id);
    let path = state.rebac.explain(&auth.tenant_id, &subject, &p.permission, &object)?;
    Ok(to_value(path)?)
}

#[derive(Deserialize)]
struct DeleteTupleParams {
    tuple_id: String,
}

pub async fn rebac_delete(state: &AppState, auth: &AuthContext, params: Value) -> Result<Value, RpcError> {
    let p: DeleteTupleParams = parse_params(params)?;
    state.rebac.delete_tuple(&auth.tenant_id, &p.tuple_id)?;
    Ok(serde_json::json!({ "success": true }))
}

pub async fn rebac_list_tuples(state: &AppState, auth: &AuthContext, _params: Value) -> Result<Value, RpcError> {
    let tuples = state.rebac.list_tuples(&auth.tenant_id);
    Ok(to_value(tuples)?)
}
