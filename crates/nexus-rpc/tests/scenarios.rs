//! S6: a tagged bytes envelope write succeeds; a raw base64 string in its
//! place is a validation error (-32005), not a generic invalid-params one
//! (-32602). Driven through the full HTTP surface (`nexus_rpc::router`), not
//! just `parse_params` in isolation, since that's the boundary the bug
//! actually escaped through.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use http_body_util::BodyExt;
use nexus_blob::Memory;
use nexus_cas::CasStore;
use nexus_fileservice::FileService;
use nexus_metadata::Store as MetadataStore;
use nexus_namespace::Router as NamespaceRouter;
use nexus_rebac::{Engine as RebacEngine, NamespaceRegistry};
use nexus_rpc::AppState;
use nexus_versioning::Versioning;
use nexus_watch::Journal;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> AppState {
    let metadata = Arc::new(MetadataStore::new());
    let namespace_router = Arc::new(NamespaceRouter::new(metadata.clone()));
    let namespaces = Arc::new(NamespaceRegistry::new());
    let rebac = RebacEngine::new(metadata.clone(), namespaces);
    let cas = Arc::new(CasStore::new(Arc::new(Memory::new()), metadata.clone(), "cas"));
    let versioning = Arc::new(Versioning::new(metadata.clone(), cas.clone()));
    let mut backends = HashMap::new();
    backends.insert("cas".to_owned(), cas);
    let file_service = Arc::new(FileService::new(metadata.clone(), namespace_router, rebac.clone(), versioning.clone(), backends));
    let journal = Arc::new(Journal::with_defaults(metadata.clone()));

    AppState { file_service, rebac, versioning, metadata, journal }
}

fn make_key(state: &AppState, subject_type: &str, subject_id: &str, tenant_id: &str) -> String {
    let token = format!("test-token-{subject_type}-{subject_id}");
    let hash = nexus_hash::Digest::of(token.as_bytes()).to_hex();
    state.metadata.create_key(hash, false, subject_type.to_owned(), subject_id.to_owned(), tenant_id.to_owned());
    token
}

fn grant_owner(state: &AppState, tenant: &str, subject_type: &str, subject_id: &str, path: &str) {
    state.rebac.create_tuple(nexus_metadata::Tuple {
        tuple_id: String::new(),
        tenant_id: tenant.to_owned(),
        subject_type: subject_type.to_owned(),
        subject_id: subject_id.to_owned(),
        relation: "owner".to_owned(),
        object_type: "file".to_owned(),
        object_id: path.to_owned(),
        expires_at: None,
        condition: None,
        created_at: chrono::Utc::now(),
    });
}

async fn post(state: &AppState, token: &str, method: &str, body: Value) -> (StatusCode, Value) {
    let response = nexus_rpc::router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/nfs/{method}"))
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn tagged_bytes_envelope_write_succeeds() {
    let state = test_state();
    let token = make_key(&state, "user", "alice", "t1");
    grant_owner(&state, "t1", "user", "alice", "/");

    let data = base64::engine::general_purpose::STANDARD.encode(b"hello");
    let (status, body) = post(
        &state,
        &token,
        "write",
        json!({ "id": 1, "params": { "path": "/doc.txt", "bytes": { "__type__": "bytes", "data": data } } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none(), "unexpected error: {body:?}");
    assert_eq!(body["result"]["version"], 1);
    assert_eq!(body["result"]["size"], 5);
}

#[tokio::test]
async fn bare_base64_string_in_place_of_a_bytes_envelope_is_a_validation_error() {
    let state = test_state();
    let token = make_key(&state, "user", "alice", "t1");
    grant_owner(&state, "t1", "user", "alice", "/");

    let data = base64::engine::general_purpose::STANDARD.encode(b"hello");
    let (status, body) = post(&state, &token, "write", json!({ "id": 1, "params": { "path": "/doc.txt", "bytes": data } })).await;

    assert_eq!(status, StatusCode::OK, "json-rpc errors are still HTTP 200 with an error body");
    assert_eq!(body["error"]["code"], -32005);
}
