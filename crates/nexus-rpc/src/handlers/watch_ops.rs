//! Watch subscribe/poll/unsubscribe (§4.7). Not part of the pinned
//! JSON-RPC method surface — exposed as plain-JSON REST endpoints alongside
//! it, the same way `/api/auth/whoami` sits outside the envelope.

use serde::Deserialize;
use serde_json::Value;
use nexus_watch::SubscribeRequest;

use super::common::to_value;
use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct SubscribeBody {
    #[serde(default)]
    pub path_globs: Vec<String>,
    pub event_kinds: Option<Vec<nexus_metadata::ChangeKind>>,
    pub resume_from: Option<u64>,
}

/// `tenant_id` always comes from the caller's resolved key, never from the
/// request body — a client cannot subscribe into a tenant it isn't scoped to.
pub fn subscribe(state: &AppState, auth: &AuthContext, body: SubscribeBody) -> Result<Value, RpcError> {
    let request = SubscribeRequest {
        tenant_id: auth.tenant_id.clone(),
        path_globs: body.path_globs,
        event_kinds: body.event_kinds,
        resume_from: body.resume_from,
    };
    let subscription_id = state.journal.subscribe(request)?;
    Ok(serde_json::json!({ "subscription_id": subscription_id }))
}

pub fn poll(state: &AppState, _auth: &AuthContext, subscription_id: &str) -> Result<Value, RpcError> {
    let result = state.journal.poll(subscription_id)?;
    Ok(to_value(result)?)
}

pub fn unsubscribe(state: &AppState, _auth: &AuthContext, subscription_id: &str) -> Result<Value, RpcError> {
    state.journal.unsubscribe(subscription_id)?;
    Ok(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use nexus_metadata::{normalize, ChangeKind};

    use super::*;
    use crate::fixtures::{make_key, test_state};

    fn ctx(tenant_id: &str) -> AuthContext {
        AuthContext { admin: false, subject_type: "user".to_owned(), subject_id: "alice".to_owned(), tenant_id: tenant_id.to_owned() }
    }

    #[test]
    fn subscribe_returns_an_opaque_id_and_poll_reports_events_after_it() {
        let state = test_state();
        make_key(&state, false, "user", "alice", "t1");
        let auth = ctx("t1");

        let sub = subscribe(&state, &auth, SubscribeBody::default()).unwrap();
        let subscription_id = sub["subscription_id"].as_str().unwrap().to_owned();
        assert!(!subscription_id.is_empty());

        state.metadata.record_event("t1", ChangeKind::Created, normalize("/a.txt").unwrap(), None, None);

        let result = poll(&state, &auth, &subscription_id).unwrap();
        let events = result["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["path"], "/a.txt");
    }

    #[test]
    fn subscribe_always_scopes_to_the_caller_tenant_even_if_other_tenants_mutate() {
        let state = test_state();
        make_key(&state, false, "user", "alice", "t1");
        let auth = ctx("t1");

        let subscription_id = subscribe(&state, &auth, SubscribeBody::default()).unwrap()["subscription_id"].as_str().unwrap().to_owned();

        state.metadata.record_event("t2", ChangeKind::Created, normalize("/other.txt").unwrap(), None, None);
        state.metadata.record_event("t1", ChangeKind::Created, normalize("/mine.txt").unwrap(), None, None);

        let result = poll(&state, &auth, &subscription_id).unwrap();
        let events = result["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["path"], "/mine.txt");
    }

    #[test]
    fn unsubscribe_then_poll_fails_with_unknown_subscription() {
        let state = test_state();
        make_key(&state, false, "user", "alice", "t1");
        let auth = ctx("t1");

        let subscription_id = subscribe(&state, &auth, SubscribeBody::default()).unwrap()["subscription_id"].as_str().unwrap().to_owned();
        unsubscribe(&state, &auth, &subscription_id).unwrap();

        let err = poll(&state, &auth, &subscription_id).unwrap_err();
        assert_eq!(err.code(), crate::error::FILE_NOT_FOUND);
    }

    #[test]
    fn poll_rejects_an_unknown_subscription_id() {
        let state = test_state();
        let auth = ctx("t1");
        let err = poll(&state, &auth, "does-not-exist").unwrap_err();
        assert_eq!(err.code(), crate::error::FILE_NOT_FOUND);
    }
}
