use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::authorization::Bearer;
use headers::Authorization;
use nexus_rebac::Entity;
use serde::Deserialize;

use crate::error::RpcError;
use crate::state::AppState;

const SUBJECT_OVERRIDE_HEADER: &str = "x-nexus-subject";
const TENANT_OVERRIDE_HEADER: &str = "x-nexus-tenant-id";

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// The `(admin, subject_type, subject_id, tenant_id)` tuple a bearer key
/// resolves to (§4.9). Extracted once per request and handed to every
/// handler; admin keys may additionally override subject/tenant via the
/// `X-Nexus-*` identity headers, matching the client-api's
/// `SpacetimeIdentity`-overrides-the-token pattern for operator tooling.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub admin: bool,
    pub subject_type: String,
    pub subject_id: String,
    pub tenant_id: String,
}

impl AuthContext {
    pub fn subject(&self) -> Entity {
        Entity::new(self.subject_type.clone(), self.subject_id.clone())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|header| header.0.token().to_owned());
        let query_key = Query::<ApiKeyQuery>::from_request_parts(parts, state).await.ok().and_then(|q| q.0.api_key);
        let token = bearer.or(query_key).ok_or(RpcError::AccessDenied)?;

        let hash = nexus_hash::Digest::of(token.as_bytes()).to_hex();
        let key = state.metadata.find_key_by_hash(&hash).ok_or(RpcError::AccessDenied)?;

        let mut ctx = AuthContext { admin: key.is_admin, subject_type: key.subject_type, subject_id: key.subject_id, tenant_id: key.tenant_id };

        if ctx.admin {
            if let Some(subject) = header_str(parts, SUBJECT_OVERRIDE_HEADER) {
                if let Some((entity_type, entity_id)) = subject.split_once(':') {
                    ctx.subject_type = entity_type.to_owned();
                    ctx.subject_id = entity_id.to_owned();
                }
            }
            if let Some(tenant) = header_str(parts, TENANT_OVERRIDE_HEADER) {
                ctx.tenant_id = tenant.to_owned();
            }
        }

        Ok(ctx)
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::fixtures::{make_key, test_state};

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_bearer_token_resolves_to_the_matching_key() {
        let state = test_state();
        let token = make_key(&state, false, "user", "alice", "t1");

        let mut p = parts(Request::builder().header("authorization", format!("Bearer {token}")));
        let ctx = AuthContext::from_request_parts(&mut p, &state).await.unwrap();
        assert!(!ctx.admin);
        assert_eq!(ctx.subject_id, "alice");
        assert_eq!(ctx.tenant_id, "t1");
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let state = test_state();
        let mut p = parts(Request::builder().header("authorization", "Bearer nope"));
        let err = AuthContext::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, RpcError::AccessDenied));
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let state = test_state();
        let mut p = parts(Request::builder());
        let err = AuthContext::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, RpcError::AccessDenied));
    }

    #[tokio::test]
    async fn admin_key_honors_identity_header_overrides() {
        let state = test_state();
        let token = make_key(&state, true, "user", "root", "t1");

        let mut p = parts(
            Request::builder()
                .header("authorization", format!("Bearer {token}"))
                .header(SUBJECT_OVERRIDE_HEADER, "service:bot")
                .header(TENANT_OVERRIDE_HEADER, "t2"),
        );
        let ctx = AuthContext::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(ctx.subject_type, "service");
        assert_eq!(ctx.subject_id, "bot");
        assert_eq!(ctx.tenant_id, "t2");
    }

    #[tokio::test]
    async fn non_admin_key_ignores_identity_header_overrides() {
        let state = test_state();
        let token = make_key(&state, false, "user", "alice", "t1");

        let mut p = parts(
            Request::builder()
                .header("authorization", format!("Bearer {token}"))
                .header(SUBJECT_OVERRIDE_HEADER, "service:bot")
                .header(TENANT_OVERRIDE_HEADER, "t2"),
        );
        let ctx = AuthContext::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(ctx.subject_id, "alice");
        assert_eq!(ctx.tenant_id, "t1");
    }

    #[tokio::test]
    async fn query_string_api_key_is_accepted_when_no_bearer_header_present() {
        let state = test_state();
        let token = make_key(&state, false, "user", "alice", "t1");

        let mut p = parts(Request::builder().uri(format!("/api/nfs/read?api_key={token}")));
        let ctx = AuthContext::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(ctx.subject_id, "alice");
    }
}
