use nexus_metadata::NormalizedPath;
use nexus_rebac::{Consistency, Decision, Entity};
use serde_json::Value;

use crate::auth::AuthContext;
use crate::error::RpcError;
use crate::state::AppState;

/// A bad wire envelope (§4.9 S6: a raw base64 string where `WireBytes`/
/// `WireDateTime`/`WireDuration` expect `{"__type__":...}`) is a semantic
/// validation failure, not a malformed-request one — it gets its own code
/// (-32005) rather than folding into -32602 with every other shape mismatch.
/// `WireBytes::deserialize` reports this via `EnvelopeError`, but it reaches
/// here already flattened into `serde_json::Error`'s message by
/// `serde::de::Error::custom`, so the distinction is recovered from the
/// message text `nexus_hash::envelope::EnvelopeError` produces — the same
/// substring check `envelope.rs`'s own tests use to recognize this error.
fn is_envelope_error(message: &str) -> bool {
    message.contains("envelope") || message.contains("base64")
}

pub fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| {
        let message = e.to_string();
        if is_envelope_error(&message) {
            RpcError::Validation(message)
        } else {
            RpcError::InvalidParams(message)
        }
    })
}

pub fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

/// Checks `permission` on the `file` object named by `path`, for
/// workspace/version operations that sit above `nexus-fileservice` and so
/// have no built-in authorization gate of their own (`nexus-versioning`
/// trusts its caller the same way `nexus-metadata` does).
pub async fn require_permission(state: &AppState, auth: &AuthContext, permission: &str, path: &NormalizedPath) -> Result<(), RpcError> {
    let object = Entity::new("file", path.as_str());
    let outcome = state.rebac.check(&auth.tenant_id, auth.subject(), permission.to_owned(), object.clone(), Consistency::MinimizeLatency).await?;
    match outcome.decision {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(RpcError::PermissionDenied(format!("{}:{} lacks {permission} on {}:{}", auth.subject_type, auth.subject_id, object.entity_type, object.entity_id))),
        Decision::Indeterminate => Err(RpcError::PermissionIndeterminate(outcome.reason.unwrap_or_else(|| "budget exceeded".to_owned()))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Params {
        bytes: nexus_hash::WireBytes,
    }

    #[test]
    fn bare_base64_string_in_a_bytes_field_is_a_validation_error_not_invalid_params() {
        let err = parse_params::<Params>(json!({ "bytes": "SGVsbG8=" })).unwrap_err();
        assert_eq!(err.code(), crate::error::VALIDATION_ERROR);
    }

    #[test]
    fn a_missing_required_field_is_still_invalid_params() {
        let err = parse_params::<Params>(json!({})).unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMS);
    }
}
