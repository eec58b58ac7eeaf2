//! Session encoding of [`FlowState`].

use serde_json::Value;

use super::error::FlowError;
use super::id::FlowId;
use super::state::{FlowState, StatePatch};

/// Session key for one flow instance: `<purpose>-<uuid>`.
///
/// The purpose prefix keeps apply, renew and other entries sharing one
/// session from colliding.
pub fn session_key(purpose: &str, id: &FlowId) -> String {
    format!("{}-{}", purpose, id)
}

pub fn encode(state: &FlowState) -> Result<Value, FlowError> {
    serde_json::to_value(state).map_err(FlowError::Encode)
}

pub fn decode(key: &str, value: Value) -> Result<FlowState, FlowError> {
    serde_json::from_value(value).map_err(|source| FlowError::Corrupt {
        key: key.to_string(),
        source,
    })
}

/// `{...state, ...patch}` with `id` pinned to the original
pub fn merge(key: &str, state: &FlowState, patch: &StatePatch) -> Result<FlowState, FlowError> {
    let mut value = encode(state)?;
    let Some(object) = value.as_object_mut() else {
        return Err(FlowError::invariant("flow state did not encode as an object"));
    };
    patch.apply_to(object);
    decode(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::{MaritalStatus, StateField};

    #[test]
    fn test_session_key_format() {
        let id = FlowId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        assert_eq!(
            session_key("apply-flow", &id),
            "apply-flow-11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode("apply-flow-x", serde_json::json!({"id": 42})).unwrap_err();
        assert!(matches!(err, FlowError::Corrupt { .. }));
    }

    #[test]
    fn test_merge_overrides_and_preserves() {
        let mut state = FlowState::new(FlowId::new());
        state.dental_insurance = Some(false);

        let patch = StatePatch::new()
            .set(StateField::MaritalStatus, MaritalStatus::Single)
            .unwrap();
        let merged = merge("k", &state, &patch).unwrap();

        assert_eq!(merged.id, state.id);
        assert_eq!(merged.marital_status, Some(MaritalStatus::Single));
        assert_eq!(merged.dental_insurance, Some(false));
    }
}
