//! Flow State Manager: the single reader/writer of flow entries in the session.

use crate::session::SessionStore;

use super::codec;
use super::error::FlowError;
use super::id::FlowId;
use super::outcome::{FlowOutcome, Redirect, RedirectReason};
use super::state::{FlowState, StatePatch};
use super::variant::FlowKind;

/// Loads, saves and clears the state of one flow kind within one session.
///
/// An id that is malformed or has no session entry never produces an error:
/// the caller gets a redirect to the configured fallback URL so an expired
/// or tampered flow quietly restarts the user's journey.
///
/// Saves are read-modify-write with no concurrency token. Two requests for
/// the same flow racing each other (double submit, two tabs) resolve as last
/// write wins; the earlier patch is silently lost.
pub struct FlowStateManager<'a> {
    store: &'a dyn SessionStore,
    kind: FlowKind,
    fallback_url: String,
}

impl<'a> FlowStateManager<'a> {
    pub fn new(store: &'a dyn SessionStore, kind: FlowKind, fallback_url: impl Into<String>) -> Self {
        Self {
            store,
            kind,
            fallback_url: fallback_url.into(),
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn session_id(&self) -> &str {
        self.store.session_id()
    }

    /// Where journeys continue once the flow is over or lost
    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    fn key(&self, id: &FlowId) -> String {
        codec::session_key(self.kind.purpose(), id)
    }

    fn fallback(&self, reason: RedirectReason) -> Redirect {
        Redirect::external(self.fallback_url.clone(), reason)
    }

    /// Create a new flow entry holding `id` plus the seed fields
    pub fn start(&self, id: Option<&str>, seed: &StatePatch) -> Result<FlowState, FlowError> {
        let id = match id {
            Some(raw) => FlowId::parse(raw).ok_or_else(|| FlowError::InvalidId(raw.to_string()))?,
            None => FlowId::new(),
        };

        let key = self.key(&id);
        let state = codec::merge(&key, &FlowState::new(id), seed)?;
        self.store.set(&key, codec::encode(&state)?);

        tracing::info!(
            flow_id = %id,
            session_id = %self.session_id(),
            purpose = self.kind.purpose(),
            "Flow started"
        );
        Ok(state)
    }

    /// Validate a route-supplied id
    pub fn resolve_id(&self, raw: &str) -> FlowOutcome<FlowId> {
        match FlowId::parse(raw) {
            Some(id) => FlowOutcome::Proceed(id),
            None => {
                tracing::warn!(
                    flow_id = %raw,
                    session_id = %self.session_id(),
                    "Invalid flow id; redirecting to fallback"
                );
                FlowOutcome::Redirect(self.fallback(RedirectReason::InvalidFlowId))
            }
        }
    }

    pub fn load(&self, raw_id: &str) -> Result<FlowOutcome<FlowState>, FlowError> {
        let id = crate::proceed!(self.resolve_id(raw_id));
        let key = self.key(&id);

        let Some(value) = self.store.get(&key) else {
            tracing::warn!(
                flow_id = %id,
                session_id = %self.session_id(),
                key = %key,
                "No flow state in session; redirecting to fallback"
            );
            return Ok(FlowOutcome::Redirect(
                self.fallback(RedirectReason::FlowNotFound),
            ));
        };

        codec::decode(&key, value).map(FlowOutcome::Proceed)
    }

    /// Shallow-merge `patch` over the stored state and write it back
    pub fn save(&self, raw_id: &str, patch: &StatePatch) -> Result<FlowOutcome<FlowState>, FlowError> {
        let current = crate::proceed!(self.load(raw_id)?);
        let key = self.key(&current.id);

        let next = codec::merge(&key, &current, patch)?;
        self.store.set(&key, codec::encode(&next)?);

        tracing::info!(
            flow_id = %next.id,
            session_id = %self.session_id(),
            fields = ?patch.keys().collect::<Vec<_>>(),
            "Flow state saved"
        );
        Ok(FlowOutcome::Proceed(next))
    }

    /// Remove the flow entry from the session
    pub fn clear(&self, raw_id: &str) -> Result<FlowOutcome<()>, FlowError> {
        let current = crate::proceed!(self.load(raw_id)?);
        self.store.unset(&self.key(&current.id));

        tracing::info!(
            flow_id = %current.id,
            session_id = %self.session_id(),
            "Flow state cleared"
        );
        Ok(FlowOutcome::Proceed(()))
    }
}
