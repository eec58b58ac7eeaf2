//! Per-user session storage.
//!
//! The wizard treats the HTTP session as a plain key/value store. The
//! [`SessionStore`] trait is the only surface the flow code sees, which lets
//! tests run against an in-memory store without any request harness.
//!
//! Every write is a single `set` call, so a request aborted by the transport
//! never leaves a half-written flow entry behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Key/value view of one user's session
pub trait SessionStore: Send + Sync {
    /// Identifier of the underlying session (used for log correlation)
    fn session_id(&self) -> &str;

    /// Read a value, `None` when the key was never set or has been unset
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: Value);

    /// Check whether a key is present
    fn has(&self, key: &str) -> bool;

    /// Remove a key (no-op when absent)
    fn unset(&self, key: &str);
}

/// Session backed by a process-local hash map
#[derive(Debug, Default)]
pub struct InMemorySession {
    id: String,
    values: Mutex<HashMap<String, Value>>,
}

impl InMemorySession {
    /// Create an empty session with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty session with a random id
    pub fn random() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn unset(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Idle time after which a session is dropped, unless configured otherwise
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

struct Entry {
    session: Arc<InMemorySession>,
    last_seen: Instant,
}

/// All live sessions of the running server, keyed by the session cookie value.
///
/// Sessions idle for longer than the TTL are swept on the next resolve.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Resolve the session for a cookie value, creating a fresh one when the
    /// cookie is missing, unknown or expired. The flag is `true` for new
    /// sessions so the caller knows to issue a cookie.
    pub async fn resolve(&self, cookie: Option<&str>) -> (Arc<InMemorySession>, bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions, now);

        if let Some(entry) = cookie.and_then(|id| sessions.get_mut(id)) {
            entry.last_seen = now;
            return (entry.session.clone(), false);
        }

        let session = Arc::new(InMemorySession::random());
        sessions.insert(
            session.session_id().to_string(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session_id = %session.session_id(), "Session created");
        (session, true)
    }

    fn sweep(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, live = sessions.len(), "Idle sessions expired");
        }
    }

    /// Drop a session entirely
    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
