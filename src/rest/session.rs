//! Session cookie and CSRF token handling.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::session::{InMemorySession, SessionStore};

use super::state::ApiState;

/// Session key holding the per-session CSRF token
pub const CSRF_KEY: &str = "csrfToken";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CsrfError {
    #[error("form submission is missing its CSRF token")]
    Missing,

    #[error("CSRF token does not match the session")]
    Mismatch,
}

/// Session attached to each wizard request by [`session_layer`]
#[derive(Clone)]
pub struct Session(pub Arc<InMemorySession>);

impl Session {
    pub fn store(&self) -> &dyn SessionStore {
        self.0.as_ref()
    }
}

/// Value of cookie `name` from the request headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn session_cookie(name: &str, id: &str, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, id);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Attach the caller's session to the request, issuing a cookie for new ones
pub async fn session_layer(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = &state.config.session;
    let cookie = cookie_value(request.headers(), &settings.cookie_name).map(str::to_string);
    let (session, created) = state.sessions.resolve(cookie.as_deref()).await;
    request.extensions_mut().insert(Session(session.clone()));

    let mut response = next.run(request).await;

    if created {
        let cookie = session_cookie(
            &settings.cookie_name,
            session.session_id(),
            settings.secure_cookie,
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to build session cookie"),
        }
    }

    response
}

/// Token for the forms of this session, created on first use
pub fn csrf_token(store: &dyn SessionStore) -> String {
    if let Some(Value::String(token)) = store.get(CSRF_KEY) {
        return token;
    }
    let token = Uuid::new_v4().simple().to_string();
    store.set(CSRF_KEY, Value::String(token.clone()));
    token
}

/// Check a submitted token against the session's
pub fn verify_csrf(store: &dyn SessionStore, submitted: Option<&str>) -> Result<(), CsrfError> {
    let Some(submitted) = submitted else {
        tracing::warn!(session_id = %store.session_id(), "Form posted without CSRF token");
        return Err(CsrfError::Missing);
    };

    match store.get(CSRF_KEY) {
        Some(Value::String(expected)) if expected == submitted => Ok(()),
        _ => {
            tracing::warn!(session_id = %store.session_id(), "CSRF token mismatch");
            Err(CsrfError::Mismatch)
        }
    }
}
