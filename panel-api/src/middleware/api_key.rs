//! API key login for the `{base_path}api/` subtree.
//!
//! The gateway never rejects a request. A matching key logs the request in as the
//! panel's first account, exactly as if it had a session; anything else continues
//! anonymously and `require_login` decides.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::models::AuthUser;
use crate::services::UserStore;

pub const API_KEY_ENV: &str = "XUI_API_KEY";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Why the gateway let a request through, or that it should log it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No key configured.
    Disabled,
    /// Path outside `{base_path}api/`.
    OutOfScope,
    /// `{base_path}api/ping`.
    HealthCheck,
    /// Already logged in through the session.
    ExistingSession,
    NoToken,
    TokenMismatch,
    Authenticate,
}

impl GateDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::Disabled => "disabled",
            GateDecision::OutOfScope => "out_of_scope",
            GateDecision::HealthCheck => "health_check",
            GateDecision::ExistingSession => "existing_session",
            GateDecision::NoToken => "no_token",
            GateDecision::TokenMismatch => "token_mismatch",
            GateDecision::Authenticate => "authenticate",
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyGate {
    expected: Option<Arc<Secret<String>>>,
    scope_prefix: String,
    ping_path: String,
    users: Arc<dyn UserStore>,
}

impl ApiKeyGate {
    /// `base_path` must already be normalised (leading and trailing `/`).
    /// A blank key disables the gateway.
    pub fn new(api_key: Option<Secret<String>>, base_path: &str, users: Arc<dyn UserStore>) -> Self {
        let expected = api_key
            .map(|key| key.expose_secret().trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|key| Arc::new(Secret::new(key)));

        Self {
            expected,
            scope_prefix: format!("{}api/", base_path),
            ping_path: format!("{}api/ping", base_path),
            users,
        }
    }

    /// Read the key from `XUI_API_KEY`. Call once at startup.
    pub fn from_env(base_path: &str, users: Arc<dyn UserStore>) -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok().map(Secret::new);
        Self::new(api_key, base_path, users)
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    /// Whether the session needs to be consulted for `path`.
    pub fn covers(&self, path: &str) -> bool {
        self.is_enabled() && path.starts_with(&self.scope_prefix) && path != self.ping_path
    }

    pub fn decide(&self, path: &str, headers: &HeaderMap, has_session: bool) -> GateDecision {
        let Some(expected) = self.expected.as_ref() else {
            return GateDecision::Disabled;
        };
        if !path.starts_with(&self.scope_prefix) {
            return GateDecision::OutOfScope;
        }
        if path == self.ping_path {
            return GateDecision::HealthCheck;
        }
        if has_session {
            return GateDecision::ExistingSession;
        }

        match extract_token(headers) {
            None => GateDecision::NoToken,
            Some(token) => {
                let matches: bool = token
                    .as_bytes()
                    .ct_eq(expected.expose_secret().as_bytes())
                    .into();
                if matches {
                    GateDecision::Authenticate
                } else {
                    GateDecision::TokenMismatch
                }
            }
        }
    }

    /// Log the session in as the first registered account. Failures leave the
    /// request anonymous.
    async fn authenticate(&self, session: &Session) -> &'static str {
        let user = match self.users.first_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!("API key accepted but no panel account exists");
                return "no_user";
            }
            Err(e) => {
                tracing::warn!(error = %e, "API key accepted but account lookup failed");
                return "user_lookup_failed";
            }
        };

        match AuthUser::establish(session, &user).await {
            Ok(()) => {
                tracing::info!(user_id = user.id, username = %user.username, "Logged in with API key");
                "authenticated"
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store API key login in session");
                "session_failed"
            }
        }
    }
}

/// The trimmed `X-API-Key` value, or else the token of an `Authorization: Bearer`
/// header (scheme matched case-insensitively). Empty values count as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let dedicated = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if dedicated.is_some() {
        return dedicated;
    }

    let authorization = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let scheme = authorization.get(..7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    Some(authorization[7..].trim()).filter(|t| !t.is_empty())
}

pub async fn api_key_middleware(
    State(gate): State<ApiKeyGate>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let has_session = gate.covers(&path) && AuthUser::from_session(&session).await.is_some();
    let decision = gate.decide(&path, request.headers(), has_session);

    let outcome = match decision {
        GateDecision::Authenticate => gate.authenticate(&session).await,
        other => {
            tracing::debug!(path = %path, decision = other.as_str(), "API key gateway pass-through");
            other.as_str()
        }
    };

    if decision != GateDecision::Disabled && decision != GateDecision::OutOfScope {
        counter!("api_key_auth_total", "outcome" => outcome).increment(1);
    }

    next.run(request).await
}
