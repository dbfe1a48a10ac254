use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;

/// Session key holding the logged-in account.
pub const LOGIN_USER_KEY: &str = "LOGIN_USER";

/// A registered panel account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Authenticated account taken from the session, whether it was established by a
/// password login or by the API key gateway.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// `None` when the session has no login or the session store fails.
    pub async fn from_session(session: &Session) -> Option<Self> {
        match session.get::<User>(LOGIN_USER_KEY).await {
            Ok(user) => user.map(AuthUser),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read login from session");
                None
            }
        }
    }

    /// Mark the session as logged in as `user`. The session layer persists the
    /// record and issues the cookie when the response is sent.
    pub async fn establish(
        session: &Session,
        user: &User,
    ) -> Result<(), tower_sessions::session::Error> {
        session.insert(LOGIN_USER_KEY, user).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        AuthUser::from_session(&session)
            .await
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthorized")).into_response())
    }
}
