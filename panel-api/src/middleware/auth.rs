use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use tower_sessions::Session;

use crate::models::AuthUser;

/// Reject requests without a logged-in session. Runs after the API key gateway, so
/// a valid key has already turned into a session here.
pub async fn require_login(session: Session, request: Request<Body>, next: Next) -> Response {
    if AuthUser::from_session(&session).await.is_none() {
        tracing::debug!(path = %request.uri().path(), "Rejected request without login");
        return AppError::Unauthorized(anyhow::anyhow!("unauthorized")).into_response();
    }

    next.run(request).await
}
