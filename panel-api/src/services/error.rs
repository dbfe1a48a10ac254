use thiserror::Error;

use crate::models::Msg;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Panel request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Panel returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("Panel login failed: {0}")]
    Login(String),

    /// The panel answered with `success: false`.
    #[error("{0}")]
    Panel(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// API handlers report failures in the envelope with status 200, as the panel does.
impl<T> From<ServiceError> for Msg<T> {
    fn from(err: ServiceError) -> Self {
        Msg::failure(err.to_string())
    }
}
