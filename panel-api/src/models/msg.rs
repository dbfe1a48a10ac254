use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// The panel's response envelope: `{"success": bool, "msg": string, "obj": any}`.
///
/// Always sent with status 200; callers branch on `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg<T> {
    pub success: bool,
    #[serde(default)]
    pub msg: String,
    pub obj: Option<T>,
}

impl<T> Msg<T> {
    pub fn ok(obj: T) -> Self {
        Self {
            success: true,
            msg: String::new(),
            obj: Some(obj),
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
            obj: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Msg<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Payload of the stats endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub count: usize,
}
