pub mod api_key;
pub mod auth;

pub use api_key::{api_key_middleware, ApiKeyGate, GateDecision, API_KEY_ENV, API_KEY_HEADER};
pub use auth::require_login;
