//! Services layer for panel-api.
//!
//! Each external collaborator sits behind a trait so the gateway and the
//! aggregation endpoints can run against the real panel or an in-memory one.

mod database;
pub mod error;
mod memory;
mod panel_client;
mod session_store;
pub mod stats;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::models::{Inbound, Msg, User};

pub use database::Database;
pub use error::ServiceError;
pub use memory::MemoryPanel;
pub use panel_client::PanelClient;
pub use session_store::SessionCache;
pub use stats::StatsService;

/// Read-only view of the configured inbounds.
#[async_trait]
pub trait InboundStore: Send + Sync {
    async fn all_inbounds(&self) -> Result<Vec<Inbound>, ServiceError>;
    async fn inbound(&self, id: i64) -> Result<Option<Inbound>, ServiceError>;
}

/// Emails of clients currently carrying traffic.
#[async_trait]
pub trait OnlineTracker: Send + Sync {
    async fn online_clients(&self) -> Result<Vec<String>, ServiceError>;
}

/// Client mutations, answered with the panel's own envelope.
#[async_trait]
pub trait ClientWriter: Send + Sync {
    async fn add_client(&self, payload: &ClientPayload) -> Result<Msg<Value>, ServiceError>;
    async fn delete_client(
        &self,
        inbound_id: i64,
        client_id: &str,
    ) -> Result<Msg<Value>, ServiceError>;
    async fn update_client(
        &self,
        client_id: &str,
        payload: &ClientPayload,
    ) -> Result<Msg<Value>, ServiceError>;
}

/// Registered panel accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// The account with the lowest id, used as the identity for API key logins.
    async fn first_user(&self) -> Result<Option<User>, ServiceError>;
}

/// Body of `addClient` and `updateClient`: the target inbound and a settings
/// fragment `{"clients": [...]}` encoded as a string, as the panel expects.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientPayload {
    #[validate(range(min = 1, message = "inbound id must be positive"))]
    pub id: i64,
    #[validate(custom(function = "validate_client_settings"))]
    pub settings: String,
}

fn validate_client_settings(settings: &str) -> Result<(), ValidationError> {
    let value: Value =
        serde_json::from_str(settings).map_err(|_| ValidationError::new("settings_not_json"))?;
    match value.get("clients") {
        Some(Value::Array(clients)) if !clients.is_empty() => Ok(()),
        _ => Err(ValidationError::new("settings_without_clients")),
    }
}
