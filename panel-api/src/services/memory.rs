use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    ClientPayload, ClientWriter, InboundStore, OnlineTracker, ServiceError, UserStore,
};
use crate::models::{Client, Inbound, Msg, Protocol, User};

/// In-memory stand-in for the panel: inbounds, online emails and accounts.
///
/// Client mutations rewrite `settings.clients` the way the panel does, including its
/// duplicate-email and unknown-client failures.
#[derive(Default)]
pub struct MemoryPanel {
    inbounds: RwLock<Vec<Inbound>>,
    online: RwLock<Vec<String>>,
    users: RwLock<Vec<User>>,
    unavailable: AtomicBool,
}

impl MemoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inbounds(self, inbounds: Vec<Inbound>) -> Self {
        Self {
            inbounds: RwLock::new(inbounds),
            ..self
        }
    }

    pub fn with_online<I, S>(self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            online: RwLock::new(emails.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
            ..self
        }
    }

    /// Make every read fail as if the panel were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn inbounds(&self) -> Vec<Inbound> {
        self.inbounds.read().await.clone()
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ServiceError::Panel("panel unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Apply `edit` to the client list of one inbound and store the result when it
    /// succeeds. `edit` returns the success message or a failure message.
    async fn edit_clients<F>(&self, inbound_id: i64, edit: F) -> Result<Msg<Value>, ServiceError>
    where
        F: FnOnce(&Protocol, &mut Vec<Value>) -> Result<String, String>,
    {
        self.check_available()?;

        let mut inbounds = self.inbounds.write().await;
        let Some(inbound) = inbounds.iter_mut().find(|ib| ib.id == inbound_id) else {
            return Ok(Msg::failure("inbound not found"));
        };

        let mut settings: Map<String, Value> = serde_json::from_str(&inbound.settings)?;
        let mut clients = match settings.remove("clients") {
            Some(Value::Array(clients)) => clients,
            _ => Vec::new(),
        };

        match edit(&inbound.protocol, &mut clients) {
            Ok(message) => {
                settings.insert("clients".to_string(), Value::Array(clients));
                inbound.settings = serde_json::to_string(&settings)?;
                Ok(Msg {
                    success: true,
                    msg: message,
                    obj: None,
                })
            }
            Err(message) => Ok(Msg::failure(message)),
        }
    }
}

fn payload_clients(payload: &ClientPayload) -> Result<Vec<Value>, ServiceError> {
    let mut settings: Map<String, Value> = serde_json::from_str(&payload.settings)?;
    match settings.remove("clients") {
        Some(Value::Array(clients)) => Ok(clients),
        _ => Err(ServiceError::Validation("settings without clients".to_string())),
    }
}

fn as_client(value: &Value) -> Client {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

#[async_trait]
impl InboundStore for MemoryPanel {
    async fn all_inbounds(&self) -> Result<Vec<Inbound>, ServiceError> {
        self.check_available()?;
        Ok(self.inbounds.read().await.clone())
    }

    async fn inbound(&self, id: i64) -> Result<Option<Inbound>, ServiceError> {
        self.check_available()?;
        Ok(self
            .inbounds
            .read()
            .await
            .iter()
            .find(|ib| ib.id == id)
            .cloned())
    }
}

#[async_trait]
impl OnlineTracker for MemoryPanel {
    async fn online_clients(&self) -> Result<Vec<String>, ServiceError> {
        self.check_available()?;
        Ok(self.online.read().await.clone())
    }
}

#[async_trait]
impl UserStore for MemoryPanel {
    async fn first_user(&self) -> Result<Option<User>, ServiceError> {
        Ok(self.users.read().await.iter().min_by_key(|u| u.id).cloned())
    }
}

#[async_trait]
impl ClientWriter for MemoryPanel {
    async fn add_client(&self, payload: &ClientPayload) -> Result<Msg<Value>, ServiceError> {
        let added = payload_clients(payload)?;
        let existing_emails: Vec<String> = self
            .inbounds
            .read()
            .await
            .iter()
            .filter_map(|ib| ib.clients().ok())
            .flatten()
            .map(|c| c.email)
            .collect();

        self.edit_clients(payload.id, |_, clients| {
            for value in &added {
                let email = as_client(value).email;
                if existing_emails.contains(&email) {
                    return Err(format!("Duplicate email: {}", email));
                }
            }
            clients.extend(added.iter().cloned());
            Ok("Client(s) added".to_string())
        })
        .await
    }

    async fn delete_client(
        &self,
        inbound_id: i64,
        client_id: &str,
    ) -> Result<Msg<Value>, ServiceError> {
        self.edit_clients(inbound_id, |protocol, clients| {
            let before = clients.len();
            clients.retain(|value| protocol.client_key(&as_client(value)) != client_id);
            if clients.len() == before {
                Err("Client Not Found".to_string())
            } else {
                Ok("Client deleted".to_string())
            }
        })
        .await
    }

    async fn update_client(
        &self,
        client_id: &str,
        payload: &ClientPayload,
    ) -> Result<Msg<Value>, ServiceError> {
        let replacement = payload_clients(payload)?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Validation("settings without clients".to_string()))?;

        self.edit_clients(payload.id, |protocol, clients| {
            let slot = clients
                .iter_mut()
                .find(|value| protocol.client_key(&as_client(value)) == client_id)
                .ok_or_else(|| "Client Not Found".to_string())?;
            *slot = replacement;
            Ok("Client updated".to_string())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vmess(id: i64, clients: Value) -> Inbound {
        serde_json::from_value(json!({
            "id": id,
            "enable": true,
            "port": 10000 + id,
            "protocol": "vmess",
            "settings": json!({"clients": clients}).to_string(),
        }))
        .unwrap()
    }

    fn payload(id: i64, clients: Value) -> ClientPayload {
        ClientPayload {
            id,
            settings: json!({ "clients": clients }).to_string(),
        }
    }

    #[tokio::test]
    async fn add_then_delete_client() {
        let panel = MemoryPanel::new().with_inbounds(vec![vmess(1, json!([]))]);

        let msg = panel
            .add_client(&payload(1, json!([{"id": "u-1", "email": "erin", "enable": true}])))
            .await
            .unwrap();
        assert!(msg.success);
        assert_eq!(panel.inbounds().await[0].clients().unwrap()[0].email, "erin");

        let msg = panel.delete_client(1, "u-1").await.unwrap();
        assert!(msg.success);
        assert!(panel.inbounds().await[0].clients().unwrap().is_empty());

        let msg = panel.delete_client(1, "u-1").await.unwrap();
        assert!(!msg.success);
        assert_eq!(msg.msg, "Client Not Found");
    }

    #[tokio::test]
    async fn rejects_duplicate_email_across_inbounds() {
        let panel = MemoryPanel::new().with_inbounds(vec![
            vmess(1, json!([{"id": "u-1", "email": "frank", "enable": true}])),
            vmess(2, json!([])),
        ]);

        let msg = panel
            .add_client(&payload(2, json!([{"id": "u-2", "email": "frank"}])))
            .await
            .unwrap();
        assert!(!msg.success);
        assert_eq!(msg.msg, "Duplicate email: frank");
        assert!(panel.inbounds().await[1].clients().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_matching_client() {
        let panel = MemoryPanel::new().with_inbounds(vec![vmess(
            1,
            json!([{"id": "u-1", "email": "gina", "enable": true}]),
        )]);

        let msg = panel
            .update_client(
                "u-1",
                &payload(1, json!([{"id": "u-1", "email": "gina", "enable": false}])),
            )
            .await
            .unwrap();
        assert!(msg.success);
        assert!(!panel.inbounds().await[0].clients().unwrap()[0].enable);
    }

    #[tokio::test]
    async fn unknown_inbound_is_a_failed_envelope() {
        let panel = MemoryPanel::new();
        let msg = panel.delete_client(42, "u-1").await.unwrap();
        assert!(!msg.success);
        assert_eq!(msg.msg, "inbound not found");
    }

    #[tokio::test]
    async fn unavailable_panel_fails_reads() {
        let panel = MemoryPanel::new().with_inbounds(vec![vmess(1, json!([]))]);
        panel.set_unavailable(true);
        assert!(panel.all_inbounds().await.is_err());
        assert!(panel.online_clients().await.is_err());
    }
}
