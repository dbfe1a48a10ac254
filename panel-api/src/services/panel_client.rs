use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::observability::PropagateTrace;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ClientPayload, ClientWriter, InboundStore, OnlineTracker, ServiceError};
use crate::config::PanelSettings;
use crate::models::{Inbound, Msg};

/// HTTP client for the upstream x-ui panel API.
///
/// Logs in with the configured account on first use and keeps the panel's session
/// cookie in its cookie store.
pub struct PanelClient {
    client: Client,
    settings: PanelSettings,
    logged_in: Mutex<bool>,
}

impl PanelClient {
    pub fn new(settings: PanelSettings) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            settings,
            logged_in: Mutex::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn ensure_login(&self) -> Result<(), ServiceError> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in {
            return Ok(());
        }

        let url = self.url("login");
        let response = self
            .client
            .post(&url)
            .with_trace_context()
            .form(&[
                ("username", self.settings.username.as_str()),
                ("password", self.settings.password.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send login request to {}: {}", url, e);
                e
            })?;

        let msg: Msg<Value> = response.error_for_status()?.json().await?;
        if !msg.success {
            return Err(ServiceError::Login(msg.msg));
        }

        tracing::info!(panel = %self.settings.url, "Logged in to panel");
        *logged_in = true;
        Ok(())
    }

    /// Send an authenticated panel API request and decode its envelope.
    ///
    /// The panel answers unauthenticated API calls with 401 or 404; either drops the
    /// login so the next call starts a fresh one.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Msg<T>, ServiceError> {
        self.ensure_login().await?;

        let response = request.with_trace_context().send().await.map_err(|e| {
            tracing::error!("Panel request failed: {}", e);
            e
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            *self.logged_in.lock().await = false;
            return Err(ServiceError::UpstreamStatus(status));
        }

        Ok(response.error_for_status()?.json().await?)
    }
}

/// Unwrap a successful envelope's payload, turning `success: false` into an error.
fn into_obj<T>(msg: Msg<T>) -> Result<Option<T>, ServiceError> {
    if msg.success {
        Ok(msg.obj)
    } else {
        Err(ServiceError::Panel(msg.msg))
    }
}

#[async_trait]
impl InboundStore for PanelClient {
    async fn all_inbounds(&self) -> Result<Vec<Inbound>, ServiceError> {
        let request = self.client.get(self.url("panel/api/inbounds/list"));
        let inbounds = into_obj(self.send::<Vec<Inbound>>(request).await?)?;
        Ok(inbounds.unwrap_or_default())
    }

    async fn inbound(&self, id: i64) -> Result<Option<Inbound>, ServiceError> {
        let request = self
            .client
            .get(self.url(&format!("panel/api/inbounds/get/{}", id)));
        into_obj(self.send::<Inbound>(request).await?)
    }
}

#[async_trait]
impl OnlineTracker for PanelClient {
    async fn online_clients(&self) -> Result<Vec<String>, ServiceError> {
        let request = self.client.post(self.url("panel/api/inbounds/onlines"));
        let emails = into_obj(self.send::<Vec<String>>(request).await?)?;
        Ok(emails.unwrap_or_default())
    }
}

#[async_trait]
impl ClientWriter for PanelClient {
    async fn add_client(&self, payload: &ClientPayload) -> Result<Msg<Value>, ServiceError> {
        let request = self
            .client
            .post(self.url("panel/api/inbounds/addClient"))
            .json(payload);
        self.send(request).await
    }

    async fn delete_client(
        &self,
        inbound_id: i64,
        client_id: &str,
    ) -> Result<Msg<Value>, ServiceError> {
        let request = self.client.post(self.url(&format!(
            "panel/api/inbounds/{}/delClient/{}",
            inbound_id, client_id
        )));
        self.send(request).await
    }

    async fn update_client(
        &self,
        client_id: &str,
        payload: &ClientPayload,
    ) -> Result<Msg<Value>, ServiceError> {
        let request = self
            .client
            .post(self.url(&format!("panel/api/inbounds/updateClient/{}", client_id)))
            .json(payload);
        self.send(request).await
    }
}
