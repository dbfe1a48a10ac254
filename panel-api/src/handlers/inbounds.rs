//! Inbound and client routes delegated to the panel.

use axum::extract::{Path, State};
use serde_json::Value;
use validator::Validate;

use super::extract::JsonOrForm;
use crate::models::{AuthUser, Inbound, Msg};
use crate::services::{ClientPayload, ServiceError};
use crate::AppState;

pub async fn list_inbounds(State(state): State<AppState>) -> Msg<Vec<Inbound>> {
    match state.inbounds.all_inbounds().await {
        Ok(inbounds) => Msg::ok(inbounds),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list inbounds");
            e.into()
        }
    }
}

pub async fn get_inbound(State(state): State<AppState>, Path(id): Path<i64>) -> Msg<Inbound> {
    match state.inbounds.inbound(id).await {
        Ok(Some(inbound)) => Msg::ok(inbound),
        Ok(None) => Msg::failure("inbound not found"),
        Err(e) => {
            tracing::warn!(inbound_id = id, error = %e, "Failed to get inbound");
            e.into()
        }
    }
}

pub async fn add_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonOrForm(payload): JsonOrForm<ClientPayload>,
) -> Msg<Value> {
    if let Err(e) = payload.validate() {
        return ServiceError::from(e).into();
    }

    tracing::info!(user = %user.username, inbound_id = payload.id, "Adding client");
    state
        .clients
        .add_client(&payload)
        .await
        .unwrap_or_else(Msg::from)
}

pub async fn del_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((inbound_id, client_id)): Path<(i64, String)>,
) -> Msg<Value> {
    tracing::info!(user = %user.username, inbound_id, client_id = %client_id, "Deleting client");
    state
        .clients
        .delete_client(inbound_id, &client_id)
        .await
        .unwrap_or_else(Msg::from)
}

pub async fn update_client(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(client_id): Path<String>,
    JsonOrForm(payload): JsonOrForm<ClientPayload>,
) -> Msg<Value> {
    if let Err(e) = payload.validate() {
        return ServiceError::from(e).into();
    }

    tracing::info!(user = %user.username, inbound_id = payload.id, client_id = %client_id, "Updating client");
    state
        .clients
        .update_client(&client_id, &payload)
        .await
        .unwrap_or_else(Msg::from)
}
