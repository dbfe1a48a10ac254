use axum::extract::State;

use crate::models::{Count, Msg};
use crate::AppState;

/// Clients and WireGuard peers across all inbounds.
pub async fn count_users(State(state): State<AppState>) -> Msg<Count> {
    match state.stats.count_users().await {
        Ok(count) => Msg::ok(Count { count }),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count users");
            e.into()
        }
    }
}

/// Distinct online client emails on enabled inbounds.
pub async fn count_online(State(state): State<AppState>) -> Msg<Count> {
    match state.stats.count_online().await {
        Ok(count) => Msg::ok(Count { count }),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count online users");
            e.into()
        }
    }
}
