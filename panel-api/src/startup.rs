use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};

use crate::config::ServerSettings;
use crate::handlers::{
    app::{health_check, ping},
    inbounds::{add_client, del_client, get_inbound, list_inbounds, update_client},
    metrics::metrics,
    stats::{count_online, count_users},
};
use crate::middleware::{api_key_middleware, require_login, ApiKeyGate};
use crate::services::SessionCache;
use crate::AppState;

/// Name of the session cookie, shared with the panel's own login.
pub const SESSION_COOKIE: &str = "3x-ui";

/// Build the HTTP router. API routes live under `{base_path}api/` and are
/// registered with their full paths so the gateway and the metrics labels see the
/// same path the client sent.
pub fn build_router(
    state: AppState,
    gate: ApiKeyGate,
    sessions: SessionCache,
    server: &ServerSettings,
) -> Router {
    let api = format!("{}api", server.base_path());

    let session_layer = SessionManagerLayer::new(sessions)
        .with_name(SESSION_COOKIE)
        .with_secure(server.session_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(server.session_ttl_hours)));

    let protected = Router::new()
        .route(&format!("{}/list", api), get(list_inbounds))
        .route(&format!("{}/get/:id", api), get(get_inbound))
        .route(&format!("{}/addClient", api), post(add_client))
        .route(&format!("{}/:id/delClient/:clientId", api), post(del_client))
        .route(&format!("{}/updateClient/:clientId", api), post(update_client))
        .route(&format!("{}/stats/users", api), get(count_users))
        .route(&format!("{}/stats/online", api), get(count_online))
        .route_layer(from_fn(require_login));

    Router::new()
        .route(&format!("{}/ping", api), get(ping))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .merge(protected)
        .layer(from_fn_with_state(gate, api_key_middleware))
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
