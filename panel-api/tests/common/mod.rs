#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use panel_api::config::ServerSettings;
use panel_api::middleware::ApiKeyGate;
use panel_api::models::{Inbound, User};
use panel_api::services::{MemoryPanel, SessionCache};
use panel_api::startup::{build_router, SESSION_COOKIE};
use panel_api::AppState;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const API_KEY: &str = "test-api-key";

pub struct TestApp {
    pub router: Router,
    pub panel: Arc<MemoryPanel>,
    pub sessions: SessionCache,
}

pub fn admin() -> User {
    User {
        id: 1,
        username: "admin".to_string(),
    }
}

pub fn inbound(id: i64, protocol: &str, enable: bool, settings: Value) -> Inbound {
    serde_json::from_value(json!({
        "id": id,
        "enable": enable,
        "remark": format!("{}-{}", protocol, id),
        "port": 30000 + id,
        "protocol": protocol,
        "settings": settings.to_string(),
    }))
    .unwrap()
}

/// VMESS[A on, B off], Trojan[A on], WireGuard[3 peers].
pub fn sample_inbounds() -> Vec<Inbound> {
    vec![
        inbound(
            1,
            "vmess",
            true,
            json!({"clients": [
                {"id": "a-uuid", "email": "A", "enable": true},
                {"id": "b-uuid", "email": "B", "enable": false}
            ]}),
        ),
        inbound(
            2,
            "trojan",
            true,
            json!({"clients": [{"password": "a-pass", "email": "A", "enable": true}]}),
        ),
        inbound(3, "wireguard", true, json!({"peers": [{}, {}, {}]})),
    ]
}

pub fn sample_panel() -> MemoryPanel {
    MemoryPanel::new()
        .with_inbounds(sample_inbounds())
        .with_online(["A"])
        .with_users(vec![admin()])
}

pub fn server_settings(base_path: &str) -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_path: base_path.to_string(),
        session_secure: false,
        session_ttl_hours: 1,
        session_capacity: 1_000,
    }
}

pub fn spawn_app(api_key: Option<&str>, base_path: &str, panel: MemoryPanel) -> TestApp {
    spawn_app_with_capacity(api_key, base_path, panel, 1_000)
}

pub fn spawn_app_with_capacity(
    api_key: Option<&str>,
    base_path: &str,
    panel: MemoryPanel,
    session_capacity: u64,
) -> TestApp {
    let panel = Arc::new(panel);
    let server = ServerSettings {
        session_capacity,
        ..server_settings(base_path)
    };
    let sessions = SessionCache::new(server.session_capacity);
    let gate = ApiKeyGate::new(
        api_key.map(|k| Secret::new(k.to_string())),
        &server.base_path(),
        panel.clone(),
    );
    let state = AppState::new(panel.clone(), panel.clone(), panel.clone());

    TestApp {
        router: build_router(state, gate, sessions.clone(), &server),
        panel,
        sessions,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, headers: &[(&str, &str)], body: Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_form(&self, path: &str, headers: &[(&str, &str)], body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// `name=value` pairs of every session cookie the response sets.
pub fn session_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE)))
        .map(str::to_string)
        .collect()
}
