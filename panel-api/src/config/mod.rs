use secrecy::Secret;
use serde::Deserialize;
use service_core::config::TelemetrySettings;
use service_core::error::AppError;

#[derive(Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub panel: PanelSettings,
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// The panel's web base path. Normalised with [`normalize_base_path`] before use.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Set the Secure flag on the session cookie (requires HTTPS in front).
    #[serde(default)]
    pub session_secure: bool,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Upper bound on stored sessions; the least recently used are evicted first.
    #[serde(default = "default_session_capacity")]
    pub session_capacity: u64,
}

impl ServerSettings {
    pub fn base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_session_capacity() -> u64 {
    10_000
}

/// Upstream x-ui panel that owns inbounds, clients and online tracking.
#[derive(Deserialize)]
pub struct PanelSettings {
    /// Panel origin including its web base path, e.g. `http://127.0.0.1:2053/xui/`.
    pub url: String,
    pub username: String,
    pub password: Secret<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// The panel's SQLite database, opened read-only for account lookups.
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

/// Always starts and ends with `/`; an empty value means the root.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

pub fn get_configuration() -> Result<Settings, AppError> {
    service_core::config::load("panel-api")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_normalised() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("xui"), "/xui/");
        assert_eq!(normalize_base_path("/xui"), "/xui/");
        assert_eq!(normalize_base_path(" /a/b/ "), "/a/b/");
    }
}
