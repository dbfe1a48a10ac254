use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Inbound protocol as reported by the panel. Protocols this gateway does not
/// aggregate (socks, http, dokodemo-door, ...) are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
    Wireguard,
    Other(String),
}

/// How an inbound records the principals allowed to use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// `settings.clients`: entries keyed by `email`.
    Clients,
    /// `settings.peers`: WireGuard entries without an email identity.
    Peers,
    /// Not counted.
    Untracked,
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Vmess => "vmess",
            Protocol::Vless => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Shadowsocks => "shadowsocks",
            Protocol::Wireguard => "wireguard",
            Protocol::Other(name) => name,
        }
    }

    pub fn membership(&self) -> Membership {
        match self {
            Protocol::Vmess | Protocol::Vless | Protocol::Trojan | Protocol::Shadowsocks => {
                Membership::Clients
            }
            Protocol::Wireguard => Membership::Peers,
            Protocol::Other(_) => Membership::Untracked,
        }
    }

    /// The value the panel uses as `clientId` in client routes for this protocol.
    pub fn client_key<'a>(&self, client: &'a Client) -> &'a str {
        match self {
            Protocol::Trojan => &client.password,
            Protocol::Shadowsocks => &client.email,
            _ => &client.id,
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        match value.as_str() {
            "vmess" => Protocol::Vmess,
            "vless" => Protocol::Vless,
            "trojan" => Protocol::Trojan,
            "shadowsocks" => Protocol::Shadowsocks,
            "wireguard" => Protocol::Wireguard,
            _ => Protocol::Other(value),
        }
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        match value {
            Protocol::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured listener, in the panel's JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub id: i64,
    #[serde(default)]
    pub up: i64,
    #[serde(default)]
    pub down: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub remark: String,
    pub enable: bool,
    #[serde(default)]
    pub expiry_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_stats: Option<Value>,
    #[serde(default)]
    pub listen: String,
    #[serde(default)]
    pub port: u16,
    pub protocol: Protocol,
    /// Raw JSON text, exactly as stored by the panel.
    #[serde(default)]
    pub settings: String,
    #[serde(default)]
    pub stream_settings: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub sniffing: String,
}

#[derive(Deserialize)]
struct ClientSettings {
    #[serde(default)]
    clients: Option<Vec<Client>>,
}

impl Inbound {
    /// Parse `settings.clients`. A missing list is empty; unreadable settings are an error.
    pub fn clients(&self) -> Result<Vec<Client>, serde_json::Error> {
        let settings: ClientSettings = serde_json::from_str(&self.settings)?;
        Ok(settings.clients.unwrap_or_default())
    }

    /// Length of `settings.peers`, or `None` when the settings are not a JSON object
    /// or `peers` is absent or not an array.
    pub fn peer_count(&self) -> Option<usize> {
        let settings: Map<String, Value> = serde_json::from_str(&self.settings).ok()?;
        settings.get("peers")?.as_array().map(Vec::len)
    }
}

/// A principal of a client-list inbound. `email` is the identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flow: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub limit_ip: i64,
    #[serde(default, rename = "totalGB")]
    pub total_gb: i64,
    #[serde(default)]
    pub expiry_time: i64,
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub tg_id: Value,
    #[serde(default)]
    pub sub_id: String,
    #[serde(default)]
    pub reset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(protocol: &str, settings: &str) -> Inbound {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "enable": true,
            "port": 443,
            "protocol": protocol,
            "settings": settings,
        }))
        .unwrap()
    }

    #[test]
    fn protocol_round_trips_unknown_names() {
        let ib = inbound("dokodemo-door", "{}");
        assert_eq!(ib.protocol, Protocol::Other("dokodemo-door".to_string()));
        assert_eq!(ib.protocol.membership(), Membership::Untracked);

        let json = serde_json::to_value(&ib).unwrap();
        assert_eq!(json["protocol"], "dokodemo-door");
    }

    #[test]
    fn parses_panel_client_list() {
        let ib = inbound(
            "vless",
            r#"{"clients":[
                {"id":"7a1c","email":"alice","enable":true,"flow":"xtls-rprx-vision","limitIp":2,"totalGB":0,"expiryTime":0,"tgId":"","subId":"s1","reset":0},
                {"id":"9b2d","email":"bob","enable":false}
            ],"decryption":"none","fallbacks":[]}"#,
        );

        let clients = ib.clients().unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].email, "alice");
        assert!(clients[0].enable);
        assert_eq!(clients[0].limit_ip, 2);
        assert!(!clients[1].enable);
    }

    #[test]
    fn missing_client_list_is_empty() {
        assert!(inbound("vmess", "{}").clients().unwrap().is_empty());
        assert!(inbound("vmess", r#"{"clients":null}"#)
            .clients()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unreadable_settings_are_an_error() {
        assert!(inbound("trojan", "").clients().is_err());
        assert!(inbound("trojan", "{not json").clients().is_err());
    }

    #[test]
    fn peer_count_requires_an_array() {
        assert_eq!(
            inbound("wireguard", r#"{"peers":[{},{},{}]}"#).peer_count(),
            Some(3)
        );
        assert_eq!(inbound("wireguard", r#"{"peers":"x"}"#).peer_count(), None);
        assert_eq!(inbound("wireguard", r#"{"mtu":1420}"#).peer_count(), None);
        assert_eq!(inbound("wireguard", "[1,2]").peer_count(), None);
        assert_eq!(inbound("wireguard", "garbage").peer_count(), None);
    }

    #[test]
    fn client_key_follows_protocol() {
        let client = Client {
            id: "uuid-1".to_string(),
            password: "pw".to_string(),
            email: "carol".to_string(),
            ..Client::default()
        };
        assert_eq!(Protocol::Vmess.client_key(&client), "uuid-1");
        assert_eq!(Protocol::Vless.client_key(&client), "uuid-1");
        assert_eq!(Protocol::Trojan.client_key(&client), "pw");
        assert_eq!(Protocol::Shadowsocks.client_key(&client), "carol");
    }
}
