use std::time::Duration;

use rumqttc::{MqttOptions, Transport};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire transport used to reach the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    #[default]
    Websocket,
}

/// Broker endpoint, credentials and topic names for the device.
///
/// The defaults are the fixed constants the firmware ships with; a config
/// file may override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub transport: TransportKind,
    /// Path of the websocket endpoint, ignored for TCP.
    pub ws_path: String,
    pub user: String,
    pub password: String,
    pub client_prefix: String,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
    pub monitor_topic: String,
    pub config_topic: String,
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "18.218.20.155".to_string(),
            port: 9001,
            transport: TransportKind::Websocket,
            ws_path: "/mqtt".to_string(),
            user: "esp32".to_string(),
            password: "13310625".to_string(),
            client_prefix: "panel".to_string(),
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            monitor_topic: "esp32/led".to_string(),
            config_topic: "esp32/config".to_string(),
            request_capacity: 100,
        }
    }
}

impl MqttConfig {
    /// `host:port` as shown in the status line.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Builds the rumqttc options for one client session.
    pub fn to_options(&self, client_id: &str) -> MqttOptions {
        let mut options = match self.transport {
            TransportKind::Tcp => MqttOptions::new(client_id, self.host.clone(), self.port),
            TransportKind::Websocket => {
                let url = format!("ws://{}:{}{}", self.host, self.port, self.ws_path);
                let mut options = MqttOptions::new(client_id, url, self.port);
                options.set_transport(Transport::Ws);
                options
            }
        };
        options
            .set_credentials(self.user.clone(), self.password.clone())
            .set_keep_alive(self.keep_alive());
        options
    }
}

/// Per-process client id: the configured prefix plus eight random hex digits.
pub fn generate_client_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_has_prefix_and_eight_hex_digits() {
        let id = generate_client_id("panel");
        let (prefix, suffix) = id.split_once('_').unwrap();
        assert_eq!(prefix, "panel");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn client_ids_differ_between_sessions() {
        assert_ne!(generate_client_id("panel"), generate_client_id("panel"));
    }

    #[test]
    fn defaults_match_device_firmware() {
        let config = MqttConfig::default();
        assert_eq!(config.address(), "18.218.20.155:9001");
        assert_eq!(config.monitor_topic, "esp32/led");
        assert_eq!(config.config_topic, "esp32/config");
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn options_carry_credentials_and_keep_alive() {
        let config = MqttConfig {
            transport: TransportKind::Tcp,
            ..MqttConfig::default()
        };
        let options = config.to_options("panel_deadbeef");
        assert_eq!(options.client_id(), "panel_deadbeef");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert_eq!(
            options.credentials(),
            Some(("esp32".to_string(), "13310625".to_string()))
        );
        assert_eq!(options.broker_address(), ("18.218.20.155".to_string(), 9001));
    }
}
