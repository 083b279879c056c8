use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listeners, the broker engine, authentication
/// and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// The same port is bound on every host in `hosts`. `identifier` is reported
/// to clients in the `server` header of `CONNECTED`. With `tls` set every
/// listener speaks `wss://` only.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub hosts: Vec<String>,
    pub port: u16,
    pub identifier: String,
    #[serde(default)]
    pub tls: Option<TlsSettings>,
}

/// PEM files for the TLS listener.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert: String,
    pub key: String,
}

impl ServerSettings {
    pub fn addrs(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| {
                if host.contains(':') && !host.starts_with('[') {
                    format!("[{}]:{}", host, self.port)
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub redelivery_interval_ms: u64,
}

impl BrokerSettings {
    pub fn redelivery_interval(&self) -> Duration {
        Duration::from_millis(self.redelivery_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    None,
    Ephemeral,
    Static,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthSettings {
    pub mode: AuthMode,
    /// Shared HMAC secret for `ephemeral` mode.
    pub secret: Option<String>,
    /// login → passcode table for `static` mode.
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub auth: Option<PartialAuthSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub hosts: Option<Vec<String>>,
    pub port: Option<u16>,
    pub identifier: Option<String>,
    pub tls: Option<TlsSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub redelivery_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialAuthSettings {
    pub mode: Option<AuthMode>,
    pub secret: Option<String>,
    pub users: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                hosts: vec!["127.0.0.1".to_string()],
                port: 8080,
                identifier: "stompsub".to_string(),
                tls: None,
            },
            broker: BrokerSettings {
                redelivery_interval_ms: 50_000,
            },
            auth: AuthSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
