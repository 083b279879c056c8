mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    AuthMode, AuthSettings, BrokerSettings, LoggingSettings, ServerSettings, Settings,
    TlsSettings,
};

/// Prefix for environment overrides, e.g. `STOMPSUB_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "STOMPSUB";

/// Loads the configuration from `config/default` and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads the configuration from the given file (any format the `config`
/// crate recognises, extension optional) and environment variables.
/// Merges the configuration with default values.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.hosts"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let server = partial.server;
    let broker = partial.broker;
    let auth = partial.auth;
    let logging = partial.logging;

    Ok(Settings {
        server: ServerSettings {
            hosts: server
                .as_ref()
                .and_then(|s| s.hosts.clone())
                .filter(|hosts| !hosts.is_empty())
                .unwrap_or(default.server.hosts),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            identifier: server
                .as_ref()
                .and_then(|s| s.identifier.clone())
                .unwrap_or(default.server.identifier),
            tls: server
                .as_ref()
                .and_then(|s| s.tls.clone())
                .or(default.server.tls),
        },
        broker: BrokerSettings {
            redelivery_interval_ms: broker
                .as_ref()
                .and_then(|b| b.redelivery_interval_ms)
                .filter(|ms| *ms > 0)
                .unwrap_or(default.broker.redelivery_interval_ms),
        },
        auth: AuthSettings {
            mode: auth
                .as_ref()
                .and_then(|a| a.mode)
                .unwrap_or(default.auth.mode),
            secret: auth
                .as_ref()
                .and_then(|a| a.secret.clone())
                .or(default.auth.secret),
            users: auth
                .as_ref()
                .and_then(|a| a.users.clone())
                .unwrap_or(default.auth.users),
        },
        logging: LoggingSettings {
            level: logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    })
}
