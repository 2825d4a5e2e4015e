mod settings;

use std::path::Path;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LoggingSettings, RelaySettings, RouteSettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `RELAY__SERVER__PORT=4000`.
pub const ENV_PREFIX: &str = "RELAY";

/// Loads the configuration from `config/default` and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(Path::new("config/default"))
}

/// Loads the configuration from an optional file (any extension the `config`
/// crate understands, given without it) and `RELAY__*` environment
/// variables, then merges the result over the defaults.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(&path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            allowed_origins: partial
                .server
                .as_ref()
                .and_then(|s| s.allowed_origins.clone())
                .unwrap_or(default.server.allowed_origins),
        },
        relay: RelaySettings {
            max_connections: partial
                .relay
                .as_ref()
                .and_then(|r| r.max_connections)
                .unwrap_or(default.relay.max_connections),
            routes: partial
                .relay
                .as_ref()
                .and_then(|r| r.routes.clone())
                .unwrap_or(default.relay.routes),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
            json: partial
                .logging
                .as_ref()
                .and_then(|l| l.json)
                .unwrap_or(default.logging.json),
        },
    })
}

#[cfg(test)]
mod tests;
