use serde::Deserialize;

use crate::hub::{MENTOR_ELAPSED, QUIZ_ELAPSED};

/// Top-level configuration settings for the relay.
///
/// Includes settings for the listener, the relay routes, and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the bind address and the origins allowed to open a WebSocket.
/// An `allowed_origins` entry of `"*"` accepts any origin.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the relay hub.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub max_connections: usize,
    pub routes: Vec<RouteSettings>,
}

/// One relay route: events named `inbound` are rebroadcast as `outbound`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    pub inbound: String,
    pub outbound: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub max_connections: Option<usize>,
    pub routes: Option<Vec<RouteSettings>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
    pub json: Option<bool>,
}

/// Provides default values for `Settings`.
///
/// Listens on every interface at port 3001, accepts any origin, and relays
/// `quiz_elapsed` as `mentor_elapsed`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3001,
                allowed_origins: vec!["*".to_string()],
            },
            relay: RelaySettings {
                max_connections: 1000,
                routes: vec![RouteSettings {
                    inbound: QUIZ_ELAPSED.to_string(),
                    outbound: MENTOR_ELAPSED.to_string(),
                }],
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}
