//! Configuration for the chat relay
//!
//! Loaded from a JSON file whose keys use PascalCase, e.g.
//!
//! ```json
//! {
//!   "Hostname": "localhost",
//!   "Port": 5000,
//!   "JSONEndpointPort": 5001,
//!   "LogFile": "actions.csv",
//!   "ReceivedAMessage": "%v: %v"
//! }
//! ```
//!
//! Every key is optional. Ports may also be given as strings (`"5000"`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::error::AppError;

/// Client-side message templates
///
/// Each `%v` is replaced positionally; see [`crate::terminal::render`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Templates {
    /// Args: username, room
    #[serde(default = "default_entered_room")]
    pub has_entered_the_room_message: String,
    /// Args: username, room
    #[serde(default = "default_left_room")]
    pub has_left_the_room_message: String,
    /// Args: username
    #[serde(default = "default_entered_lobby")]
    pub has_entered_the_lobby_message: String,
    /// Args: username
    #[serde(default = "default_left_lobby")]
    pub has_left_the_lobby_message: String,
    /// Args: username, message
    #[serde(default = "default_received")]
    pub received_a_message: String,
    /// Args: ignored username
    #[serde(default = "default_ignoring")]
    pub ignoring_message: String,
}

fn default_entered_room() -> String {
    "%v has entered the room %v".to_string()
}

fn default_left_room() -> String {
    "%v has left the room %v".to_string()
}

fn default_entered_lobby() -> String {
    "%v has connected".to_string()
}

fn default_left_lobby() -> String {
    "%v has disconnected".to_string()
}

fn default_received() -> String {
    "%v: %v".to_string()
}

fn default_ignoring() -> String {
    "You are now ignoring %v".to_string()
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            has_entered_the_room_message: default_entered_room(),
            has_left_the_room_message: default_left_room(),
            has_entered_the_lobby_message: default_entered_lobby(),
            has_left_the_lobby_message: default_left_lobby(),
            received_a_message: default_received(),
            ignoring_message: default_ignoring(),
        }
    }
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Host to bind (server) or dial (client).
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Chat port.
    #[serde(default = "default_port", deserialize_with = "port")]
    pub port: u16,
    /// Port of the JSON query endpoint; disabled when absent.
    #[serde(default, rename = "JSONEndpointPort", deserialize_with = "optional_port")]
    pub json_endpoint_port: Option<u16>,
    /// Room assigned on connect.
    #[serde(default = "default_lobby")]
    pub lobby: String,
    /// CSV action log; in-memory only when absent.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(flatten)]
    pub templates: Templates,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_lobby() -> String {
    "global".to_string()
}

/// A port written either as a number or as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn into_port<E: serde::de::Error>(self) -> Result<u16, E> {
        match self {
            PortValue::Number(port) => Ok(port),
            PortValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid port {text:?}"))),
        }
    }
}

fn port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    PortValue::deserialize(deserializer)?.into_port()
}

fn optional_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    Option::<PortValue>::deserialize(deserializer)?
        .map(PortValue::into_port)
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            json_endpoint_port: None,
            lobby: default_lobby(),
            log_file: None,
            templates: Templates::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults if the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from a JSON string.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.lobby.is_empty() {
            return Err(AppError::Config("Lobby must not be empty".to_string()));
        }
        if self.json_endpoint_port == Some(self.port) {
            return Err(AppError::Config(format!(
                "JSONEndpointPort {} collides with Port",
                self.port
            )));
        }
        Ok(())
    }

    /// `host:port` for the chat listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// `host:port` for the JSON endpoint, if enabled.
    pub fn json_endpoint_addr(&self) -> Option<String> {
        self.json_endpoint_port
            .map(|port| format!("{}:{}", self.hostname, port))
    }
}
