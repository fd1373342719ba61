//! Configuration management for the smart-home bridge

pub mod file;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Default manufacturer reported in discovery
pub const DEFAULT_MANUFACTURER: &str = "Smart Home Bridge";

/// Default endpoint description
pub const DEFAULT_DESCRIPTION: &str = "Device controlled by Smart Home Bridge";

/// Default number of endpoints reported in discovery
pub const DEFAULT_MAX_ENDPOINTS: usize = 300;

/// Default transport topic for change reports
pub const DEFAULT_EVENTS_TOPIC: &str = "smarthome/alexa/events";

/// Bridge configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Manufacturer name reported for every endpoint
    pub manufacturer: String,

    /// Fallback endpoint description
    pub description: String,

    /// Put the function before the room in composed friendly names
    pub function_first: bool,

    /// Word inserted between room and function, empty for none
    pub concat_word: String,

    /// End of the licensed window; past it, discovery disables proactive reporting
    pub valid_till: Option<DateTime<Utc>>,

    /// Maximum number of endpoints reported in discovery
    pub max_endpoints: usize,

    /// Transport topic for change reports
    pub events_topic: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manufacturer: DEFAULT_MANUFACTURER.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            function_first: false,
            concat_word: String::new(),
            valid_till: None,
            max_endpoints: DEFAULT_MAX_ENDPOINTS,
            events_topic: DEFAULT_EVENTS_TOPIC.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if `valid_till` is not an RFC 3339 timestamp
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Load configuration from the environment and an explicit config file
    ///
    /// Unlike the standard path, an explicit file must exist and parse.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if `valid_till`
    /// is not an RFC 3339 timestamp
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_sources(file::read_config_file(path)?, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with variables looked up through `env`
    /// (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if `valid_till` is not an RFC 3339 timestamp
    pub fn from_sources(
        fc: file::BridgeConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let default = Self::default();

        let manufacturer = env("SMARTHOME_MANUFACTURER")
            .or(fc.discovery.manufacturer)
            .unwrap_or(default.manufacturer);
        let description = env("SMARTHOME_DESCRIPTION")
            .or(fc.discovery.description)
            .unwrap_or(default.description);

        let function_first = env("SMARTHOME_FUNCTION_FIRST")
            .map(|v| v == "true" || v == "1")
            .or(fc.names.function_first)
            .unwrap_or(default.function_first);
        let concat_word = env("SMARTHOME_CONCAT_WORD")
            .or(fc.names.concat_word)
            .unwrap_or(default.concat_word);

        let valid_till = env("SMARTHOME_VALID_TILL")
            .or(fc.discovery.valid_till)
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| Error::Config(format!("invalid valid_till `{raw}`: {e}")))
            })
            .transpose()?;

        let max_endpoints = env("SMARTHOME_MAX_ENDPOINTS")
            .and_then(|s| s.parse().ok())
            .or(fc.discovery.max_endpoints)
            .unwrap_or(default.max_endpoints);

        let events_topic = env("SMARTHOME_EVENTS_TOPIC")
            .or(fc.events.topic)
            .unwrap_or(default.events_topic);

        Ok(Self {
            manufacturer,
            description,
            function_first,
            concat_word,
            valid_till,
            max_endpoints,
            events_topic,
        })
    }

    /// Whether the licensed window has passed at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_till.is_some_and(|till| till < now)
    }

    /// Compose an endpoint friendly name from room and function
    #[must_use]
    pub fn compose_name(&self, room: &str, function: &str) -> String {
        let (first, second) = if self.function_first {
            (function, room)
        } else {
            (room, function)
        };

        let concat = self.concat_word.trim();
        if concat.is_empty() {
            format!("{first} {second}")
        } else {
            format!("{first} {concat} {second}")
        }
    }
}
