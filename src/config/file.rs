//! TOML configuration file loading
//!
//! Supports `~/.config/smarthome-bridge/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfigFile {
    /// Discovery metadata and limits
    #[serde(default)]
    pub discovery: DiscoveryFileConfig,

    /// Friendly-name composition
    #[serde(default)]
    pub names: NamesFileConfig,

    /// Change notification delivery
    #[serde(default)]
    pub events: EventsFileConfig,
}

/// Discovery configuration
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryFileConfig {
    /// Manufacturer name reported for every endpoint
    pub manufacturer: Option<String>,

    /// Fallback endpoint description
    pub description: Option<String>,

    /// Maximum number of endpoints reported
    pub max_endpoints: Option<usize>,

    /// End of the licensed window (RFC 3339)
    pub valid_till: Option<String>,
}

/// Friendly-name configuration
#[derive(Debug, Default, Deserialize)]
pub struct NamesFileConfig {
    /// Put the function before the room ("Light Kitchen")
    pub function_first: Option<bool>,

    /// Word inserted between room and function ("Light in Kitchen")
    pub concat_word: Option<String>,
}

/// Change notification configuration
#[derive(Debug, Default, Deserialize)]
pub struct EventsFileConfig {
    /// Transport topic for change reports
    pub topic: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `BridgeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> BridgeConfigFile {
    config_file_path().map_or_else(BridgeConfigFile::default, |path| load_config_file_at(&path))
}

/// Load the TOML config file from a path, falling back to defaults
///
/// Returns `BridgeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_at(path: &Path) -> BridgeConfigFile {
    if !path.exists() {
        return BridgeConfigFile::default();
    }

    read_config_file(path).unwrap_or_else(|e| {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to load config file, using defaults"
        );
        BridgeConfigFile::default()
    })
}

/// Read and parse a TOML config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<BridgeConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/smarthome-bridge/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("smarthome-bridge").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[discovery]\nmanufacturer = \"Acme\"\n\n[names]\nfunction_first = true\n",
        )
        .unwrap();

        let file = load_config_file_at(&path);
        assert_eq!(file.discovery.manufacturer.as_deref(), Some("Acme"));
        assert_eq!(file.names.function_first, Some(true));
        assert!(file.events.topic.is_none());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discovery\nmanufacturer = ").unwrap();

        let file = load_config_file_at(&path);
        assert!(file.discovery.manufacturer.is_none());
    }

    #[test]
    fn strict_read_reports_the_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discovery\nmanufacturer = ").unwrap();

        assert!(matches!(read_config_file(&path), Err(crate::Error::Toml(_))));
        assert!(matches!(
            read_config_file(&dir.path().join("missing.toml")),
            Err(crate::Error::Io(_))
        ));
    }

    #[test]
    fn missing_file_is_default() {
        let file = load_config_file_at(Path::new("/nonexistent/smarthome/config.toml"));
        assert!(file.discovery.max_endpoints.is_none());
    }
}
