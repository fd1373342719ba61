//! Error types for the smart-home bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the smart-home bridge
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backing state store error
    #[error("state store error: {0}")]
    Store(String),

    /// Outbound transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Directive could not be parsed or is missing a required field
    #[error("invalid directive: {0}")]
    InvalidDirective(String),

    /// A mandatory state role has no backing identifier
    #[error("control `{control}` is missing mandatory state `{role}`")]
    MissingState {
        /// Control name
        control: String,
        /// Role that could not be resolved
        role: String,
    },

    /// Value could not be converted between assistant and backing space
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Control pattern is not known to the bridge
    #[error("unsupported control type: {0}")]
    UnsupportedControl(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
