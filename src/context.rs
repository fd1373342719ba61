//! Explicit bridge context handed to the device manager and every control

use std::sync::Arc;

use crate::config::Config;
use crate::platform::{StateStore, Transport};

/// Collaborators and configuration shared by all components
#[derive(Clone)]
pub struct BridgeContext {
    /// Backing state store
    pub store: Arc<dyn StateStore>,
    /// Outbound notification transport
    pub transport: Arc<dyn Transport>,
    /// Configuration
    pub config: Config,
}

impl BridgeContext {
    /// Create a context from its parts
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, transport: Arc<dyn Transport>, config: Config) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
