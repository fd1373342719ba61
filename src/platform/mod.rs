//! Collaborators owned by the home-automation platform
//!
//! The bridge never talks to the platform directly. It reads and writes
//! backing states through a [`StateStore`], pushes notifications through a
//! [`Transport`] and receives the device topology from a [`ControlDetector`].

mod detected;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use detected::{DetectedControl, DetectedState, StateMeta, read_controls};
pub use memory::{MemoryStateStore, MemoryTransport, StaticDetector};

use crate::Result;

/// Backing state store of the platform
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a state value; `None` if the state exists but holds no value
    async fn get_state(&self, id: &str) -> Result<Option<Value>>;

    /// Write a state value
    async fn set_state(&self, id: &str, value: Value) -> Result<()>;

    /// Start receiving change notifications for the given states
    async fn subscribe(&self, ids: &[String]) -> Result<()>;

    /// Stop receiving change notifications for the given states
    async fn unsubscribe(&self, ids: &[String]) -> Result<()>;
}

/// Outbound message transport towards the assistant
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a payload on a topic
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;
}

/// Type detector producing device patterns from the platform's object graph
#[async_trait]
pub trait ControlDetector: Send + Sync {
    /// Run one detection pass
    async fn detect(&self) -> Result<Vec<DetectedControl>>;
}
