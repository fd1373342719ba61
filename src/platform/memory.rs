//! In-memory collaborators for the CLI and tests

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ControlDetector, DetectedControl, StateStore, Transport};
use crate::{Error, Result};

/// State store keeping values in a map and recording every write
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<(String, Value)>>,
    subscriptions: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStateStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with values
    #[must_use]
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(values);
        store
    }

    /// Create a store seeded from a JSON object of `{"id": value}`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a JSON object
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let states: serde_json::Map<String, Value> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), states = states.len(), "loaded states");
        Ok(Self::with_values(states))
    }

    /// Set a value without recording a write (a change made by the platform)
    pub fn insert(&self, id: &str, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), value);
    }

    /// Current value of a state
    #[must_use]
    pub fn value(&self, id: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Writes performed through [`StateStore::set_state`], oldest first
    #[must_use]
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Currently subscribed states
    #[must_use]
    pub fn subscriptions(&self) -> HashSet<String> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make every read fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_state(&self, id: &str) -> Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Store(format!("read of `{id}` failed")));
        }
        Ok(self.value(id))
    }

    async fn set_state(&self, id: &str, value: Value) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Store(format!("write of `{id}` failed")));
        }
        self.insert(id, value.clone());
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id.to_string(), value));
        Ok(())
    }

    async fn subscribe(&self, ids: &[String]) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(ids.iter().cloned());
        Ok(())
    }

    async fn unsubscribe(&self, ids: &[String]) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        for id in ids {
            subscriptions.remove(id);
        }
        Ok(())
    }
}

/// Transport recording every published payload
#[derive(Debug, Default)]
pub struct MemoryTransport {
    published: Mutex<Vec<(String, Value)>>,
    fail: AtomicBool,
}

impl MemoryTransport {
    /// Create an empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Published `(topic, payload)` pairs, oldest first
    #[must_use]
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make every publish fail
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!("publish to `{topic}` failed")));
        }
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((topic.to_string(), payload));
        Ok(())
    }
}

/// Detector returning a fixed, replaceable list of controls
#[derive(Debug, Default)]
pub struct StaticDetector {
    controls: Mutex<Vec<DetectedControl>>,
    delay: Option<Duration>,
    passes: AtomicUsize,
}

impl StaticDetector {
    /// Create a detector returning the given controls
    #[must_use]
    pub fn new(controls: Vec<DetectedControl>) -> Self {
        Self {
            controls: Mutex::new(controls),
            delay: None,
            passes: AtomicUsize::new(0),
        }
    }

    /// Sleep this long in every detection pass
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the controls returned by the next pass
    pub fn set_controls(&self, controls: Vec<DetectedControl>) {
        *self.controls.lock().unwrap_or_else(|e| e.into_inner()) = controls;
    }

    /// Number of detection passes run so far
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlDetector for StaticDetector {
    async fn detect(&self) -> Result<Vec<DetectedControl>> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .controls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}
