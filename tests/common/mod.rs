//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use smarthome_bridge::{
    AlexaResponse, BridgeContext, Config, DetectedControl, DeviceManager, Directive,
    MemoryStateStore, MemoryTransport, StaticDetector,
};

/// A device manager wired to in-memory collaborators
pub struct Bridge {
    pub store: Arc<MemoryStateStore>,
    pub transport: Arc<MemoryTransport>,
    pub detector: Arc<StaticDetector>,
    pub manager: DeviceManager,
}

impl Bridge {
    /// Send a directive to the manager
    pub async fn send(
        &self,
        namespace: &str,
        name: &str,
        endpoint_id: &str,
        payload: Value,
    ) -> AlexaResponse {
        let directive = Directive::new(namespace, name, Some(endpoint_id), payload)
            .with_correlation_token("test-correlation");
        self.manager.handle_directive(&directive).await
    }

    /// Run discovery and return the endpoint list
    pub async fn discover(&self) -> Vec<Value> {
        let directive = Directive::new("Alexa.Discovery", "Discover", None, json!({}));
        let response = self.manager.handle_directive(&directive).await;
        response.payload()["endpoints"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    /// Change reports published so far
    pub fn change_reports(&self) -> Vec<Value> {
        self.transport.published().into_iter().map(|(_, p)| p).collect()
    }
}

/// Build a bridge over the given controls with default configuration
pub async fn bridge(controls: Vec<DetectedControl>) -> Bridge {
    bridge_with(controls, Config::default(), None).await
}

/// Build a bridge with explicit configuration and detection delay
pub async fn bridge_with(
    controls: Vec<DetectedControl>,
    config: Config,
    delay: Option<Duration>,
) -> Bridge {
    let store = Arc::new(MemoryStateStore::new());
    let transport = Arc::new(MemoryTransport::new());

    let mut detector = StaticDetector::new(controls);
    if let Some(delay) = delay {
        detector = detector.with_delay(delay);
    }
    let detector = Arc::new(detector);

    let context = BridgeContext::new(store.clone(), transport.clone(), config);
    let manager = DeviceManager::new(context, detector.clone());
    manager.collect().await.expect("initial collection failed");

    Bridge {
        store,
        transport,
        detector,
        manager,
    }
}

/// Dimmer whose only state is its level
pub fn dimmer(name: &str, level: &str) -> DetectedControl {
    DetectedControl::new("dimmer").with_state("set", level).named(name)
}

/// On/off light
pub fn light(name: &str, state: &str) -> DetectedControl {
    DetectedControl::new("light").with_state("set", state).named(name)
}

/// Motion sensor
pub fn motion(name: &str, state: &str) -> DetectedControl {
    DetectedControl::new("motion").with_state("actual", state).named(name)
}
