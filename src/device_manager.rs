//! Endpoint registry and directive routing
//!
//! The manager turns detected controls into endpoints, routes directives to
//! them, applies admission control and publishes change reports whenever a
//! backing state changes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::context::BridgeContext;
use crate::controls::Control;
use crate::device::Device;
use crate::handlers;
use crate::platform::{ControlDetector, DetectedControl};
use crate::protocol::{Directive, endpoint_id, namespaces};
use crate::rate_limiter::RateLimiter;
use crate::response::{AlexaResponse, ChangeCause, DirectiveError};
use crate::Result;

const SCENE_CONTROLLER: &str = "Alexa.SceneController";

/// Registered endpoint, keyed by id so lookups never wait on a device
type Entry = (String, Arc<Mutex<Device>>);

#[derive(Debug, Default)]
struct Collection {
    in_flight: bool,
    recollect: bool,
}

/// Registry of endpoints built from the platform's detected controls
pub struct DeviceManager {
    context: BridgeContext,
    detector: Arc<dyn ControlDetector>,
    devices: RwLock<Vec<Entry>>,
    limiter: RateLimiter,
    collection: StdMutex<Collection>,
}

impl DeviceManager {
    /// Create a manager with an empty registry
    #[must_use]
    pub fn new(context: BridgeContext, detector: Arc<dyn ControlDetector>) -> Self {
        Self {
            context,
            detector,
            devices: RwLock::new(Vec::new()),
            limiter: RateLimiter::new(),
            collection: StdMutex::new(Collection::default()),
        }
    }

    /// Ids of all registered endpoints, in collection order
    pub async fn endpoint_ids(&self) -> Vec<String> {
        self.devices.read().await.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Look up an endpoint
    pub async fn device(&self, endpoint_id: &str) -> Option<Arc<Mutex<Device>>> {
        self.devices
            .read()
            .await
            .iter()
            .find(|(id, _)| id == endpoint_id)
            .map(|(_, device)| Arc::clone(device))
    }

    async fn snapshot(&self) -> Vec<Arc<Mutex<Device>>> {
        self.devices.read().await.iter().map(|(_, device)| Arc::clone(device)).collect()
    }

    /// Rebuild the registry from the detector
    ///
    /// Passes never overlap: a request arriving while a pass runs is folded
    /// into one more pass after it. Returns the number of endpoints.
    ///
    /// # Errors
    ///
    /// Returns error if the last detection pass failed
    pub async fn collect(&self) -> Result<usize> {
        let busy = {
            let mut collection = self.collection.lock().unwrap_or_else(|e| e.into_inner());
            if collection.in_flight {
                collection.recollect = true;
            }
            std::mem::replace(&mut collection.in_flight, true)
        };
        if busy {
            tracing::debug!("collection in progress, scheduling another pass");
            return Ok(self.devices.read().await.len());
        }

        loop {
            let result = self.collect_once().await;

            let again = {
                let mut collection = self.collection.lock().unwrap_or_else(|e| e.into_inner());
                let again = std::mem::take(&mut collection.recollect);
                collection.in_flight = again;
                again
            };

            if !again {
                return result;
            }
            if let Err(e) = result {
                tracing::warn!(error = %e, "endpoint collection failed");
            }
        }
    }

    async fn collect_once(&self) -> Result<usize> {
        let detected = self.detector.detect().await?;
        let mut devices: Vec<Device> = Vec::new();

        for control in &detected {
            let name = self.friendly_name(control);
            let groups = control.groups.iter().map(String::as_str);

            for name in std::iter::once(name.as_str()).chain(groups) {
                let built = match Control::from_detected(control, Arc::clone(&self.context.store)) {
                    Ok(built) => built,
                    Err(e) => {
                        tracing::warn!(kind = %control.kind, name = %name, error = %e, "skipping control");
                        break;
                    }
                };

                let id = endpoint_id(name);
                match devices.iter_mut().find(|d| d.id() == id) {
                    Some(device) => device.add_control(built, control.toggle),
                    None => devices.push(Device::new(name, vec![built], control.toggle)),
                }
            }
        }

        let previous = self.snapshot().await;
        let mut previous_ids = HashSet::new();
        for device in &previous {
            let old = device.lock().await;
            previous_ids.extend(old.state_ids());
            if let (Some(state), Some(device)) = (
                old.last_reported_state(),
                devices.iter_mut().find(|d| d.id() == old.id()),
            ) {
                device.set_last_reported_state(state.to_vec());
            }
        }

        let current_ids: HashSet<String> = devices.iter().flat_map(Device::state_ids).collect();
        let mut removed: Vec<String> = previous_ids.difference(&current_ids).cloned().collect();
        let mut added: Vec<String> = current_ids.difference(&previous_ids).cloned().collect();
        removed.sort();
        added.sort();

        if !removed.is_empty() {
            if let Err(e) = self.context.store.unsubscribe(&removed).await {
                tracing::warn!(states = removed.len(), error = %e, "failed to unsubscribe");
            }
        }
        if !added.is_empty() {
            if let Err(e) = self.context.store.subscribe(&added).await {
                tracing::warn!(states = added.len(), error = %e, "failed to subscribe");
            }
        }

        let count = devices.len();
        *self.devices.write().await = devices
            .into_iter()
            .map(|d| (d.id().to_string(), Arc::new(Mutex::new(d))))
            .collect();

        tracing::info!(endpoints = count, controls = detected.len(), "endpoints collected");
        Ok(count)
    }

    fn friendly_name(&self, detected: &DetectedControl) -> String {
        if detected.name.is_some() {
            return detected.display_name();
        }
        match (&detected.room, &detected.function) {
            (Some(room), Some(function)) => self.context.config.compose_name(room, function),
            _ => detected.display_name(),
        }
    }

    /// Parse and handle a raw directive
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is not a directive
    pub async fn handle_value(&self, value: Value) -> Result<AlexaResponse> {
        let directive = Directive::from_value(value)?;
        Ok(self.handle_directive(&directive).await)
    }

    /// Handle a directive; failures are answered with an `ErrorResponse`
    pub async fn handle_directive(&self, directive: &Directive) -> AlexaResponse {
        tracing::debug!(
            namespace = %directive.header.namespace,
            name = %directive.header.name,
            endpoint_id = directive.endpoint_id().unwrap_or_default(),
            "directive received"
        );

        if directive.is(namespaces::DISCOVERY, "Discover") {
            return self.discover(directive).await;
        }
        if directive.is(namespaces::AUTHORIZATION, "AcceptGrant") {
            return handlers::accept_grant(directive);
        }

        let Some(id) = directive.endpoint_id() else {
            tracing::warn!(name = %directive.header.name, "directive without endpoint");
            return AlexaResponse::error(directive, &DirectiveError::NotSupportedByDevice);
        };
        let Some(device) = self.device(id).await else {
            return AlexaResponse::error(directive, &DirectiveError::NonExistingEndpoint(id.to_string()));
        };
        let mut device = device.lock().await;

        if directive.is(namespaces::ALEXA, "ReportState") {
            return handlers::report_state(directive, &mut device).await;
        }

        if !device.supports(directive) {
            return AlexaResponse::error(directive, &DirectiveError::NotSupportedByDevice);
        }

        if let Err(e) = self.limiter.increment_and_get(id) {
            tracing::warn!(endpoint_id = %id, error = %e, "directive throttled");
            return AlexaResponse::error(directive, &e.into());
        }

        match device.handle(directive).await {
            Ok(properties) => {
                let response = if directive.is(SCENE_CONTROLLER, "Activate") {
                    AlexaResponse::activation_started(directive)
                } else {
                    AlexaResponse::success(directive, &properties)
                };
                self.publish_change(&mut device, ChangeCause::VoiceInteraction).await;
                response
            }
            Err(e) => {
                tracing::debug!(endpoint_id = %id, error = %e, "directive rejected");
                AlexaResponse::error(directive, &e)
            }
        }
    }

    async fn discover(&self, directive: &Directive) -> AlexaResponse {
        let devices = self.snapshot().await;
        let mut guards = Vec::with_capacity(devices.len());
        for device in &devices {
            guards.push(device.lock().await);
        }

        handlers::discover(
            directive,
            guards.iter().map(|g| &**g),
            &self.context.config,
            Utc::now(),
        )
    }

    /// A backing state changed on the platform
    ///
    /// Every endpoint backed by the state refreshes and, if its reported
    /// state differs from the last report, publishes a change report.
    pub async fn on_state_change(&self, id: &str, value: Option<Value>) {
        let devices = self.snapshot().await;
        let value = value.as_ref();
        let updates = devices.iter().map(|device| async move {
            let mut device = device.lock().await;
            if device.state_changed(id, value) {
                self.publish_change(&mut device, ChangeCause::PhysicalInteraction).await;
            }
        });
        join_all(updates).await;
    }

    async fn publish_change(&self, device: &mut Device, cause: ChangeCause) {
        let Some(change) = handlers::pending_change(device).await else {
            return;
        };

        // directives were already counted before they ran
        if cause == ChangeCause::PhysicalInteraction {
            if let Err(e) = self.limiter.increment_and_get(device.id()) {
                tracing::warn!(endpoint_id = %device.id(), error = %e, "change report throttled");
                return;
            }
        }

        let report = handlers::change_report(device, change, cause);
        if let Err(e) = self
            .context
            .transport
            .publish(&self.context.config.events_topic, report.to_value())
            .await
        {
            tracing::warn!(endpoint_id = %device.id(), error = %e, "failed to publish change report");
        }
    }
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("context", &self.context)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
