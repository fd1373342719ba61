//! Devices: externally visible endpoints aggregating one or more controls

use futures::future::join_all;
use serde_json::{Value, json};

use crate::capabilities::Capability;
use crate::config::Config;
use crate::controls::Control;
use crate::protocol::{Directive, ReportedProperty, endpoint_id, namespaces};
use crate::response::{DirectiveError, DiscoveryEndpoint};

/// One endpoint: controls sharing a friendly name
#[derive(Debug)]
pub struct Device {
    id: String,
    friendly_name: String,
    controls: Vec<Control>,
    toggle: bool,
    last_reported_state: Option<Vec<ReportedProperty>>,
}

impl Device {
    /// Create an endpoint; the id is derived from the friendly name
    #[must_use]
    pub fn new(friendly_name: &str, controls: Vec<Control>, toggle: bool) -> Self {
        Self {
            id: endpoint_id(friendly_name),
            friendly_name: friendly_name.to_string(),
            controls,
            toggle,
            last_reported_state: None,
        }
    }

    /// Merge another control into this endpoint
    pub fn add_control(&mut self, control: Control, toggle: bool) {
        self.controls.push(control);
        self.toggle |= toggle;
    }

    /// Endpoint id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether on/off directives toggle
    #[must_use]
    pub const fn toggle(&self) -> bool {
        self.toggle
    }

    /// Union of the controls' display categories
    #[must_use]
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories = Vec::new();
        for category in self.controls.iter().flat_map(Control::categories) {
            if !categories.contains(category) {
                categories.push(*category);
            }
        }
        categories
    }

    /// Advertised capabilities, one per interface and instance
    #[must_use]
    pub fn capabilities(&self) -> Vec<&Capability> {
        let mut capabilities: Vec<&Capability> = Vec::new();
        for capability in self.controls.iter().flat_map(Control::supported) {
            let duplicate = capabilities
                .iter()
                .any(|c| c.namespace() == capability.namespace() && c.instance() == capability.instance());
            if !duplicate {
                capabilities.push(capability);
            }
        }
        capabilities
    }

    /// Every backing state of every control
    #[must_use]
    pub fn state_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.controls.iter().flat_map(Control::state_ids).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Whether any control handles or accepts the directive
    #[must_use]
    pub fn supports(&self, directive: &Directive) -> bool {
        self.controls
            .iter()
            .any(|c| c.supports(directive) || c.can_handle(directive))
    }

    /// Discovery entry, including the base interface
    #[must_use]
    pub fn discovery_entry(&self, config: &Config) -> DiscoveryEndpoint {
        let mut capabilities = vec![json!({
            "type": "AlexaInterface",
            "interface": namespaces::ALEXA,
            "version": "3",
        })];
        capabilities.extend(self.capabilities().into_iter().map(Capability::alexa_response));

        DiscoveryEndpoint::new(&self.id, &self.friendly_name, config)
            .with_categories(&self.categories())
            .with_capabilities(capabilities)
    }

    /// Fan a directive out to every control
    ///
    /// Toggle endpoints first attach a snapshot of their state so controls
    /// flip against a consistent baseline.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::NotSupportedByDevice`] if no control matches,
    /// otherwise the first control rejection when no control succeeded
    pub async fn handle(
        &mut self,
        directive: &Directive,
    ) -> std::result::Result<Vec<ReportedProperty>, DirectiveError> {
        if !self.supports(directive) {
            return Err(DirectiveError::NotSupportedByDevice);
        }

        let mut directive = directive.clone();
        if self.toggle {
            directive.current_state = Some(self.report_state().await);
        }

        let results = join_all(self.controls.iter_mut().map(|c| c.handle(&directive))).await;

        let mut first_error = None;
        for result in results {
            match result {
                Ok(reported) => return Ok(reported),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or(DirectiveError::NotSupportedByDevice))
    }

    /// Merged state of every control
    pub async fn report_state(&mut self) -> Vec<ReportedProperty> {
        let reports = join_all(self.controls.iter_mut().map(Control::report_state)).await;

        let mut merged: Vec<ReportedProperty> = Vec::new();
        for property in reports.into_iter().flatten() {
            match merged.iter_mut().find(|p| p.same_property(&property)) {
                Some(existing) => merge_duplicate(existing, property),
                None => merged.push(property),
            }
        }
        merged
    }

    /// Pass an external state change to the controls; returns whether any
    /// control is backed by the state
    pub fn state_changed(&mut self, id: &str, value: Option<&Value>) -> bool {
        let mut affected = false;
        for control in &mut self.controls {
            affected |= control.state_changed(id, value);
        }
        affected
    }

    /// Last state sent to the assistant
    #[must_use]
    pub fn last_reported_state(&self) -> Option<&[ReportedProperty]> {
        self.last_reported_state.as_deref()
    }

    /// Remember the state sent to the assistant
    pub fn set_last_reported_state(&mut self, state: Vec<ReportedProperty>) {
        self.last_reported_state = Some(state);
    }
}

/// Same property reported by two merged controls: `ON` wins over `OFF`,
/// `DETECTED` over `NOT_DETECTED`, the larger number over the smaller;
/// otherwise the first report stays
fn merge_duplicate(existing: &mut ReportedProperty, candidate: ReportedProperty) {
    let replace = match (&existing.value, &candidate.value) {
        (Value::String(a), Value::String(b)) => {
            (a == "OFF" && b == "ON") || (a == "NOT_DETECTED" && b == "DETECTED")
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => b > a,
            _ => false,
        },
        _ => false,
    };
    if replace {
        existing.value = candidate.value;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::platform::{DetectedControl, MemoryStateStore};

    fn control(store: &Arc<MemoryStateStore>, detected: &DetectedControl) -> Control {
        Control::from_detected(detected, store.clone()).unwrap()
    }

    fn lamp_and_sensor(store: &Arc<MemoryStateStore>) -> Device {
        let lamp = control(store, &DetectedControl::new("light").with_state("set", "lamp.on"));
        let sensor = control(store, &DetectedControl::new("motion").with_state("actual", "pir"));
        Device::new("Hall Light", vec![lamp, sensor], false)
    }

    #[tokio::test]
    async fn lamp_success_wins_over_sensor_rejection() {
        let store = Arc::new(MemoryStateStore::new());
        let mut device = lamp_and_sensor(&store);

        let on = Directive::new("Alexa.PowerController", "TurnOn", Some("Hall_Light"), json!({}));
        let reported = device.handle(&on).await.unwrap();

        assert_eq!(reported[0].value, json!("ON"));
        assert_eq!(store.value("lamp.on"), Some(json!(true)));
        assert_eq!(device.id(), "Hall_Light");
        assert_eq!(device.categories(), vec!["LIGHT", "MOTION_SENSOR"]);
    }

    #[tokio::test]
    async fn unmatched_directive_is_not_supported_by_device() {
        let store = Arc::new(MemoryStateStore::new());
        let mut device = lamp_and_sensor(&store);

        let lock = Directive::new("Alexa.LockController", "Lock", Some("Hall_Light"), json!({}));
        assert_eq!(device.handle(&lock).await, Err(DirectiveError::NotSupportedByDevice));
    }

    #[tokio::test]
    async fn merged_power_prefers_on() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("a.on", json!(false));
        store.insert("b.on", json!(true));

        let a = control(&store, &DetectedControl::new("light").with_state("set", "a.on"));
        let b = control(&store, &DetectedControl::new("light").with_state("set", "b.on"));
        let mut device = Device::new("Group", vec![a, b], false);

        let reported = device.report_state().await;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].value, json!("ON"));
    }

    #[tokio::test]
    async fn merged_numbers_prefer_max() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("a.level", json!(20));
        store.insert("b.level", json!(70));

        let a = control(&store, &DetectedControl::new("dimmer").with_state("set", "a.level"));
        let b = control(&store, &DetectedControl::new("dimmer").with_state("set", "b.level"));
        let mut device = Device::new("Group", vec![a, b], false);

        let reported = device.report_state().await;
        assert_eq!(reported[0].name, "brightness");
        assert_eq!(reported[0].value, json!(70));
    }

    #[tokio::test]
    async fn toggle_group_turns_off_when_any_member_is_on() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("a.on", json!(false));
        store.insert("b.on", json!(true));

        let a = control(&store, &DetectedControl::new("light").with_state("set", "a.on"));
        let b = control(&store, &DetectedControl::new("light").with_state("set", "b.on"));
        let mut device = Device::new("Group", vec![a], false);
        device.add_control(b, true);
        assert!(device.toggle());

        let on = Directive::new("Alexa.PowerController", "TurnOn", Some("Group"), json!({}));
        let reported = device.handle(&on).await.unwrap();

        assert_eq!(reported[0].value, json!("OFF"));
        assert_eq!(store.value("a.on"), Some(json!(false)));
        assert_eq!(store.value("b.on"), Some(json!(false)));
    }

    fn lights(store: &Arc<MemoryStateStore>, states: &[(&str, bool)], toggle: bool) -> Device {
        let mut controls = states.iter().map(|(id, on)| {
            store.insert(id, json!(on));
            control(store, &DetectedControl::new("light").with_state("set", id))
        });
        let first = controls.next().unwrap();
        let mut device = Device::new("Group", vec![first], false);
        for member in controls {
            device.add_control(member, toggle);
        }
        device
    }

    #[tokio::test]
    async fn three_merged_lights_report_on_if_any_is_on() {
        let store = Arc::new(MemoryStateStore::new());
        let mut device = lights(&store, &[("a.on", false), ("b.on", true), ("c.on", false)], false);

        let reported = device.report_state().await;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].value, json!("ON"));

        let mut dark = lights(&store, &[("d.on", false), ("e.on", false), ("f.on", false)], false);
        assert_eq!(dark.report_state().await[0].value, json!("OFF"));
    }

    #[tokio::test]
    async fn three_merged_dimmers_report_the_highest_level() {
        let store = Arc::new(MemoryStateStore::new());
        let mut controls = Vec::new();
        for (id, level) in [("a.level", 20), ("b.level", 70), ("c.level", 50)] {
            store.insert(id, json!(level));
            controls.push(control(&store, &DetectedControl::new("dimmer").with_state("set", id)));
        }
        let mut device = Device::new("Group", controls, false);

        let reported = device.report_state().await;
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].name, "brightness");
        assert_eq!(reported[0].value, json!(70));
        assert_eq!(reported[1].value, json!("ON"));
    }

    #[tokio::test]
    async fn three_member_toggle_follows_the_merged_state() {
        let store = Arc::new(MemoryStateStore::new());
        let mut device = lights(&store, &[("a.on", false), ("b.on", false), ("c.on", true)], true);
        assert!(device.toggle());

        let on = Directive::new("Alexa.PowerController", "TurnOn", Some("Group"), json!({}));
        let reported = device.handle(&on).await.unwrap();
        assert_eq!(reported[0].value, json!("OFF"));
        for id in ["a.on", "b.on", "c.on"] {
            assert_eq!(store.value(id), Some(json!(false)), "{id}");
        }

        device.handle(&on).await.unwrap();
        for id in ["a.on", "b.on", "c.on"] {
            assert_eq!(store.value(id), Some(json!(true)), "{id}");
        }
    }

    #[test]
    fn discovery_entry_deduplicates_capabilities() {
        let store = Arc::new(MemoryStateStore::new());
        let a = control(&store, &DetectedControl::new("light").with_state("set", "a.on"));
        let b = control(&store, &DetectedControl::new("socket").with_state("set", "b.on"));
        let device = Device::new("Kitchen Light", vec![a, b], false);

        let entry = serde_json::to_value(device.discovery_entry(&Config::default())).unwrap();
        let interfaces: Vec<&str> = entry["capabilities"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["interface"].as_str())
            .collect();

        assert_eq!(interfaces, vec!["Alexa", "Alexa.PowerController"]);
        assert_eq!(entry["displayCategories"], json!(["LIGHT", "SMARTPLUG"]));
        assert_eq!(entry["endpointId"], "Kitchen_Light");
    }
}
