//! Capabilities: protocol interfaces grouping one or more properties

pub mod modes;

use serde_json::{Value, json};

use crate::properties::{Property, PropertyKind};

/// Interfaces known to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// On/off
    PowerController,
    /// Brightness 0–100
    BrightnessController,
    /// Generic percentage 0–100
    PercentageController,
    /// HSB color
    ColorController,
    /// White spectrum in Kelvin
    ColorTemperatureController,
    /// Setpoint and regulation mode
    ThermostatController,
    /// Measured temperature
    TemperatureSensor,
    /// Lock state
    LockController,
    /// Open/closed contact
    ContactSensor,
    /// Motion detection
    MotionSensor,
    /// Volume and mute
    Speaker,
    /// Enumerated setting, multi-instance
    ModeController,
    /// Trigger-only scene
    SceneController,
    /// Reachability
    EndpointHealth,
}

impl CapabilityKind {
    /// Protocol interface name
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::PowerController => "Alexa.PowerController",
            Self::BrightnessController => "Alexa.BrightnessController",
            Self::PercentageController => "Alexa.PercentageController",
            Self::ColorController => "Alexa.ColorController",
            Self::ColorTemperatureController => "Alexa.ColorTemperatureController",
            Self::ThermostatController => "Alexa.ThermostatController",
            Self::TemperatureSensor => "Alexa.TemperatureSensor",
            Self::LockController => "Alexa.LockController",
            Self::ContactSensor => "Alexa.ContactSensor",
            Self::MotionSensor => "Alexa.MotionSensor",
            Self::Speaker => "Alexa.Speaker",
            Self::ModeController => "Alexa.ModeController",
            Self::SceneController => "Alexa.SceneController",
            Self::EndpointHealth => "Alexa.EndpointHealth",
        }
    }

    /// Interface version advertised in discovery
    #[must_use]
    pub const fn version(self) -> &'static str {
        match self {
            Self::ThermostatController => "3.2",
            _ => "3",
        }
    }

    /// Whether the interface only reports (sensors)
    #[must_use]
    pub const fn is_sensor(self) -> bool {
        matches!(
            self,
            Self::TemperatureSensor | Self::ContactSensor | Self::MotionSensor | Self::EndpointHealth
        )
    }
}

/// One protocol interface bound to its properties
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    kind: CapabilityKind,
    instance: Option<String>,
    properties: Vec<Property>,
    proactively_reported: bool,
    retrievable: bool,
    resources: Option<Value>,
    semantics: Option<Value>,
}

impl Capability {
    /// Create a capability owning the given properties
    #[must_use]
    pub fn new(kind: CapabilityKind, properties: Vec<Property>) -> Self {
        Self::build(kind, None, properties)
    }

    /// Create one instance of a multi-instance capability
    #[must_use]
    pub fn with_instance(kind: CapabilityKind, instance: &str, properties: Vec<Property>) -> Self {
        Self::build(kind, Some(instance.to_string()), properties)
    }

    fn build(kind: CapabilityKind, instance: Option<String>, mut properties: Vec<Property>) -> Self {
        for property in &mut properties {
            property.attach(kind.namespace(), instance.as_deref());
        }

        Self {
            kind,
            instance,
            properties,
            proactively_reported: true,
            retrievable: true,
            resources: None,
            semantics: None,
        }
    }

    /// Attach `capabilityResources`
    #[must_use]
    pub fn with_resources(mut self, resources: Value) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Attach `semantics`
    #[must_use]
    pub fn with_semantics(mut self, semantics: Value) -> Self {
        self.semantics = Some(semantics);
        self
    }

    /// Interface kind
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Protocol interface name
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        self.kind.namespace()
    }

    /// Instance discriminator
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Owned properties
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Owned properties, mutably
    pub fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    /// Names of properties listed in discovery
    #[must_use]
    pub fn discoverable_properties(&self) -> Vec<&'static str> {
        self.properties
            .iter()
            .filter(|p| p.kind().is_reportable())
            .map(Property::property_name)
            .collect()
    }

    /// Discovery fragment of this interface
    #[must_use]
    pub fn alexa_response(&self) -> Value {
        let mut fragment = json!({
            "type": "AlexaInterface",
            "interface": self.namespace(),
            "version": self.kind.version(),
        });

        if let Some(instance) = &self.instance {
            fragment["instance"] = json!(instance);
        }

        let supported: Vec<Value> = self
            .discoverable_properties()
            .into_iter()
            .map(|name| json!({"name": name}))
            .collect();

        if !supported.is_empty() {
            let mut properties = json!({
                "supported": supported,
                "proactivelyReported": self.proactively_reported,
                "retrievable": self.retrievable,
            });
            if self.kind.is_sensor() {
                properties["nonControllable"] = json!(true);
            }
            fragment["properties"] = properties;
        }

        if let Some(configuration) = self.configuration() {
            fragment["configuration"] = configuration;
        }
        if let Some(resources) = &self.resources {
            fragment["capabilityResources"] = resources.clone();
        }
        if let Some(semantics) = &self.semantics {
            fragment["semantics"] = semantics.clone();
        }
        if self.kind == CapabilityKind::SceneController {
            fragment["supportsDeactivation"] = json!(false);
            fragment["proactivelyReported"] = json!(self.proactively_reported);
        }

        fragment
    }

    fn configuration(&self) -> Option<Value> {
        let supported_modes = |kind: PropertyKind| {
            self.properties
                .iter()
                .find(|p| p.kind() == kind)
                .map(Property::supported_modes)
                .filter(|m| !m.is_empty())
        };

        match self.kind {
            CapabilityKind::ModeController => {
                supported_modes(PropertyKind::Mode).map(modes::mode_configuration)
            }
            CapabilityKind::ThermostatController => {
                supported_modes(PropertyKind::ThermostatMode).map(modes::thermostat_configuration)
            }
            _ => None,
        }
    }
}
