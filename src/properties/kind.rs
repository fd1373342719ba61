//! Static registry of property kinds
//!
//! Each kind knows its protocol property name, the directives it answers and
//! how it reads its value out of a directive payload.

/// How a property responds to a matched directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Absolute value: extract, convert, write
    Set,
    /// Relative value: extract delta, add to current, clamp, write
    Adjust,
    /// No write; the current value is reported alongside the directive
    Echo,
}

/// Shape of a reported value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    /// Value as-is
    Plain,
    /// `{value, scale: "CELSIUS"}`
    Temperature,
    /// `{value}`
    Wrapped,
}

/// Property kinds known to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// `Alexa.PowerController.powerState`
    PowerState,
    /// `Alexa.BrightnessController.brightness`
    Brightness,
    /// `Alexa.PercentageController.percentage`
    Percentage,
    /// `Alexa.ColorController.color`
    Color,
    /// `Alexa.ColorTemperatureController.colorTemperatureInKelvin`
    ColorTemperatureInKelvin,
    /// `Alexa.ThermostatController.targetSetpoint`
    TargetSetpoint,
    /// `Alexa.ThermostatController.thermostatMode`
    ThermostatMode,
    /// `Alexa.TemperatureSensor.temperature`
    Temperature,
    /// `Alexa.LockController.lockState`
    LockState,
    /// `Alexa.ContactSensor.detectionState` / `Alexa.MotionSensor.detectionState`
    DetectionState,
    /// `Alexa.Speaker.volume`
    Volume,
    /// `Alexa.Speaker.muted`
    Muted,
    /// `Alexa.ModeController.mode`
    Mode,
    /// `Alexa.EndpointHealth.connectivity`
    Connectivity,
    /// `Alexa.SceneController` trigger, never reported
    Activation,
}

const POWER_DIRECTIVES: &[(&str, DirectiveKind)] =
    &[("TurnOn", DirectiveKind::Set), ("TurnOff", DirectiveKind::Set)];
const BRIGHTNESS_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetBrightness", DirectiveKind::Set),
    ("AdjustBrightness", DirectiveKind::Adjust),
];
const PERCENTAGE_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetPercentage", DirectiveKind::Set),
    ("AdjustPercentage", DirectiveKind::Adjust),
];
const COLOR_DIRECTIVES: &[(&str, DirectiveKind)] = &[("SetColor", DirectiveKind::Set)];
const COLOR_TEMPERATURE_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetColorTemperature", DirectiveKind::Set),
    ("IncreaseColorTemperature", DirectiveKind::Set),
    ("DecreaseColorTemperature", DirectiveKind::Set),
];
const SETPOINT_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetTargetTemperature", DirectiveKind::Set),
    ("AdjustTargetTemperature", DirectiveKind::Adjust),
];
const THERMOSTAT_MODE_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetThermostatMode", DirectiveKind::Set),
    ("SetTargetTemperature", DirectiveKind::Echo),
    ("AdjustTargetTemperature", DirectiveKind::Echo),
];
const LOCK_DIRECTIVES: &[(&str, DirectiveKind)] =
    &[("Lock", DirectiveKind::Set), ("Unlock", DirectiveKind::Set)];
const VOLUME_DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("SetVolume", DirectiveKind::Set),
    ("AdjustVolume", DirectiveKind::Adjust),
];
const MUTE_DIRECTIVES: &[(&str, DirectiveKind)] = &[("SetMute", DirectiveKind::Set)];
const MODE_DIRECTIVES: &[(&str, DirectiveKind)] = &[("SetMode", DirectiveKind::Set)];
const ACTIVATION_DIRECTIVES: &[(&str, DirectiveKind)] = &[("Activate", DirectiveKind::Set)];

impl PropertyKind {
    /// Protocol property name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PowerState => "powerState",
            Self::Brightness => "brightness",
            Self::Percentage => "percentage",
            Self::Color => "color",
            Self::ColorTemperatureInKelvin => "colorTemperatureInKelvin",
            Self::TargetSetpoint => "targetSetpoint",
            Self::ThermostatMode => "thermostatMode",
            Self::Temperature => "temperature",
            Self::LockState => "lockState",
            Self::DetectionState => "detectionState",
            Self::Volume => "volume",
            Self::Muted => "muted",
            Self::Mode => "mode",
            Self::Connectivity => "connectivity",
            Self::Activation => "activation",
        }
    }

    /// Directives this kind answers, with the handling strategy for each
    #[must_use]
    pub const fn directives(self) -> &'static [(&'static str, DirectiveKind)] {
        match self {
            Self::PowerState => POWER_DIRECTIVES,
            Self::Brightness => BRIGHTNESS_DIRECTIVES,
            Self::Percentage => PERCENTAGE_DIRECTIVES,
            Self::Color => COLOR_DIRECTIVES,
            Self::ColorTemperatureInKelvin => COLOR_TEMPERATURE_DIRECTIVES,
            Self::TargetSetpoint => SETPOINT_DIRECTIVES,
            Self::ThermostatMode => THERMOSTAT_MODE_DIRECTIVES,
            Self::LockState => LOCK_DIRECTIVES,
            Self::Volume => VOLUME_DIRECTIVES,
            Self::Muted => MUTE_DIRECTIVES,
            Self::Mode => MODE_DIRECTIVES,
            Self::Activation => ACTIVATION_DIRECTIVES,
            Self::Temperature | Self::DetectionState | Self::Connectivity => &[],
        }
    }

    /// Strategy for the named directive, if this kind answers it
    #[must_use]
    pub fn directive_kind(self, directive_name: &str) -> Option<DirectiveKind> {
        self.directives()
            .iter()
            .find(|(name, _)| *name == directive_name)
            .map(|(_, kind)| *kind)
    }

    /// Payload field carrying the absolute value
    #[must_use]
    pub const fn value_field(self) -> Option<&'static str> {
        match self {
            Self::Brightness => Some("brightness"),
            Self::Percentage => Some("percentage"),
            Self::Color => Some("color"),
            Self::ColorTemperatureInKelvin => Some("colorTemperatureInKelvin"),
            Self::TargetSetpoint => Some("targetSetpoint"),
            Self::ThermostatMode => Some("thermostatMode"),
            Self::Volume => Some("volume"),
            Self::Muted => Some("mute"),
            Self::Mode => Some("mode"),
            _ => None,
        }
    }

    /// Payload field carrying the delta of an adjust directive
    ///
    /// `Speaker.AdjustVolume` reuses the `volume` field for its signed step.
    #[must_use]
    pub const fn delta_field(self) -> Option<&'static str> {
        match self {
            Self::Brightness => Some("brightnessDelta"),
            Self::Percentage => Some("percentageDelta"),
            Self::TargetSetpoint => Some("targetSetpointDelta"),
            Self::Volume => Some("volume"),
            _ => None,
        }
    }

    /// Shape of the reported value
    #[must_use]
    pub const fn report_shape(self) -> ReportShape {
        match self {
            Self::TargetSetpoint | Self::Temperature => ReportShape::Temperature,
            Self::Connectivity => ReportShape::Wrapped,
            _ => ReportShape::Plain,
        }
    }

    /// Whether the property shows up in discovery and state reports
    #[must_use]
    pub const fn is_reportable(self) -> bool {
        !matches!(self, Self::Activation)
    }
}
