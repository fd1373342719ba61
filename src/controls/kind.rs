//! Device patterns produced by the type detector

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Known device patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Light,
    Socket,
    Dimmer,
    Ct,
    Hue,
    Rgb,
    RgbSingle,
    RgbwSingle,
    Blind,
    Lock,
    Gate,
    Slider,
    Button,
    Thermostat,
    AirCondition,
    Temperature,
    Motion,
    Door,
    Window,
    Volume,
    VolumeGroup,
    VacuumCleaner,
}

impl ControlKind {
    /// Every pattern, in detector order
    pub const ALL: [Self; 22] = [
        Self::Light,
        Self::Socket,
        Self::Dimmer,
        Self::Ct,
        Self::Hue,
        Self::Rgb,
        Self::RgbSingle,
        Self::RgbwSingle,
        Self::Blind,
        Self::Lock,
        Self::Gate,
        Self::Slider,
        Self::Button,
        Self::Thermostat,
        Self::AirCondition,
        Self::Temperature,
        Self::Motion,
        Self::Door,
        Self::Window,
        Self::Volume,
        Self::VolumeGroup,
        Self::VacuumCleaner,
    ];

    /// Pattern name as emitted by the detector
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Socket => "socket",
            Self::Dimmer => "dimmer",
            Self::Ct => "ct",
            Self::Hue => "hue",
            Self::Rgb => "rgb",
            Self::RgbSingle => "rgbSingle",
            Self::RgbwSingle => "rgbwSingle",
            Self::Blind => "blind",
            Self::Lock => "lock",
            Self::Gate => "gate",
            Self::Slider => "slider",
            Self::Button => "button",
            Self::Thermostat => "thermostat",
            Self::AirCondition => "airCondition",
            Self::Temperature => "temperature",
            Self::Motion => "motion",
            Self::Door => "door",
            Self::Window => "window",
            Self::Volume => "volume",
            Self::VolumeGroup => "volumeGroup",
            Self::VacuumCleaner => "vacuumCleaner",
        }
    }

    /// Display category advertised in discovery
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Light
            | Self::Dimmer
            | Self::Ct
            | Self::Hue
            | Self::Rgb
            | Self::RgbSingle
            | Self::RgbwSingle => "LIGHT",
            Self::Socket => "SMARTPLUG",
            Self::Blind => "INTERIOR_BLIND",
            Self::Lock => "SMARTLOCK",
            Self::Gate => "GARAGE_DOOR",
            Self::Slider => "OTHER",
            Self::Button => "SCENE_TRIGGER",
            Self::Thermostat => "THERMOSTAT",
            Self::AirCondition => "AIR_CONDITIONER",
            Self::Temperature => "TEMPERATURE_SENSOR",
            Self::Motion => "MOTION_SENSOR",
            Self::Door | Self::Window => "CONTACT_SENSOR",
            Self::Volume | Self::VolumeGroup => "SPEAKER",
            Self::VacuumCleaner => "VACUUM_CLEANER",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedControl(s.to_string()))
    }
}
