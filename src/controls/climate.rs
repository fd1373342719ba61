//! Thermostats, air conditioners and temperature sensors

use crate::capabilities::{Capability, CapabilityKind, modes};
use crate::properties::{Backing, Conversion, ModeMapping, Property, PropertyKind};
use crate::Result;

use super::roles::Roles;
use super::{Blueprint, ControlKind, power_switch};

/// Regulation modes the assistant knows, matched against state labels
const THERMOSTAT_MODES: [&str; 5] = ["AUTO", "HEAT", "COOL", "ECO", "OFF"];

/// `thermostat`: setpoint `set`, optional `actual`, `mode` and `power`
pub(super) fn thermostat(roles: &Roles<'_>) -> Result<Blueprint> {
    let mut properties = vec![setpoint(roles)?];

    let modes = thermostat_modes(roles);
    if !modes.is_empty() {
        properties.push(Property::new(
            PropertyKind::ThermostatMode,
            roles.backing("mode", "mode_actual")?,
            Conversion::Modes(modes),
        ));
    }

    let blueprint = Blueprint::new(ControlKind::Thermostat)
        .support(Capability::new(CapabilityKind::ThermostatController, properties));
    Ok(with_sensor_and_power(blueprint, roles))
}

/// `airCondition`: setpoint plus an enumerated operation mode
pub(super) fn air_condition(roles: &Roles<'_>) -> Result<Blueprint> {
    let blueprint = Blueprint::new(ControlKind::AirCondition).support(Capability::new(
        CapabilityKind::ThermostatController,
        vec![setpoint(roles)?],
    ));

    let modes = roles.prefixed_modes("mode", "AirCondition.Mode");
    let blueprint = if modes.is_empty() {
        blueprint
    } else {
        blueprint.support(
            Capability::with_instance(
                CapabilityKind::ModeController,
                "AirCondition.Mode",
                vec![Property::new(
                    PropertyKind::Mode,
                    roles.backing("mode", "mode_actual")?,
                    Conversion::Modes(modes),
                )],
            )
            .with_resources(modes::asset_friendly_names("Alexa.Setting.Mode")),
        )
    };

    Ok(with_sensor_and_power(blueprint, roles))
}

/// `temperature`: measured `actual`
pub(super) fn temperature(roles: &Roles<'_>) -> Result<Blueprint> {
    Ok(Blueprint::new(ControlKind::Temperature).support(temperature_sensor(roles.state("actual")?)))
}

fn setpoint(roles: &Roles<'_>) -> Result<Property> {
    let meta = roles.meta("set");
    Ok(Property::new(
        PropertyKind::TargetSetpoint,
        roles.state("set")?,
        Conversion::Identity,
    )
    .with_range(meta.and_then(|m| m.min), meta.and_then(|m| m.max)))
}

fn temperature_sensor(backing: Backing) -> Capability {
    Capability::new(
        CapabilityKind::TemperatureSensor,
        vec![Property::new(PropertyKind::Temperature, backing, Conversion::Identity)],
    )
}

fn with_sensor_and_power(blueprint: Blueprint, roles: &Roles<'_>) -> Blueprint {
    let blueprint = match roles.id("actual") {
        Some(actual) => blueprint
            .support(temperature_sensor(Backing::state(actual)))
            .category("TEMPERATURE_SENSOR"),
        None => blueprint,
    };
    blueprint.support_opt(roles.optional_backing("power", "power_actual").map(power_switch))
}

/// Map enumerated mode labels onto the assistant's regulation modes
fn thermostat_modes(roles: &Roles<'_>) -> Vec<ModeMapping> {
    let mut mapped: Vec<ModeMapping> = Vec::new();
    for (backing, label) in roles.enumerated("mode") {
        let upper = label.to_ascii_uppercase();
        let Some(mode) = THERMOSTAT_MODES.iter().find(|m| upper.contains(*m)) else {
            continue;
        };
        if mapped.iter().any(|m| m.alexa == *mode) {
            continue;
        }
        mapped.push(ModeMapping {
            alexa: (*mode).to_string(),
            backing,
            label,
        });
    }
    mapped
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use serde_json::json;

    use crate::controls::Control;
    use crate::platform::{DetectedControl, MemoryStateStore, StateMeta};
    use crate::protocol::Directive;

    fn heating() -> DetectedControl {
        DetectedControl::new("thermostat")
            .named("Heating")
            .with_state_meta(
                "set",
                "heating.set",
                StateMeta {
                    min: Some(5.0),
                    max: Some(30.0),
                    ..StateMeta::default()
                },
            )
            .with_state("actual", "heating.actual")
            .with_state_meta(
                "mode",
                "heating.mode",
                StateMeta {
                    states: Some(BTreeMap::from([
                        ("0".to_string(), "Auto".to_string()),
                        ("1".to_string(), "Heat".to_string()),
                        ("2".to_string(), "Off".to_string()),
                    ])),
                    ..StateMeta::default()
                },
            )
    }

    #[tokio::test]
    async fn setpoint_reports_mode_in_context() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("heating.mode", json!(1));
        let mut control = Control::from_detected(&heating(), store.clone()).unwrap();

        let set = Directive::new(
            "Alexa.ThermostatController",
            "SetTargetTemperature",
            Some("Heating"),
            json!({"targetSetpoint": {"value": 21.5, "scale": "CELSIUS"}}),
        );
        let reported = control.handle(&set).await.unwrap();

        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].name, "targetSetpoint");
        assert_eq!(reported[0].value, json!({"value": 21.5, "scale": "CELSIUS"}));
        assert_eq!(reported[1].name, "thermostatMode");
        assert_eq!(reported[1].value, json!("HEAT"));
        assert_eq!(store.value("heating.set"), Some(json!(21.5)));
    }

    #[tokio::test]
    async fn setpoint_is_clamped_to_state_range() {
        let store = Arc::new(MemoryStateStore::new());
        let mut control = Control::from_detected(&heating(), store.clone()).unwrap();

        let set = Directive::new(
            "Alexa.ThermostatController",
            "SetTargetTemperature",
            Some("Heating"),
            json!({"targetSetpoint": {"value": 95.0, "scale": "FAHRENHEIT"}}),
        );
        control.handle(&set).await.unwrap();
        assert_eq!(store.value("heating.set"), Some(json!(30)));
    }

    #[tokio::test]
    async fn adjusted_setpoint_reports_the_clamped_value() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("heating.set", json!(29));
        let mut control = Control::from_detected(&heating(), store.clone()).unwrap();

        let adjust = Directive::new(
            "Alexa.ThermostatController",
            "AdjustTargetTemperature",
            Some("Heating"),
            json!({"targetSetpointDelta": {"value": 5, "scale": "CELSIUS"}}),
        );
        let reported = control.handle(&adjust).await.unwrap();

        assert_eq!(reported[0].name, "targetSetpoint");
        assert_eq!(reported[0].value, json!({"value": 30, "scale": "CELSIUS"}));
        assert_eq!(store.value("heating.set"), Some(json!(30)));

        let state = control.report_state().await;
        assert_eq!(state[0].value, reported[0].value);
    }

    #[tokio::test]
    async fn thermostat_mode_is_written_as_backing_value() {
        let store = Arc::new(MemoryStateStore::new());
        let mut control = Control::from_detected(&heating(), store.clone()).unwrap();

        let set = Directive::new(
            "Alexa.ThermostatController",
            "SetThermostatMode",
            Some("Heating"),
            json!({"thermostatMode": {"value": "OFF"}}),
        );
        control.handle(&set).await.unwrap();
        assert_eq!(store.value("heating.mode"), Some(json!(2)));
        assert_eq!(control.categories(), &["THERMOSTAT", "TEMPERATURE_SENSOR"]);
    }

    #[tokio::test]
    async fn air_condition_mode_uses_instance() {
        let store = Arc::new(MemoryStateStore::new());
        let detected = DetectedControl::new("airCondition")
            .with_state("set", "ac.set")
            .with_state("power", "ac.power")
            .with_state_meta(
                "mode",
                "ac.mode",
                StateMeta {
                    states: Some(BTreeMap::from([
                        ("cool".to_string(), "Cool".to_string()),
                        ("dry".to_string(), "Dry".to_string()),
                    ])),
                    ..StateMeta::default()
                },
            );
        let mut control = Control::from_detected(&detected, store.clone()).unwrap();

        let set = Directive::new(
            "Alexa.ModeController",
            "SetMode",
            Some("AC"),
            json!({"mode": "AirCondition.Mode.Dry"}),
        )
        .with_instance("AirCondition.Mode");
        let reported = control.handle(&set).await.unwrap();

        assert_eq!(store.value("ac.mode"), Some(json!("dry")));
        assert_eq!(reported[0].instance.as_deref(), Some("AirCondition.Mode"));
    }
}
