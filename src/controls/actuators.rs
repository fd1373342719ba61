//! Blinds, sliders, locks, gates, buttons and vacuum cleaners

use serde_json::json;

use crate::capabilities::{Capability, CapabilityKind, modes};
use crate::properties::{Conversion, ModeMapping, Property, PropertyKind};
use crate::Result;

use super::roles::Roles;
use super::{Blueprint, ControlKind, percent_capability, power_from_level, power_switch};

/// `blind` / `slider`: a numeric level shown as a percentage
///
/// Group commands such as "turn off the living room" also reach these
/// controls; they are executed (on = fully open, off = closed) through an
/// enforced power capability but never answered as a success.
pub(super) fn level(roles: &Roles<'_>, kind: ControlKind) -> Result<Blueprint> {
    let range = roles.range("set", (0.0, 100.0));
    let backing = roles.backing("set", "actual")?;

    Ok(Blueprint::new(kind)
        .support(percent_capability(
            CapabilityKind::PercentageController,
            PropertyKind::Percentage,
            backing.clone(),
            range,
        ))
        .enforce(power_from_level(backing, range)))
}

/// `lock`: boolean `set` where `true` opens the lock
pub(super) fn lock(roles: &Roles<'_>) -> Result<Blueprint> {
    Ok(Blueprint::new(ControlKind::Lock).support(Capability::new(
        CapabilityKind::LockController,
        vec![Property::new(
            PropertyKind::LockState,
            roles.backing("set", "actual")?,
            Conversion::lock(),
        )],
    )))
}

/// `gate`: boolean `set` exposed as an open/closed position mode
pub(super) fn gate(roles: &Roles<'_>) -> Result<Blueprint> {
    let positions = vec![
        ModeMapping {
            alexa: "Gate.Position.Open".to_string(),
            backing: json!(true),
            label: "Open".to_string(),
        },
        ModeMapping {
            alexa: "Gate.Position.Closed".to_string(),
            backing: json!(false),
            label: "Closed".to_string(),
        },
    ];

    let capability = Capability::with_instance(
        CapabilityKind::ModeController,
        "Gate.Position",
        vec![Property::new(
            PropertyKind::Mode,
            roles.backing("set", "actual")?,
            Conversion::Modes(positions),
        )],
    )
    .with_resources(modes::asset_friendly_names("Alexa.Setting.Opening"))
    .with_semantics(modes::open_close_semantics("Gate.Position.Open", "Gate.Position.Closed"));

    Ok(Blueprint::new(ControlKind::Gate).support(capability))
}

/// `button`: trigger-only scene
pub(super) fn button(roles: &Roles<'_>) -> Result<Blueprint> {
    Ok(Blueprint::new(ControlKind::Button).support(Capability::new(
        CapabilityKind::SceneController,
        vec![Property::new(
            PropertyKind::Activation,
            roles.state("set")?,
            Conversion::Trigger(json!(true)),
        )],
    )))
}

/// `vacuumCleaner`: boolean `power`, optional enumerated `mode`
pub(super) fn vacuum_cleaner(roles: &Roles<'_>) -> Result<Blueprint> {
    let blueprint =
        Blueprint::new(ControlKind::VacuumCleaner).support(power_switch(roles.backing("power", "power_actual")?));

    let modes = roles.prefixed_modes("mode", "VacuumCleaner.Mode");
    if modes.is_empty() {
        return Ok(blueprint);
    }

    Ok(blueprint.support(
        Capability::with_instance(
            CapabilityKind::ModeController,
            "VacuumCleaner.Mode",
            vec![Property::new(
                PropertyKind::Mode,
                roles.backing("mode", "mode_actual")?,
                Conversion::Modes(modes),
            )],
        )
        .with_resources(modes::text_friendly_names("Cleaning mode")),
    ))
}
