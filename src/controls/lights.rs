//! Switches and lights

use crate::capabilities::{Capability, CapabilityKind};
use crate::properties::{Backing, ColorEncoding, Conversion, Property, PropertyKind};
use crate::Result;

use super::roles::Roles;
use super::{Blueprint, ControlKind, percent_capability, power_from_level, power_switch};

/// `light` / `socket`: a boolean `set` with optional `actual`
pub(super) fn switch(roles: &Roles<'_>, kind: ControlKind) -> Result<Blueprint> {
    Ok(Blueprint::new(kind).support(power_switch(roles.backing("set", "actual")?)))
}

/// `dimmer`: numeric `set`, optional `on_set`; without it, power is derived
/// from the level
pub(super) fn dimmer(roles: &Roles<'_>) -> Result<Blueprint> {
    let set_id = roles.require("set")?;
    let range = roles.range("set", (0.0, 100.0));
    let level = Backing::split(set_id, roles.id("actual"));

    let blueprint = Blueprint::new(ControlKind::Dimmer).support(percent_capability(
        CapabilityKind::BrightnessController,
        PropertyKind::Brightness,
        level.clone(),
        range,
    ));

    Ok(match roles.optional_backing("on_set", "on_actual") {
        Some(on) => blueprint.support(power_switch(on)),
        None => blueprint
            .support(power_from_level(level, range))
            .remember_level(set_id, range.0),
    })
}

/// `ct`: color temperature with optional dimmer and switch
pub(super) fn ct(roles: &Roles<'_>) -> Result<Blueprint> {
    let blueprint = Blueprint::new(ControlKind::Ct).support(color_temperature(roles)?);
    Ok(with_dimmer_and_power(blueprint, roles))
}

/// `hue`: separate hue / saturation / brightness states
pub(super) fn hue(roles: &Roles<'_>) -> Result<Blueprint> {
    let mut parts = vec![("hue".to_string(), roles.require("hue")?.to_string())];
    if let Some(sat) = roles.id("sat") {
        parts.push(("saturation".to_string(), sat.to_string()));
    }
    if let Some(dimmer) = roles.id("dimmer") {
        parts.push(("brightness".to_string(), dimmer.to_string()));
    }

    let encoding = ColorEncoding::Hsb {
        saturation_max: roles.range("sat", (0.0, 100.0)).1,
        brightness_max: roles.range("dimmer", (0.0, 100.0)).1,
    };

    let blueprint = Blueprint::new(ControlKind::Hue).support(color(Backing::Components(parts), encoding));
    Ok(with_color_extras(blueprint, roles))
}

/// `rgb`: separate red / green / blue (/ white) channel states
pub(super) fn rgb(roles: &Roles<'_>) -> Result<Blueprint> {
    let mut parts = Vec::new();
    for (component, role) in [("red", "red"), ("green", "green"), ("blue", "blue")] {
        parts.push((component.to_string(), roles.require(role)?.to_string()));
    }
    let white = roles.id("white");
    if let Some(white) = white {
        parts.push(("white".to_string(), white.to_string()));
    }

    let encoding = ColorEncoding::Rgb {
        max: roles.range("red", (0.0, 255.0)).1,
        white: white.is_some(),
    };

    let blueprint = Blueprint::new(ControlKind::Rgb).support(color(Backing::Components(parts), encoding));
    Ok(with_color_extras(blueprint, roles))
}

/// `rgbSingle` / `rgbwSingle`: one hex string state
pub(super) fn rgb_single(roles: &Roles<'_>, kind: ControlKind) -> Result<Blueprint> {
    let white = kind == ControlKind::RgbwSingle;
    let role = if white { "rgbw" } else { "rgb" };

    let blueprint = Blueprint::new(kind).support(color(
        roles.state(role)?,
        ColorEncoding::Hex { white },
    ));
    Ok(with_color_extras(blueprint, roles))
}

fn color(backing: Backing, encoding: ColorEncoding) -> Capability {
    Capability::new(
        CapabilityKind::ColorController,
        vec![Property::new(PropertyKind::Color, backing, Conversion::Color(encoding))],
    )
}

fn color_temperature(roles: &Roles<'_>) -> Result<Capability> {
    let id = roles.require("temperature")?;
    let meta = roles.meta("temperature");

    let unit = roles.unit("temperature").map(str::to_ascii_lowercase);
    let mireds = match unit.as_deref() {
        Some("mired" | "mireds") => true,
        Some("k") => false,
        _ => meta.and_then(|m| m.max).is_some_and(|max| max <= 1000.0),
    };

    let property = Property::new(
        PropertyKind::ColorTemperatureInKelvin,
        Backing::state(id),
        Conversion::Kelvin { mireds },
    )
    .with_range(meta.and_then(|m| m.min), meta.and_then(|m| m.max));

    Ok(Capability::new(CapabilityKind::ColorTemperatureController, vec![property]))
}

/// Optional color temperature, dimmer and switch of a color light
fn with_color_extras(blueprint: Blueprint, roles: &Roles<'_>) -> Blueprint {
    let blueprint = blueprint.support_opt(color_temperature(roles).ok());
    with_dimmer_and_power(blueprint, roles)
}

/// Optional `dimmer` and `on` roles; with a dimmer but no switch, power is
/// derived from the dimmer level
fn with_dimmer_and_power(blueprint: Blueprint, roles: &Roles<'_>) -> Blueprint {
    let dimmer = roles.id("dimmer").map(|id| {
        let range = roles.range("dimmer", (0.0, 100.0));
        (id, Backing::state(id), range)
    });

    let blueprint = match &dimmer {
        Some((_, backing, range)) => blueprint.support(percent_capability(
            CapabilityKind::BrightnessController,
            PropertyKind::Brightness,
            backing.clone(),
            *range,
        )),
        None => blueprint,
    };

    match (roles.optional_backing("on", "on_actual"), dimmer) {
        (Some(on), _) => blueprint.support(power_switch(on)),
        (None, Some((id, backing, range))) => blueprint
            .support(power_from_level(backing, range))
            .remember_level(id, range.0),
        (None, None) => blueprint,
    }
}
