//! Read-only sensors and endpoint health

use crate::capabilities::{Capability, CapabilityKind};
use crate::properties::{Backing, Conversion, Property, PropertyKind};
use crate::Result;

use super::roles::Roles;
use super::{Blueprint, ControlKind};

/// `motion`: boolean `actual`
pub(super) fn motion(roles: &Roles<'_>) -> Result<Blueprint> {
    Ok(Blueprint::new(ControlKind::Motion).support(detection(
        CapabilityKind::MotionSensor,
        roles.state("actual")?,
    )))
}

/// `door` / `window`: boolean `actual`, `true` when open
pub(super) fn contact(roles: &Roles<'_>, kind: ControlKind) -> Result<Blueprint> {
    Ok(Blueprint::new(kind).support(detection(
        CapabilityKind::ContactSensor,
        roles.state("actual")?,
    )))
}

/// `Alexa.EndpointHealth` for controls carrying an `unreach` role
pub(super) fn health(roles: &Roles<'_>) -> Option<Capability> {
    roles.id("unreach").map(|id| {
        Capability::new(
            CapabilityKind::EndpointHealth,
            vec![Property::new(
                PropertyKind::Connectivity,
                Backing::state(id),
                Conversion::connectivity(),
            )],
        )
    })
}

fn detection(kind: CapabilityKind, backing: Backing) -> Capability {
    Capability::new(
        kind,
        vec![Property::new(
            PropertyKind::DetectionState,
            backing,
            Conversion::detection(),
        )],
    )
}
