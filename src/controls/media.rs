//! Speakers

use crate::capabilities::{Capability, CapabilityKind};
use crate::properties::{Conversion, Property, PropertyKind};
use crate::Result;

use super::roles::Roles;
use super::{Blueprint, ControlKind};

/// `volume` / `volumeGroup`: numeric `set`, optional boolean `mute`
pub(super) fn speaker(roles: &Roles<'_>, kind: ControlKind) -> Result<Blueprint> {
    let (min, max) = roles.range("set", (0.0, 100.0));

    let mut properties = vec![
        Property::new(
            PropertyKind::Volume,
            roles.backing("set", "actual")?,
            Conversion::Percent { min, max },
        )
        .with_range(Some(min), Some(max)),
    ];
    if let Some(mute) = roles.optional_backing("mute", "mute_actual") {
        properties.push(Property::new(PropertyKind::Muted, mute, Conversion::Identity));
    }

    Ok(Blueprint::new(kind).support(Capability::new(CapabilityKind::Speaker, properties)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::controls::Control;
    use crate::platform::{DetectedControl, MemoryStateStore};
    use crate::protocol::Directive;

    #[tokio::test]
    async fn adjust_volume_reads_signed_step() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("tv.volume", json!(20));
        let detected = DetectedControl::new("volume")
            .with_state("set", "tv.volume")
            .with_state("mute", "tv.mute");
        let mut control = Control::from_detected(&detected, store.clone()).unwrap();

        let adjust = Directive::new("Alexa.Speaker", "AdjustVolume", Some("TV"), json!({"volume": -30}));
        let reported = control.handle(&adjust).await.unwrap();
        assert_eq!(reported[0].value, json!(0));

        let mute = Directive::new("Alexa.Speaker", "SetMute", Some("TV"), json!({"mute": true}));
        control.handle(&mute).await.unwrap();
        assert_eq!(store.value("tv.mute"), Some(json!(true)));
    }
}
