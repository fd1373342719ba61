//! Proactive `ChangeReport` events for state the assistant has not heard yet

use crate::device::Device;
use crate::protocol::ReportedProperty;
use crate::response::{AlexaResponse, ChangeCause};

/// State of a device that differs from what the assistant last heard
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    /// Properties whose value changed, or all of them on the first report
    pub changed: Vec<ReportedProperty>,
    /// Properties still holding the reported value
    pub unchanged: Vec<ReportedProperty>,
    snapshot: Vec<ReportedProperty>,
}

/// Compare the device's current state with its last report
///
/// Returns `None` when the snapshot equals the last report, so identical
/// snapshots never produce two notifications. A snapshot that only lost
/// properties still differs; every remaining property is then reported as
/// changed.
pub async fn pending_change(device: &mut Device) -> Option<PendingChange> {
    let snapshot = device.report_state().await;
    if snapshot.is_empty() {
        return None;
    }

    let (changed, unchanged): (Vec<_>, Vec<_>) = match device.last_reported_state() {
        Some(previous) if previous == snapshot.as_slice() => {
            tracing::debug!(endpoint_id = %device.id(), "state unchanged since last report");
            return None;
        }
        Some(previous) => snapshot
            .iter()
            .cloned()
            .partition(|p| !previous.contains(p)),
        None => (snapshot.clone(), Vec::new()),
    };

    let (changed, unchanged) = if changed.is_empty() {
        (unchanged, Vec::new())
    } else {
        (changed, unchanged)
    };

    Some(PendingChange {
        changed,
        unchanged,
        snapshot,
    })
}

/// Build the `ChangeReport` for a pending change and remember it as reported
pub fn change_report(device: &mut Device, change: PendingChange, cause: ChangeCause) -> AlexaResponse {
    let report = AlexaResponse::change_report(device.id(), cause, &change.changed, &change.unchanged);
    tracing::debug!(
        endpoint_id = %device.id(),
        cause = cause.as_str(),
        changed = change.changed.len(),
        "change report"
    );
    device.set_last_reported_state(change.snapshot);
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::controls::Control;
    use crate::platform::{DetectedControl, MemoryStateStore};

    fn dimmer(store: &Arc<MemoryStateStore>) -> Device {
        let detected = DetectedControl::new("dimmer").with_state("set", "lamp.level");
        let control = Control::from_detected(&detected, store.clone()).unwrap();
        Device::new("Lamp", vec![control], false)
    }

    #[tokio::test]
    async fn identical_snapshots_report_once() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.level", json!(40));
        let mut device = dimmer(&store);

        let change = pending_change(&mut device).await.unwrap();
        assert!(change.unchanged.is_empty());
        let _ = change_report(&mut device, change, ChangeCause::PhysicalInteraction);

        assert!(pending_change(&mut device).await.is_none());
    }

    #[tokio::test]
    async fn changed_and_unchanged_are_split() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.level", json!(40));
        let mut device = dimmer(&store);

        let change = pending_change(&mut device).await.unwrap();
        let _ = change_report(&mut device, change, ChangeCause::PhysicalInteraction);

        store.insert("lamp.level", json!(60));
        device.state_changed("lamp.level", Some(&json!(60)));

        let change = pending_change(&mut device).await.unwrap();
        assert_eq!(change.changed.len(), 1);
        assert_eq!(change.changed[0].name, "brightness");
        assert_eq!(change.changed[0].value, json!(60));
        assert_eq!(change.unchanged[0].name, "powerState");

        let report = change_report(&mut device, change, ChangeCause::PhysicalInteraction).to_value();
        assert_eq!(report["event"]["endpoint"]["endpointId"], "Lamp");
        assert_eq!(report["event"]["payload"]["change"]["properties"][0]["value"], 60);
        assert_eq!(report["context"]["properties"][0]["value"], "ON");
    }

    #[tokio::test]
    async fn dropped_property_is_reported() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("hall.on", json!(true));
        store.insert("hall.pir", json!(false));

        let light = DetectedControl::new("light").with_state("set", "hall.on");
        let motion = DetectedControl::new("motion").with_state("actual", "hall.pir");
        let controls = vec![
            Control::from_detected(&light, store.clone()).unwrap(),
            Control::from_detected(&motion, store.clone()).unwrap(),
        ];
        let mut before = Device::new("Hall", controls, false);
        let change = pending_change(&mut before).await.unwrap();
        let _ = change_report(&mut before, change, ChangeCause::PhysicalInteraction);
        let previous = before.last_reported_state().unwrap().to_vec();
        assert!(previous.iter().any(|p| p.name == "detectionState"));

        let mut after = Device::new("Hall", vec![Control::from_detected(&light, store.clone()).unwrap()], false);
        after.set_last_reported_state(previous.clone());

        let change = pending_change(&mut after).await.unwrap();
        assert!(change.changed.iter().any(|p| p.name == "powerState"));
        assert!(change.changed.iter().all(|p| p.name != "detectionState"));
        assert!(change.unchanged.is_empty());

        let _ = change_report(&mut after, change, ChangeCause::PhysicalInteraction);
        let reported = after.last_reported_state().unwrap();
        assert!(reported.len() < previous.len());
        assert!(pending_change(&mut after).await.is_none());
    }
}
