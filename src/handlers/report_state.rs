//! Synchronous `StateReport` answers

use crate::device::Device;
use crate::protocol::Directive;
use crate::response::{AlexaResponse, DirectiveError};

/// Answer `Alexa.ReportState` with the device's merged state
///
/// An endpoint advertising reportable properties that yields none is
/// reported unreachable.
pub async fn report_state(directive: &Directive, device: &mut Device) -> AlexaResponse {
    let properties = device.report_state().await;

    let reportable = device
        .capabilities()
        .iter()
        .flat_map(|c| c.properties())
        .any(|p| p.kind().is_reportable());

    if properties.is_empty() && reportable {
        tracing::warn!(endpoint_id = %device.id(), "no property could be read");
        return AlexaResponse::error(
            directive,
            &DirectiveError::EndpointUnreachable(format!("no state available for {}", device.id())),
        );
    }

    AlexaResponse::state_report(directive, &properties)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::controls::Control;
    use crate::platform::{DetectedControl, MemoryStateStore};

    fn lamp(store: &Arc<MemoryStateStore>) -> Device {
        let detected = DetectedControl::new("light").with_state("set", "lamp.on");
        let control = Control::from_detected(&detected, store.clone()).unwrap();
        Device::new("Lamp", vec![control], false)
    }

    #[tokio::test]
    async fn reports_current_values() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.on", json!(true));
        let mut device = lamp(&store);

        let directive = Directive::new("Alexa", "ReportState", Some("Lamp"), json!({}))
            .with_correlation_token("corr");
        let value = report_state(&directive, &mut device).await.to_value();

        assert_eq!(value["event"]["header"]["name"], "StateReport");
        assert_eq!(value["event"]["header"]["correlationToken"], "corr");
        assert_eq!(value["context"]["properties"][0]["name"], "powerState");
        assert_eq!(value["context"]["properties"][0]["value"], "ON");
    }

    #[tokio::test]
    async fn unreadable_store_is_unreachable() {
        let store = Arc::new(MemoryStateStore::new());
        store.fail_reads(true);
        let mut device = lamp(&store);

        let directive = Directive::new("Alexa", "ReportState", Some("Lamp"), json!({}));
        let response = report_state(&directive, &mut device).await;

        assert!(response.is_error());
        assert_eq!(response.payload()["type"], "ENDPOINT_UNREACHABLE");
    }
}
