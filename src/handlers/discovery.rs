//! Endpoint discovery and the licensed reporting window

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::Config;
use crate::device::Device;
use crate::protocol::Directive;
use crate::response::AlexaResponse;

const REPORTING_FLAGS: [&str; 2] = ["proactivelyReported", "retrievable"];

/// Answer `Alexa.Discovery.Discover`
///
/// At most `config.max_endpoints` endpoints are listed; the rest are logged
/// and left out entirely. Once the licensed window has passed at `now`, every
/// reporting flag in the payload is cleared so the assistant polls instead.
pub fn discover<'a>(
    directive: &Directive,
    devices: impl IntoIterator<Item = &'a Device>,
    config: &Config,
    now: DateTime<Utc>,
) -> AlexaResponse {
    let mut endpoints = Vec::new();

    for (index, device) in devices.into_iter().enumerate() {
        if index >= config.max_endpoints {
            tracing::warn!(
                endpoint_id = %device.id(),
                max_endpoints = config.max_endpoints,
                "too many endpoints, skipping"
            );
            continue;
        }

        match serde_json::to_value(device.discovery_entry(config)) {
            Ok(entry) => endpoints.push(entry),
            Err(e) => tracing::warn!(endpoint_id = %device.id(), error = %e, "failed to render endpoint"),
        }
    }

    if config.is_expired(now) {
        tracing::warn!("license expired, disabling proactive reporting");
        for endpoint in &mut endpoints {
            disable_reporting(endpoint);
        }
    }

    tracing::info!(endpoints = endpoints.len(), "discovery answered");
    AlexaResponse::discovery(directive, endpoints)
}

fn disable_reporting(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                if REPORTING_FLAGS.contains(&key.as_str()) && entry.is_boolean() {
                    *entry = Value::Bool(false);
                } else {
                    disable_reporting(entry);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(disable_reporting),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::controls::Control;
    use crate::platform::{DetectedControl, MemoryStateStore};

    fn device(name: &str) -> Device {
        let store = Arc::new(MemoryStateStore::new());
        let detected = DetectedControl::new("dimmer").with_state("set", &format!("{name}.level"));
        let control = Control::from_detected(&detected, store).unwrap();
        Device::new(name, vec![control], false)
    }

    fn discover_directive() -> Directive {
        Directive::new("Alexa.Discovery", "Discover", None, json!({"scope": {"type": "BearerToken"}}))
    }

    fn any_flag_set(value: &Value) -> bool {
        match value {
            Value::Object(map) => map.iter().any(|(key, entry)| {
                (REPORTING_FLAGS.contains(&key.as_str()) && entry == &json!(true)) || any_flag_set(entry)
            }),
            Value::Array(items) => items.iter().any(any_flag_set),
            _ => false,
        }
    }

    #[test]
    fn lists_endpoints_with_reporting_enabled() {
        let devices = [device("Lamp"), device("Desk")];
        let response = discover(&discover_directive(), &devices, &Config::default(), Utc::now());
        let payload = response.payload();

        assert_eq!(payload["endpoints"].as_array().unwrap().len(), 2);
        assert_eq!(payload["endpoints"][0]["endpointId"], "Lamp");
        assert!(any_flag_set(payload));
    }

    #[test]
    fn caps_endpoint_count() {
        let devices = [device("A"), device("B"), device("C")];
        let config = Config {
            max_endpoints: 2,
            ..Config::default()
        };

        let response = discover(&discover_directive(), &devices, &config, Utc::now());
        let ids: Vec<&str> = response.payload()["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["endpointId"].as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn expired_license_clears_every_flag() {
        let now = Utc::now();
        let devices = [device("Lamp")];
        let config = Config {
            valid_till: Some(now - Duration::days(1)),
            ..Config::default()
        };

        let response = discover(&discover_directive(), &devices, &config, now);
        assert!(!any_flag_set(response.payload()));
        assert_eq!(
            response.payload()["endpoints"][0]["capabilities"][1]["properties"]["retrievable"],
            json!(false)
        );
    }
}
