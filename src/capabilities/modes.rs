//! Discovery resources of mode-like capabilities

use serde_json::{Value, json};

use crate::properties::ModeMapping;

/// Locale used for text friendly names
pub const LOCALE: &str = "en-US";

/// Friendly-name resource list holding a single text entry
#[must_use]
pub fn text_friendly_names(text: &str) -> Value {
    json!({
        "friendlyNames": [{
            "@type": "text",
            "value": {"text": text, "locale": LOCALE}
        }]
    })
}

/// Friendly-name resource list holding a catalog asset
#[must_use]
pub fn asset_friendly_names(asset_id: &str) -> Value {
    json!({
        "friendlyNames": [{
            "@type": "asset",
            "value": {"assetId": asset_id}
        }]
    })
}

/// `configuration` of a mode controller
#[must_use]
pub fn mode_configuration(modes: &[ModeMapping]) -> Value {
    let supported: Vec<Value> = modes
        .iter()
        .map(|mode| {
            json!({
                "value": mode.alexa,
                "modeResources": text_friendly_names(&mode.label),
            })
        })
        .collect();

    json!({
        "ordered": false,
        "supportedModes": supported,
    })
}

/// `configuration` of a thermostat controller
#[must_use]
pub fn thermostat_configuration(modes: &[ModeMapping]) -> Value {
    let supported: Vec<&str> = modes.iter().map(|m| m.alexa.as_str()).collect();
    json!({
        "supportedModes": supported,
        "supportsScheduling": false,
    })
}

/// Open/close semantics mapping onto two modes of a mode controller
#[must_use]
pub fn open_close_semantics(open_mode: &str, closed_mode: &str) -> Value {
    json!({
        "actionMappings": [
            {
                "@type": "ActionsToDirective",
                "actions": ["Alexa.Actions.Open", "Alexa.Actions.Raise"],
                "directive": {"name": "SetMode", "payload": {"mode": open_mode}}
            },
            {
                "@type": "ActionsToDirective",
                "actions": ["Alexa.Actions.Close", "Alexa.Actions.Lower"],
                "directive": {"name": "SetMode", "payload": {"mode": closed_mode}}
            }
        ],
        "stateMappings": [
            {"@type": "StatesToValue", "states": ["Alexa.States.Open"], "value": open_mode},
            {"@type": "StatesToValue", "states": ["Alexa.States.Closed"], "value": closed_mode}
        ]
    })
}
