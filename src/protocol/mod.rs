//! Wire types of the voice-assistant smart-home protocol
//!
//! Directives arrive as JSON, either bare (`{header, endpoint, payload}`) or
//! wrapped in a `directive` object. Responses and events are built by
//! [`crate::response::AlexaResponse`].

mod endpoint_id;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub use endpoint_id::{MAX_ENDPOINT_ID_LEN, endpoint_id, is_valid_endpoint_id};

use crate::{Error, Result};

/// Protocol payload version
pub const PAYLOAD_VERSION: &str = "3";

/// Namespaces handled outside of any single endpoint
pub mod namespaces {
    /// Base interface (responses, `ReportState`, `ChangeReport`)
    pub const ALEXA: &str = "Alexa";
    /// Endpoint discovery
    pub const DISCOVERY: &str = "Alexa.Discovery";
    /// Account linking grants
    pub const AUTHORIZATION: &str = "Alexa.Authorization";
}

/// Directive and event header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Interface the directive belongs to (e.g. `Alexa.PowerController`)
    pub namespace: String,
    /// Directive name (e.g. `TurnOn`)
    pub name: String,
    /// Message id; generated when missing
    #[serde(default)]
    pub message_id: String,
    /// Token echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    /// Always `"3"`
    #[serde(default = "default_payload_version")]
    pub payload_version: String,
    /// Capability instance for multi-instance interfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

fn default_payload_version() -> String {
    PAYLOAD_VERSION.to_string()
}

/// Bearer token scope attached to endpoint directives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope type, `BearerToken`
    #[serde(rename = "type")]
    pub kind: String,
    /// Access token
    #[serde(default)]
    pub token: String,
}

/// Endpoint addressed by a directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    /// Authorization scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Endpoint id from discovery
    pub endpoint_id: String,
    /// Opaque cookie from discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

/// Inbound directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    /// Directive header
    pub header: Header,
    /// Target endpoint; absent for discovery and grants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<DirectiveEndpoint>,
    /// Directive payload
    #[serde(default)]
    pub payload: Value,
    /// Snapshot of the endpoint's reported state, attached to directives for
    /// toggle endpoints before they fan out to the controls
    #[serde(skip)]
    pub current_state: Option<Vec<ReportedProperty>>,
}

impl Directive {
    /// Parse a directive from JSON, accepting the `{"directive": {...}}` wrapper
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe a directive
    pub fn from_value(mut value: Value) -> Result<Self> {
        if let Some(inner) = value.get_mut("directive") {
            value = inner.take();
        }

        let mut directive: Self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidDirective(e.to_string()))?;

        if directive.header.message_id.is_empty() {
            directive.header.message_id = uuid::Uuid::new_v4().to_string();
        }

        Ok(directive)
    }

    /// Build a directive from its parts
    #[must_use]
    pub fn new(namespace: &str, name: &str, endpoint_id: Option<&str>, payload: Value) -> Self {
        Self {
            header: Header {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message_id: uuid::Uuid::new_v4().to_string(),
                correlation_token: None,
                payload_version: PAYLOAD_VERSION.to_string(),
                instance: None,
            },
            endpoint: endpoint_id.map(|id| DirectiveEndpoint {
                scope: None,
                endpoint_id: id.to_string(),
                cookie: None,
            }),
            payload,
            current_state: None,
        }
    }

    /// Set the capability instance
    #[must_use]
    pub fn with_instance(mut self, instance: &str) -> Self {
        self.header.instance = Some(instance.to_string());
        self
    }

    /// Set the correlation token
    #[must_use]
    pub fn with_correlation_token(mut self, token: &str) -> Self {
        self.header.correlation_token = Some(token.to_string());
        self
    }

    /// Id of the addressed endpoint
    #[must_use]
    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.endpoint_id.as_str())
    }

    /// Whether this directive has the given namespace and name
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.header.namespace == namespace && self.header.name == name
    }

    /// Look up a top-level payload field
    #[must_use]
    pub fn payload_field(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Look up a reported value in the attached state snapshot
    #[must_use]
    pub fn current_value(&self, namespace: &str, name: &str) -> Option<&Value> {
        self.current_state
            .as_ref()?
            .iter()
            .find(|p| p.namespace == namespace && p.name == name)
            .map(|p| &p.value)
    }
}

/// One reported property value
///
/// Equality ignores sample time, which is only attached when rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedProperty {
    /// Interface namespace
    pub namespace: String,
    /// Property name
    pub name: String,
    /// Capability instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Value in assistant shape
    pub value: Value,
}

impl ReportedProperty {
    /// Whether both entries describe the same property
    #[must_use]
    pub fn same_property(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.instance == other.instance
    }

    /// Render as a context property sampled at `time`
    #[must_use]
    pub fn to_context(&self, time: DateTime<Utc>) -> Value {
        let mut entry = json!({
            "namespace": self.namespace,
            "name": self.name,
            "value": self.value,
            "timeOfSample": time.to_rfc3339_opts(SecondsFormat::Millis, true),
            "uncertaintyInMilliseconds": 0,
        });
        if let Some(instance) = &self.instance {
            entry["instance"] = json!(instance);
        }
        entry
    }
}
