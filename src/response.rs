//! Response and event envelopes
//!
//! Every outbound message has the shape
//! `{"event": {header, endpoint?, payload}, "context"?: {properties}}`.
//! Endpoint-less messages (discovery, grants) omit `endpoint`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Config;
use crate::protocol::{Directive, Header, PAYLOAD_VERSION, ReportedProperty, Scope, namespaces};

/// Failures surfaced to the assistant as `ErrorResponse`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    /// The backing store failed or no property produced a value
    #[error("endpoint unreachable: {0}")]
    EndpointUnreachable(String),

    /// Admission control rejected the change
    #[error("{0}")]
    Throttling(String),

    /// The control matched the namespace but does not natively handle the directive
    #[error("directive not supported by control")]
    NotSupportedByControl,

    /// No control of the endpoint handles the directive
    #[error("directive not supported by device")]
    NotSupportedByDevice,

    /// The addressed endpoint is not registered
    #[error("endpoint `{0}` does not exist")]
    NonExistingEndpoint(String),
}

impl DirectiveError {
    /// Protocol error type
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::EndpointUnreachable(_) | Self::NonExistingEndpoint(_) => "ENDPOINT_UNREACHABLE",
            Self::Throttling(_) => "THROTTLING_EXCEPTION",
            Self::NotSupportedByControl | Self::NotSupportedByDevice => "INTERNAL_ERROR",
        }
    }
}

/// What triggered a change report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// A directive from the assistant
    VoiceInteraction,
    /// Someone operated the device directly
    PhysicalInteraction,
}

impl ChangeCause {
    /// Protocol cause type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VoiceInteraction => "VOICE_INTERACTION",
            Self::PhysicalInteraction => "PHYSICAL_INTERACTION",
        }
    }
}

/// One endpoint entry of a discovery response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryEndpoint {
    /// Endpoint id
    pub endpoint_id: String,
    /// Manufacturer name
    pub manufacturer_name: String,
    /// Description
    pub description: String,
    /// Friendly name
    pub friendly_name: String,
    /// Display categories, at least one
    pub display_categories: Vec<String>,
    /// Capability fragments
    pub capabilities: Vec<Value>,
    /// Opaque cookie
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

impl DiscoveryEndpoint {
    /// Create an entry with the configured manufacturer and description
    #[must_use]
    pub fn new(endpoint_id: &str, friendly_name: &str, config: &Config) -> Self {
        Self {
            endpoint_id: endpoint_id.to_string(),
            manufacturer_name: config.manufacturer.clone(),
            description: config.description.clone(),
            friendly_name: friendly_name.to_string(),
            display_categories: vec!["OTHER".to_string()],
            capabilities: Vec::new(),
            cookie: None,
        }
    }

    /// Set display categories; an empty list keeps `OTHER`
    #[must_use]
    pub fn with_categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        if !categories.is_empty() {
            self.display_categories = categories.iter().map(|c| c.as_ref().to_string()).collect();
        }
        self
    }

    /// Set capability fragments
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<Value>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Builder of outbound responses and events
#[derive(Debug, Clone, PartialEq)]
pub struct AlexaResponse {
    header: Header,
    endpoint_id: Option<String>,
    scope: Option<Scope>,
    payload: Value,
    context: Option<Vec<Value>>,
}

impl AlexaResponse {
    /// Create a bare event
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            header: Header {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message_id: uuid::Uuid::new_v4().to_string(),
                correlation_token: None,
                payload_version: PAYLOAD_VERSION.to_string(),
                instance: None,
            },
            endpoint_id: None,
            scope: None,
            payload: json!({}),
            context: None,
        }
    }

    /// Create an event answering `directive`: correlation token and endpoint are echoed
    #[must_use]
    pub fn reply(directive: &Directive, namespace: &str, name: &str) -> Self {
        let mut response = Self::new(namespace, name);
        response.header.correlation_token = directive.header.correlation_token.clone();
        if let Some(endpoint) = &directive.endpoint {
            response.endpoint_id = Some(endpoint.endpoint_id.clone());
            response.scope = endpoint.scope.clone();
        }
        response
    }

    /// Successful `Alexa.Response` carrying the changed properties in its context
    #[must_use]
    pub fn success(directive: &Directive, properties: &[ReportedProperty]) -> Self {
        let mut response = Self::reply(directive, namespaces::ALEXA, "Response");
        response.context = Some(Vec::new());
        response.add_properties(properties, Utc::now());
        response
    }

    /// `Alexa.ErrorResponse`
    #[must_use]
    pub fn error(directive: &Directive, error: &DirectiveError) -> Self {
        let mut response = Self::reply(directive, namespaces::ALEXA, "ErrorResponse");
        response.payload = json!({
            "type": error.error_type(),
            "message": error.to_string(),
        });
        response
    }

    /// `Alexa.StateReport`
    #[must_use]
    pub fn state_report(directive: &Directive, properties: &[ReportedProperty]) -> Self {
        let mut response = Self::reply(directive, namespaces::ALEXA, "StateReport");
        response.context = Some(Vec::new());
        response.add_properties(properties, Utc::now());
        response
    }

    /// `Alexa.Discovery.Discover.Response`
    #[must_use]
    pub fn discovery(directive: &Directive, endpoints: Vec<Value>) -> Self {
        let mut response = Self::new(namespaces::DISCOVERY, "Discover.Response");
        response.header.correlation_token = directive.header.correlation_token.clone();
        response.payload = json!({ "endpoints": endpoints });
        response
    }

    /// `Alexa.ChangeReport` for an endpoint
    #[must_use]
    pub fn change_report(
        endpoint_id: &str,
        cause: ChangeCause,
        changed: &[ReportedProperty],
        unchanged: &[ReportedProperty],
    ) -> Self {
        let time = Utc::now();
        let mut response = Self::new(namespaces::ALEXA, "ChangeReport");
        response.endpoint_id = Some(endpoint_id.to_string());
        response.payload = json!({
            "change": {
                "cause": {"type": cause.as_str()},
                "properties": changed.iter().map(|p| p.to_context(time)).collect::<Vec<_>>(),
            }
        });
        response.context = Some(Vec::new());
        response.add_properties(unchanged, time);
        response
    }

    /// `Alexa.Authorization.AcceptGrant.Response`
    #[must_use]
    pub fn accept_grant(directive: &Directive) -> Self {
        let mut response = Self::new(namespaces::AUTHORIZATION, "AcceptGrant.Response");
        response.header.correlation_token = directive.header.correlation_token.clone();
        response
    }

    /// `Alexa.SceneController.ActivationStarted`
    #[must_use]
    pub fn activation_started(directive: &Directive) -> Self {
        let mut response = Self::reply(directive, "Alexa.SceneController", "ActivationStarted");
        response.payload = json!({
            "cause": {"type": ChangeCause::VoiceInteraction.as_str()},
            "timestamp": timestamp(Utc::now()),
        });
        response.context = Some(Vec::new());
        response
    }

    /// Append context properties sampled at `time`
    pub fn add_properties(&mut self, properties: &[ReportedProperty], time: DateTime<Utc>) {
        self.context
            .get_or_insert_with(Vec::new)
            .extend(properties.iter().map(|p| p.to_context(time)));
    }

    /// Event header
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Event payload
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Whether this is an `ErrorResponse`
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.header.name == "ErrorResponse"
    }

    /// Render the envelope
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut event = json!({
            "header": self.header,
            "payload": self.payload,
        });

        if let Some(endpoint_id) = &self.endpoint_id {
            let mut endpoint = json!({ "endpointId": endpoint_id });
            if let Some(scope) = &self.scope {
                endpoint["scope"] = json!(scope);
            }
            event["endpoint"] = endpoint;
        }

        let mut envelope = json!({ "event": event });
        if let Some(properties) = &self.context {
            envelope["context"] = json!({ "properties": properties });
        }
        envelope
    }
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
