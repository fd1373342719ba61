//! Account linking grants

use crate::protocol::Directive;
use crate::response::AlexaResponse;

/// Answer `Alexa.Authorization.AcceptGrant`
///
/// Grants are acknowledged without exchanging the code; events are delivered
/// through the transport, which owns its own credentials.
#[must_use]
pub fn accept_grant(directive: &Directive) -> AlexaResponse {
    let has_code = directive
        .payload
        .pointer("/grant/code")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|code| !code.is_empty());
    tracing::info!(has_code, "accepting authorization grant");

    AlexaResponse::accept_grant(directive)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn grant_is_acknowledged_without_endpoint() {
        let directive = Directive::new(
            "Alexa.Authorization",
            "AcceptGrant",
            None,
            json!({"grant": {"type": "OAuth2.AuthorizationCode", "code": "abc"}}),
        )
        .with_correlation_token("corr");

        let value = accept_grant(&directive).to_value();
        assert_eq!(value["event"]["header"]["namespace"], "Alexa.Authorization");
        assert_eq!(value["event"]["header"]["correlationToken"], "corr");
        assert!(value["event"].get("endpoint").is_none());
    }
}
