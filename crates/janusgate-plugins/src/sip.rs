//! Adapter for the SIP call-signaling plugin.

use janusgate_client::{AdapterResult, HandleContext, Jsep, PluginAdapter, PluginEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plugin identifier claimed by [`SipAdapter`].
pub const PLUGIN: &str = "janus.plugin.sip";

/// Extracts the user portion of a `sip:user@host` URI.
///
/// Returns the empty string when the `sip:` prefix is missing or the
/// remainder is not exactly `user@host` (no `@`, or more than one).
pub fn user_part(uri: &str) -> &str {
    let Some(rest) = uri.strip_prefix("sip:") else {
        return "";
    };
    let mut fields = rest.split('@');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(user), Some(_), None) => user,
        _ => "",
    }
}

/// A request to the SIP plugin.
#[derive(Debug, Clone, Serialize)]
pub struct SipRequest {
    request: &'static str,
    /// Our SIP identity, e.g. `sip:652345@proxy.example.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Registration secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Display name presented to the callee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// SIP proxy to register against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Callee URI (`call` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// SIP status code (`decline` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl SipRequest {
    fn new(request: &'static str) -> Self {
        Self {
            request,
            username: None,
            secret: None,
            display_name: None,
            proxy: None,
            uri: None,
            code: None,
        }
    }

    /// Registers the given identity with its registrar.
    pub fn register(username: impl Into<String>) -> Self {
        let mut req = Self::new("register");
        req.username = Some(username.into());
        req
    }

    /// Places a call to the given URI. Sent together with an SDP offer.
    pub fn call(uri: impl Into<String>) -> Self {
        let mut req = Self::new("call");
        req.uri = Some(uri.into());
        req
    }

    /// Accepts an incoming call. Sent together with an SDP answer.
    pub fn accept() -> Self {
        Self::new("accept")
    }

    /// Declines an incoming call with the given SIP status code
    /// (e.g. 486 Busy Here).
    pub fn decline(code: i64) -> Self {
        let mut req = Self::new("decline");
        req.code = Some(code);
        req
    }

    /// Hangs up the current call.
    pub fn hangup() -> Self {
        Self::new("hangup")
    }

    /// Drops the current registration.
    pub fn unregister() -> Self {
        Self::new("unregister")
    }

    /// Builder: set the registration secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Builder: set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Builder: set the proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// The plugin payload of a SIP response or event.
#[derive(Debug, Clone, Deserialize)]
pub struct SipResponse {
    /// Payload discriminant, usually `event`.
    pub sip: String,
    /// The actual signaling result, absent on bare confirmations.
    #[serde(default)]
    pub result: Option<SipResult>,
    /// SIP call id of the dialog this payload belongs to.
    #[serde(default)]
    pub call_id: Option<String>,
}

/// Signaling result carried inside a SIP payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SipResult {
    /// Sub-event name: `registered`, `calling`, `incomingcall`,
    /// `accepted`, `hangup`, ...
    pub event: String,
    /// Peer or own URI, depending on the sub-event.
    #[serde(default)]
    pub username: Option<String>,
    /// Peer display name.
    #[serde(default)]
    pub displayname: Option<String>,
    /// SIP status code (`hangup`).
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable reason (`hangup`).
    #[serde(default)]
    pub reason: Option<String>,
}

/// Decodes SIP payloads and tracks the registration and call state.
///
/// `registered` records the identity's user part under `identity` and
/// sets `registered`; `incomingcall` records the caller's user part
/// under `caller`; `hangup` clears it.
pub struct SipAdapter;

impl PluginAdapter for SipAdapter {
    fn plugin(&self) -> &str {
        PLUGIN
    }

    fn decode(
        &self,
        context: &mut HandleContext,
        data: &Value,
        jsep: Option<&Jsep>,
    ) -> AdapterResult<Option<PluginEvent>> {
        let resp: SipResponse = serde_json::from_value(data.clone())?;
        let Some(result) = &resp.result else {
            // Bare confirmation, nothing to deliver.
            return Ok(None);
        };
        match result.event.as_str() {
            "registered" => {
                if let Some(username) = &result.username {
                    context.set("identity", user_part(username));
                }
                context.set("registered", true);
            }
            "incomingcall" => {
                if let Some(username) = &result.username {
                    context.set("caller", user_part(username));
                }
            }
            "hangup" => {
                context.remove("caller");
            }
            other => tracing::debug!(event = other, "unhandled signaling sub-event"),
        }
        let name = result.event.clone();
        Ok(Some(PluginEvent::new(name, resp).with_jsep(jsep.cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_part_extraction() {
        assert_eq!(user_part("sip:652345@proxy.example.com"), "652345");
        assert_eq!(user_part("652345@proxy.example.com"), "");
        assert_eq!(user_part("sip:652345"), "");
        assert_eq!(user_part(""), "");
        // Exactly one separator; anything else is malformed.
        assert_eq!(user_part("sip:a@b@c"), "");
    }

    #[test]
    fn register_wire_shape() {
        let req = SipRequest::register("sip:652345@proxy.example.com")
            .with_secret("hunter2")
            .with_proxy("sip:proxy.example.com");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["request"], "register");
        assert_eq!(value["username"], "sip:652345@proxy.example.com");
        assert_eq!(value["secret"], "hunter2");
        assert_eq!(value["proxy"], "sip:proxy.example.com");
        assert!(value.get("uri").is_none());
    }

    #[test]
    fn call_wire_shape() {
        let req = SipRequest::call("sip:100@proxy.example.com");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["request"], "call");
        assert_eq!(value["uri"], "sip:100@proxy.example.com");
    }

    #[test]
    fn decline_and_unregister_wire_shapes() {
        let req = SipRequest::decline(486);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"request": "decline", "code": 486}));

        let req = SipRequest::unregister();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"request": "unregister"}));
    }

    #[test]
    fn registered_event_records_identity() {
        let mut context = HandleContext::new();
        let data = json!({
            "sip": "event",
            "result": {"event": "registered", "username": "sip:652345@proxy.example.com"}
        });

        let event = SipAdapter.decode(&mut context, &data, None).unwrap().unwrap();
        assert_eq!(event.name(), "registered");
        assert_eq!(context.get_str("identity"), "652345");
        assert!(context.get_bool("registered"));
    }

    #[test]
    fn incomingcall_records_and_hangup_clears_caller() {
        let mut context = HandleContext::new();
        let incoming = json!({
            "sip": "event",
            "call_id": "a84b4c76e66710",
            "result": {"event": "incomingcall", "username": "sip:100@proxy.example.com"}
        });
        SipAdapter
            .decode(&mut context, &incoming, None)
            .unwrap()
            .unwrap();
        assert_eq!(context.get_str("caller"), "100");

        let hangup = json!({
            "sip": "event",
            "result": {"event": "hangup", "code": 200, "reason": "BYE"}
        });
        let event = SipAdapter
            .decode(&mut context, &hangup, None)
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), "hangup");
        assert_eq!(context.get_str("caller"), "");
    }

    #[test]
    fn bare_confirmation_yields_nothing() {
        let mut context = HandleContext::new();
        let data = json!({"sip": "ack"});
        assert!(
            SipAdapter
                .decode(&mut context, &data, None)
                .unwrap()
                .is_none()
        );
    }
}
