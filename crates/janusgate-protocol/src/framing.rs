//! JSON framing for the WebSocket transport.
//!
//! The gateway exchanges exactly one JSON object per WebSocket text
//! frame; there is no additional length prefixing or batching.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::ProtocolResult;

/// Encodes a frame to its JSON text form.
///
/// # Example
///
/// ```rust
/// use janusgate_protocol::{ClientRequest, encode_frame};
///
/// let text = encode_frame(&ClientRequest::create()).unwrap();
/// assert!(text.contains(r#""janus":"create""#));
/// ```
pub fn encode_frame<T: Serialize>(frame: &T) -> ProtocolResult<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Decodes a frame from JSON text.
///
/// # Example
///
/// ```rust
/// use janusgate_protocol::{ServerMessage, decode_frame};
///
/// let msg: ServerMessage = decode_frame(r#"{"janus":"ack","transaction":"abcdefghij"}"#).unwrap();
/// assert_eq!(msg.verb(), "ack");
/// ```
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> ProtocolResult<T> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientRequest, ProtocolError, ServerMessage};

    #[test]
    fn roundtrip_through_text() {
        let request = ClientRequest::keepalive(42).with_transaction("abcdefghij".parse().unwrap());
        let text = encode_frame(&request).unwrap();
        assert_eq!(
            text,
            r#"{"janus":"keepalive","transaction":"abcdefghij","session_id":42}"#
        );

        let msg: ServerMessage =
            decode_frame(r#"{"janus":"ack","transaction":"abcdefghij"}"#).unwrap();
        assert_eq!(msg.verb(), "ack");
    }

    #[test]
    fn malformed_text_is_a_serialization_error() {
        let err = decode_frame::<ServerMessage>("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Serialization(_)));
    }
}
