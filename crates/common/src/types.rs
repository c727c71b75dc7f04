//! The message value exchanged between transports and modules.

use serde::{Deserialize, Serialize};

/// A single text message as seen by the transport.
///
/// Messages are immutable once received; the command engine works on its own
/// copy of `body`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender address, usually an E.164 phone number.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Text body.
    pub body: String,
    /// The transport's original payload, when it kept one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Message {
    pub fn new(from: impl Into<String>, to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: body.into(),
            raw: None,
        }
    }

    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_payload_is_omitted_when_absent() {
        let msg = Message::new("+15550001", "+15550002", "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"from": "+15550001", "to": "+15550002", "body": "hi"})
        );
    }

    #[test]
    fn deserializes_without_raw() {
        let msg: Message =
            serde_json::from_str(r#"{"from":"a","to":"b","body":"c"}"#).unwrap();
        assert_eq!(msg, Message::new("a", "b", "c"));
    }
}
