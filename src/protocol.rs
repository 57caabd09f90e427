//! Wire protocol: one JSON request and one JSON response per connection.
//!
//! Requests carry an `action` discriminator; the action set is closed.
//! An unrecognized action and an undecodable payload are distinct errors
//! so the daemon can answer with a precise message instead of crashing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;

/// Client → daemon messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Speak { text: String },
    Replay,
    SwitchVoice { voice: String },
    Stop,
    Ping,
}

const KNOWN_ACTIONS: &[&str] = &["speak", "replay", "switch_voice", "stop", "ping"];

impl Request {
    /// Decode a request, classifying failures.
    ///
    /// A payload that parses as JSON and names an action outside the
    /// closed set is `UnknownAction`; everything else undecodable
    /// (bad JSON, wrong discriminator type, missing required fields)
    /// is `InvalidRequest`.
    pub fn decode(raw: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| RequestError::InvalidRequest(format!("not valid JSON: {e}")))?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| RequestError::InvalidRequest("missing 'action' field".into()))?
            .to_string();

        if !KNOWN_ACTIONS.contains(&action.as_str()) {
            return Err(RequestError::UnknownAction(action));
        }

        serde_json::from_value(value)
            .map_err(|e| RequestError::InvalidRequest(format!("bad '{action}' payload: {e}")))
    }

    pub fn encode(&self) -> String {
        // Serialization of these variants cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Daemon → client message. `time` is the synthesis wall-clock duration
/// in seconds, present only on a successful `speak`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            time: None,
        }
    }

    /// Success response for `speak`, reporting elapsed seconds rounded
    /// to two decimals.
    pub fn ok_timed(message: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            time: Some((elapsed_secs * 100.0).round() / 100.0),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            time: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(raw: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(raw).map_err(|e| format!("not UTF-8: {e}"))?;
        serde_json::from_str(text).map_err(|e| format!("{e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_actions() {
        let requests = [
            Request::Speak {
                text: "hello world".into(),
            },
            Request::Replay,
            Request::SwitchVoice {
                voice: "dave".into(),
            },
            Request::Stop,
            Request::Ping,
        ];

        for req in requests {
            let decoded = Request::decode(&req.encode()).unwrap();
            assert_eq!(decoded, req);
        }
    }

    #[test]
    fn wire_shape_matches_protocol() {
        let encoded = Request::Speak {
            text: "hi".into(),
        }
        .encode();
        assert_eq!(encoded, r#"{"action":"speak","text":"hi"}"#);

        let encoded = Request::Ping.encode();
        assert_eq!(encoded, r#"{"action":"ping"}"#);
    }

    #[test]
    fn unknown_action_is_classified() {
        let err = Request::decode(r#"{"action":"shout","text":"hi"}"#).unwrap_err();
        match err {
            RequestError::UnknownAction(name) => assert_eq!(name, "shout"),
            other => panic!("expected UnknownAction, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_invalid_request() {
        let err = Request::decode(r#"{"action":"speak"}"#).unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));

        let err = Request::decode(r#"{"action":"switch_voice"}"#).unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }

    #[test]
    fn garbage_is_invalid_request() {
        for raw in ["", "not json", "42", r#"{"no_action":true}"#, r#"{"action":7}"#] {
            let err = Request::decode(raw).unwrap_err();
            assert!(matches!(err, RequestError::InvalidRequest(_)), "raw: {raw}");
        }
    }

    #[test]
    fn response_time_only_when_present() {
        let ok = Response::ok_timed("Generated in 1.23s", 1.234);
        let json = ok.encode();
        assert!(json.contains(r#""time":1.23"#));

        let err = Response::err("boom");
        assert!(!err.encode().contains("time"));

        let decoded = Response::decode(json.as_bytes()).unwrap();
        assert_eq!(decoded, ok);
    }
}
