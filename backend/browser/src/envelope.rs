//! Marionette message envelopes.
//!
//! Steady-state messages are 4-element JSON arrays:
//!
//! | Direction | slot 0 | slot 1 | slot 2 | slot 3 |
//! |-----------|--------|--------|--------|--------|
//! | command   | `0` | correlation id | command name | params object |
//! | response  | reply-to | response id | `null` or error object | result object or `null` |
//!
//! The first frame of a connection is different: a flat handshake object
//! such as `{"applicationType":"gecko","marionetteProtocol":3}`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError, ProtocolError};

/// Handshake field announcing the protocol version.
pub const PROTOCOL_VERSION_FIELD: &str = "marionetteProtocol";

const APPLICATION_TYPE_FIELD: &str = "applicationType";
const COMMAND_MARKER: u64 = 0;

/// Metadata announced by the remote end right after connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeInfo {
    pub protocol_version: u64,
    pub application_type: Option<String>,
    pub raw: Map<String, Value>,
}

/// A decoded incoming frame. The shape is decided once, here.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// The one-time handshake object.
    Handshake(HandshakeInfo),
    /// A response without an error.
    Success {
        reply_to: u64,
        id: u64,
        payload: Map<String, Value>,
    },
    /// A response carrying a remote error; its result slot is discarded.
    Error {
        reply_to: u64,
        id: u64,
        error: ProtocolError,
    },
    /// A command-shaped envelope (slot 2 is a command name).
    Command {
        id: u64,
        name: String,
        params: Map<String, Value>,
    },
}

/// Serialize a command envelope `[0, id, name, params]`.
pub fn encode_command<P>(name: &str, params: &P, id: u64) -> Result<Vec<u8>, EncodeError>
where
    P: Serialize + ?Sized,
{
    let params = match serde_json::to_value(params)? {
        Value::Object(map) => map,
        _ => {
            return Err(EncodeError::ParamsNotObject {
                command: name.to_string(),
            })
        }
    };
    let envelope = (COMMAND_MARKER, id, name, params);
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode one incoming frame payload.
pub fn decode_incoming(bytes: &[u8]) -> Result<Incoming, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::InvalidJson)?;
    match value {
        Value::Object(map) => decode_handshake(map).map(Incoming::Handshake),
        Value::Array(slots) => decode_envelope(slots),
        other => Err(malformed(format!(
            "expected an array or handshake object, got {}",
            type_name(&other)
        ))),
    }
}

fn decode_handshake(raw: Map<String, Value>) -> Result<HandshakeInfo, DecodeError> {
    let protocol_version = match raw.get(PROTOCOL_VERSION_FIELD) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            malformed(format!("{PROTOCOL_VERSION_FIELD} is not a non-negative integer: {n}"))
        })?,
        Some(other) => {
            return Err(malformed(format!(
                "{PROTOCOL_VERSION_FIELD} must be an integer, got {}",
                type_name(other)
            )))
        }
        None => {
            return Err(malformed(format!(
                "object frame without {PROTOCOL_VERSION_FIELD}"
            )))
        }
    };
    let application_type = raw
        .get(APPLICATION_TYPE_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(HandshakeInfo {
        protocol_version,
        application_type,
        raw,
    })
}

fn decode_envelope(slots: Vec<Value>) -> Result<Incoming, DecodeError> {
    let [slot0, slot1, slot2, slot3]: [Value; 4] = slots
        .try_into()
        .map_err(|slots: Vec<Value>| {
            malformed(format!("expected 4 slots, got {}", slots.len()))
        })?;

    let reply_to = integer_slot(&slot0, 0)?;
    let id = integer_slot(&slot1, 1)?;

    match slot2 {
        Value::String(name) if !name.is_empty() => Ok(Incoming::Command {
            id,
            name,
            params: object_slot(slot3)?,
        }),
        Value::Object(err) if !err.is_empty() => Ok(Incoming::Error {
            reply_to,
            id,
            error: protocol_error(&err),
        }),
        Value::Null | Value::String(_) | Value::Object(_) => success(reply_to, id, slot3),
        other => Err(malformed(format!(
            "slot 2 must be null, a command name or an error object, got {}",
            type_name(&other)
        ))),
    }
}

fn success(reply_to: u64, id: u64, result: Value) -> Result<Incoming, DecodeError> {
    Ok(Incoming::Success {
        reply_to,
        id,
        payload: object_slot(result)?,
    })
}

fn protocol_error(err: &Map<String, Value>) -> ProtocolError {
    let field = |name: &str| {
        err.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    ProtocolError::new(
        field("error").unwrap_or_default(),
        field("message"),
        field("stacktrace"),
    )
}

fn integer_slot(value: &Value, index: usize) -> Result<u64, DecodeError> {
    value
        .as_u64()
        .ok_or_else(|| malformed(format!("slot {index} must be a non-negative integer")))
}

fn object_slot(value: Value) -> Result<Map<String, Value>, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(malformed(format!(
            "slot 3 must be an object or null, got {}",
            type_name(&other)
        ))),
    }
}

fn malformed(detail: String) -> DecodeError {
    DecodeError::MalformedEnvelope(detail)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<Incoming, DecodeError> {
        decode_incoming(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn encodes_four_slot_command() {
        let bytes = encode_command("WebDriver:Navigate", &json!({"url": "https://example.com"}), 7)
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!([0, 7, "WebDriver:Navigate", {"url": "https://example.com"}])
        );
    }

    #[test]
    fn command_round_trips_through_decode() {
        let params = json!({
            "script": "return arguments[0] + 'ü';",
            "args": [1, "two", null, {"nested": [true]}],
            "scriptTimeout": 10
        });
        let bytes = encode_command("WebDriver:ExecuteScript", &params, 42).unwrap();
        match decode_incoming(&bytes).unwrap() {
            Incoming::Command { id, name, params: decoded } => {
                assert_eq!(id, 42);
                assert_eq!(name, "WebDriver:ExecuteScript");
                assert_eq!(Value::Object(decoded), params);
            }
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn empty_params_round_trip() {
        let bytes = encode_command("WebDriver:GetTitle", &Map::new(), 1).unwrap();
        assert_eq!(bytes, br#"[0,1,"WebDriver:GetTitle",{}]"#);
    }

    #[test]
    fn rejects_non_object_params() {
        for params in [json!([1, 2]), json!("url"), json!(null), json!(3)] {
            let err = encode_command("WebDriver:Navigate", &params, 1).unwrap_err();
            assert!(matches!(err, EncodeError::ParamsNotObject { .. }));
        }
    }

    #[test]
    fn decodes_gecko_handshake() {
        let incoming =
            decode_incoming(br#"{"applicationType":"gecko","marionetteProtocol":3}"#).unwrap();
        let Incoming::Handshake(info) = incoming else {
            panic!("expected handshake, got {incoming:?}");
        };
        assert_eq!(info.protocol_version, 3);
        assert_eq!(info.application_type.as_deref(), Some("gecko"));
        assert_eq!(info.raw.len(), 2);
    }

    #[test]
    fn object_without_protocol_version_is_malformed() {
        let err = decode(json!({"applicationType": "gecko"})).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));

        let err = decode(json!({"marionetteProtocol": "3"})).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn decodes_success_response() {
        let incoming = decode(json!([1, 42, null, {"value": {"element-6066-11e4-a52e-4f735466cecf": "0acd"}}]))
            .unwrap();
        let Incoming::Success { reply_to, id, payload } = incoming else {
            panic!("expected success, got {incoming:?}");
        };
        assert_eq!((reply_to, id), (1, 42));
        assert_eq!(payload["value"]["element-6066-11e4-a52e-4f735466cecf"], "0acd");
    }

    #[test]
    fn null_result_defaults_to_empty_object() {
        let incoming = decode(json!([1, 2, null, null])).unwrap();
        assert!(matches!(incoming, Incoming::Success { payload, .. } if payload.is_empty()));
    }

    #[test]
    fn empty_error_slot_counts_as_success() {
        for slot2 in [json!({}), json!("")] {
            let incoming = decode(json!([1, 2, slot2, {"ok": true}])).unwrap();
            assert!(matches!(incoming, Incoming::Success { .. }));
        }
    }

    #[test]
    fn decodes_error_response_without_exposing_result() {
        let incoming = decode(json!([
            1,
            1,
            {
                "error": "invalid session id",
                "message": "WebDriver session does not exist, or is not active",
                "stacktrace": "RemoteError@chrome://remote/content/shared/RemoteError.sys.mjs:8:8\n"
            },
            {"value": "should not be visible"}
        ]))
        .unwrap();
        let Incoming::Error { error, .. } = incoming else {
            panic!("expected error, got {incoming:?}");
        };
        let rendered = error.to_string();
        assert!(rendered.contains("invalid session id"));
        assert!(rendered.contains("WebDriver session does not exist, or is not active"));
        assert!(!rendered.contains("should not be visible"));
    }

    #[test]
    fn error_object_without_kind_is_unknown_error() {
        let incoming = decode(json!([1, 3, {"message": "something broke"}, null])).unwrap();
        let Incoming::Error { error, .. } = incoming else {
            panic!("expected error, got {incoming:?}");
        };
        assert_eq!(error.kind(), crate::error::UNKNOWN_ERROR_KIND);
        assert_eq!(error.detail(), Some("something broke"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = decode_incoming(b"[1, 2, null").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        let cases = [
            json!([1, 2, null]),
            json!([1, 2, null, {}, 5]),
            json!(["1", 2, null, {}]),
            json!([1, -2, null, {}]),
            json!([1, 2, 17, {}]),
            json!([1, 2, null, [1]]),
            json!("just a string"),
            json!(12),
        ];
        for case in cases {
            let err = decode(case.clone()).unwrap_err();
            assert!(
                matches!(err, DecodeError::MalformedEnvelope(_)),
                "{case} gave {err:?}"
            );
        }
    }
}
