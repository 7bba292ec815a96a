// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON method codec, matching the host framework's JSON channel format.
//
// Call:            {"method": "<name>", "args": <any>}
// Success reply:   [<result>]
// Failure reply:   ["<code>", "<message>", <details>]
// Not implemented: empty reply (zero bytes)

use lovegame_core::error::{BridgeError, Result};
use lovegame_core::types::{MethodError, Outcome, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct WireCall {
    method: String,
    #[serde(default)]
    args: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct WireCallRef<'a> {
    method: &'a str,
    args: serde_json::Value,
}

pub struct JsonMethodCodec;

impl JsonMethodCodec {
    /// Decode a method call. Unknown fields are ignored.
    pub fn decode_method_call(message: &[u8]) -> Result<(String, Option<Value>)> {
        let call: WireCall = serde_json::from_slice(message)?;
        if call.method.is_empty() {
            return Err(BridgeError::Codec("method name is empty".into()));
        }
        Ok((call.method, call.args.map(Value::from).filter(|v| !v.is_null())))
    }

    /// Encode a method call the way the host side frames it.
    pub fn encode_method_call(method: &str, arguments: Option<&Value>) -> Result<Vec<u8>> {
        let args = arguments
            .cloned()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null);
        Ok(serde_json::to_vec(&WireCallRef { method, args })?)
    }

    /// Encode an outcome as a reply envelope.
    pub fn encode_outcome(outcome: &Outcome) -> Result<Vec<u8>> {
        let envelope = match outcome {
            Outcome::Success(v) => serde_json::Value::Array(vec![v.clone().into()]),
            Outcome::Failure(e) => serde_json::Value::Array(vec![
                e.code.clone().into(),
                e.message.clone().into(),
                e.details.clone().map(Into::into).unwrap_or(serde_json::Value::Null),
            ]),
            Outcome::NotImplemented => return Ok(Vec::new()),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Decode a reply envelope back into an outcome.
    pub fn decode_envelope(envelope: &[u8]) -> Result<Outcome> {
        if envelope.is_empty() {
            return Ok(Outcome::NotImplemented);
        }

        let items: Vec<serde_json::Value> = serde_json::from_slice(envelope)?;
        match items.as_slice() {
            [result] => Ok(Outcome::Success(result.clone().into())),
            [serde_json::Value::String(code), message, details] => {
                let message = match message {
                    serde_json::Value::String(m) => m.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                let mut error = MethodError::new(code.clone(), message);
                if !details.is_null() {
                    error = error.with_details(details.clone().into());
                }
                Ok(Outcome::Failure(error))
            }
            other => Err(BridgeError::Codec(format!(
                "envelope must have 1 or 3 elements, got {}",
                other.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovegame_core::codes;

    #[test]
    fn decodes_call_with_map_args() {
        let (method, args) =
            JsonMethodCodec::decode_method_call(br#"{"method":"performAction","args":{"type":"like"}}"#)
                .unwrap();
        assert_eq!(method, "performAction");
        assert_eq!(args.unwrap().get("type").and_then(Value::as_str), Some("like"));
    }

    #[test]
    fn missing_and_null_args_are_absent() {
        let (_, args) = JsonMethodCodec::decode_method_call(br#"{"method":"getSomeData"}"#).unwrap();
        assert!(args.is_none());
        let (_, args) =
            JsonMethodCodec::decode_method_call(br#"{"method":"getSomeData","args":null}"#).unwrap();
        assert!(args.is_none());
    }

    #[test]
    fn encoded_call_decodes_to_the_same_call() {
        let args: Value = [("type", "share")].into_iter().collect();
        let bytes = JsonMethodCodec::encode_method_call("performAction", Some(&args)).unwrap();
        let (method, decoded) = JsonMethodCodec::decode_method_call(&bytes).unwrap();
        assert_eq!(method, "performAction");
        assert_eq!(decoded, Some(args));

        let bytes = JsonMethodCodec::encode_method_call("getSomeData", None).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"method": "getSomeData", "args": null}));
    }

    #[test]
    fn rejects_calls_without_a_method() {
        assert!(JsonMethodCodec::decode_method_call(br#"{"args":1}"#).is_err());
        assert!(JsonMethodCodec::decode_method_call(br#"{"method":""}"#).is_err());
        assert!(JsonMethodCodec::decode_method_call(b"not json").is_err());
    }

    #[test]
    fn failure_envelope_has_null_details() {
        let bytes = JsonMethodCodec::encode_outcome(&Outcome::Failure(MethodError::invalid_type()))
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["INVALID_TYPE", "Action type is missing or invalid", null])
        );
    }

    #[test]
    fn not_implemented_is_an_empty_reply() {
        let bytes = JsonMethodCodec::encode_outcome(&Outcome::NotImplemented).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(JsonMethodCodec::decode_envelope(&bytes).unwrap(), Outcome::NotImplemented);
    }

    #[test]
    fn decodes_failure_envelope() {
        let outcome =
            JsonMethodCodec::decode_envelope(br#"["INVALID_ARGUMENTS","Arguments are invalid",null]"#)
                .unwrap();
        assert_eq!(outcome.code(), Some(codes::INVALID_ARGUMENTS));
    }

    #[test]
    fn two_element_envelope_is_malformed() {
        let err = JsonMethodCodec::decode_envelope(br#"[1,2]"#).unwrap_err();
        assert_eq!(err.code(), codes::MALFORMED_CALL);
    }
}
