// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the channel bridge: dynamic values, invocations,
// and the single terminal outcome each invocation produces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codes;

// ---------------------------------------------------------------------------
// Dynamic values
// ---------------------------------------------------------------------------

/// Loosely-typed payload crossing the channel.
///
/// Mirrors what the host codecs can carry. Nothing about the shape of a
/// `Value` is assumed; callers check with the `as_*` accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in log fields.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up `key` if this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

/// Collect `(key, value)` pairs into a [`Value::Map`].
impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                // u64 beyond i64::MAX and all non-integers land here.
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::from(i),
            // NaN and infinities have no JSON form.
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Self::Number)
                .unwrap_or(Self::Null),
            Value::String(s) => Self::String(s),
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(map) => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocations
// ---------------------------------------------------------------------------

/// Unique identifier for an invocation, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single named request received over the channel.
///
/// Immutable once constructed; consumed when its outcome is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: InvocationId,
    pub method: String,
    /// `None` when the caller sent no arguments (or an explicit null).
    pub arguments: Option<Value>,
    pub received_at: DateTime<Utc>,
}

impl Invocation {
    pub fn new(method: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            id: InvocationId::new(),
            method: method.into(),
            arguments: arguments.filter(|v| !v.is_null()),
            received_at: Utc::now(),
        }
    }

    /// The arguments as a keyed map, if that is what was sent.
    pub fn argument_map(&self) -> Option<&BTreeMap<String, Value>> {
        self.arguments.as_ref().and_then(Value::as_map)
    }

    /// Look up a single argument by key.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.argument_map().and_then(|m| m.get(key))
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Structured error triple `(code, message, details)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl MethodError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_arguments() -> Self {
        Self::new(codes::INVALID_ARGUMENTS, codes::INVALID_ARGUMENTS_MESSAGE)
    }

    pub fn invalid_type() -> Self {
        Self::new(codes::INVALID_TYPE, codes::INVALID_TYPE_MESSAGE)
    }
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MethodError {}

/// The single terminal result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success(Value),
    Failure(MethodError),
    /// No operation is registered under the method name. Signals a
    /// caller/handler version mismatch rather than a failed call.
    NotImplemented,
}

impl Outcome {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success(value.into())
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure(MethodError::new(code, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure code, if this is a failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Failure(e) => Some(&e.code),
            _ => None,
        }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
            Self::NotImplemented => "not_implemented",
        }
    }
}

impl From<std::result::Result<Value, MethodError>> for Outcome {
    fn from(r: std::result::Result<Value, MethodError>) -> Self {
        match r {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Failure(e),
        }
    }
}

/// Lifecycle of one invocation. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InvocationState {
    Received,
    Validating,
    DispatchingToWorker,
    /// Answered without touching a worker (unknown method, bad arguments,
    /// handler not installed). Goes straight to `Delivered`.
    RejectedImmediately,
    Executing,
    OutcomeReady,
    Delivered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_arguments_are_absent() {
        let inv = Invocation::new("getSomeData", Some(Value::Null));
        assert!(inv.arguments.is_none());
        assert!(inv.argument_map().is_none());
    }

    #[test]
    fn argument_lookup_requires_a_map() {
        let inv = Invocation::new("performAction", Some(Value::from("not-a-map")));
        assert!(inv.argument("type").is_none());

        let inv = Invocation::new(
            "performAction",
            Some([("type", "like")].into_iter().collect()),
        );
        assert_eq!(inv.argument("type").and_then(Value::as_str), Some("like"));
    }

    #[test]
    fn json_numbers_keep_integer_precision() {
        let v = Value::from(serde_json::json!({ "n": 7, "x": 1.5, "big": u64::MAX }));
        assert_eq!(v.get("n"), Some(&Value::Int(7)));
        assert_eq!(v.get("x"), Some(&Value::Float(1.5)));
        assert!(matches!(v.get("big"), Some(Value::Float(_))));
    }

    #[test]
    fn untagged_serde_reads_plain_json() {
        let v: Value = serde_json::from_str(r#"{"success": true, "action": "like"}"#).unwrap();
        assert_eq!(v.get("success"), Some(&Value::Bool(true)));
        assert_eq!(v.get("action").and_then(Value::as_str), Some("like"));
    }

    #[test]
    fn non_finite_floats_become_json_null() {
        let json: serde_json::Value = Value::Float(f64::NAN).into();
        assert!(json.is_null());
    }

    #[test]
    fn not_implemented_is_not_a_failure() {
        let outcome = Outcome::NotImplemented;
        assert!(!outcome.is_success());
        assert_eq!(outcome.code(), None);
        assert_eq!(outcome.kind(), "not_implemented");
    }

    #[test]
    fn states_are_ordered() {
        assert!(InvocationState::Received < InvocationState::Validating);
        assert!(InvocationState::Executing < InvocationState::OutcomeReady);
        assert!(InvocationState::RejectedImmediately < InvocationState::Delivered);
    }
}
