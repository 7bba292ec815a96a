// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in channel operations.
//
// Both are placeholders for real work: they optionally sleep to simulate
// latency, then return a fixed payload.

use std::time::Duration;

use lovegame_core::types::{Invocation, MethodError, Value};
use tracing::debug;

use crate::traits::{ArgumentShape, Operation};

pub const GET_SOME_DATA: &str = "getSomeData";
pub const PERFORM_ACTION: &str = "performAction";

fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        std::thread::sleep(latency);
    }
}

/// `getSomeData`: ignores its arguments and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct GetSomeData {
    pub latency: Duration,
}

impl Operation for GetSomeData {
    fn execute(&self, invocation: &Invocation) -> Result<Value, MethodError> {
        simulate_latency(self.latency);
        debug!(id = %invocation.id, "returning data");
        Ok([("key", "value"), ("status", "success")].into_iter().collect())
    }
}

/// `performAction`: echoes the string `type` argument back.
#[derive(Debug, Clone, Default)]
pub struct PerformAction {
    pub latency: Duration,
}

impl Operation for PerformAction {
    fn argument_shape(&self) -> ArgumentShape {
        ArgumentShape::Map
    }

    fn execute(&self, invocation: &Invocation) -> Result<Value, MethodError> {
        simulate_latency(self.latency);

        let action = invocation
            .argument("type")
            .and_then(Value::as_str)
            .ok_or_else(MethodError::invalid_type)?;

        debug!(id = %invocation.id, action, "action performed");
        Ok(Value::Map(
            [
                ("success".to_owned(), Value::Bool(true)),
                ("action".to_owned(), Value::from(action)),
            ]
            .into_iter()
            .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovegame_core::codes;

    fn args(pairs: &[(&str, Value)]) -> Option<Value> {
        Some(Value::Map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        ))
    }

    #[test]
    fn get_some_data_ignores_arguments() {
        let op = GetSomeData::default();
        let expected: Value = [("key", "value"), ("status", "success")].into_iter().collect();

        for arguments in [None, Some(Value::from("junk")), args(&[("x", Value::Int(1))])] {
            let inv = Invocation::new(GET_SOME_DATA, arguments);
            assert_eq!(op.execute(&inv).unwrap(), expected);
        }
    }

    #[test]
    fn perform_action_echoes_type() {
        let inv = Invocation::new(PERFORM_ACTION, args(&[("type", Value::from("like"))]));
        let value = PerformAction::default().execute(&inv).unwrap();

        assert_eq!(value.get("success"), Some(&Value::Bool(true)));
        assert_eq!(value.get("action").and_then(Value::as_str), Some("like"));
    }

    #[test]
    fn perform_action_without_type_is_invalid_type() {
        let inv = Invocation::new(PERFORM_ACTION, args(&[]));
        let err = PerformAction::default().execute(&inv).unwrap_err();

        assert_eq!(err.code, codes::INVALID_TYPE);
        assert_eq!(err.message, "Action type is missing or invalid");
        assert!(err.details.is_none());
    }

    #[test]
    fn perform_action_with_non_string_type_is_invalid_type() {
        let inv = Invocation::new(PERFORM_ACTION, args(&[("type", Value::Int(3))]));
        let err = PerformAction::default().execute(&inv).unwrap_err();
        assert_eq!(err.code, codes::INVALID_TYPE);
    }

    #[test]
    fn perform_action_requires_a_map() {
        let shape = PerformAction::default().argument_shape();
        assert!(!shape.accepts(Some(&Value::from("not-a-map"))));
        assert!(!shape.accepts(None));
        assert!(shape.accepts(args(&[]).as_ref()));
    }
}
