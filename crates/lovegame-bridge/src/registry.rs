// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation registry: method name -> operation.
//
// Built once during setup and then frozen behind an `Arc` by the
// dispatcher. There is no way to register through the shared handle.

use std::collections::HashMap;
use std::sync::Arc;

use lovegame_core::BridgeConfig;
use lovegame_core::error::{BridgeError, Result};

use crate::operations::{GET_SOME_DATA, GetSomeData, PERFORM_ACTION, PerformAction};
use crate::traits::Operation;

#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `getSomeData` and `performAction`.
    pub fn with_builtin(config: &BridgeConfig) -> Self {
        let latency = config.simulated_latency();
        let mut registry = Self::new();
        registry
            .operations
            .insert(GET_SOME_DATA.to_owned(), Arc::new(GetSomeData { latency }));
        registry
            .operations
            .insert(PERFORM_ACTION.to_owned(), Arc::new(PerformAction { latency }));
        registry
    }

    /// Register `operation` under `name`. Names are unique.
    pub fn register(&mut self, name: &str, operation: impl Operation) -> Result<()> {
        if self.operations.contains_key(name) {
            return Err(BridgeError::DuplicateMethod(name.to_owned()));
        }
        self.operations.insert(name.to_owned(), Arc::new(operation));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_methods_registered() {
        let registry = OperationRegistry::with_builtin(&BridgeConfig::default());
        assert_eq!(registry.methods(), vec!["getSomeData", "performAction"]);
        assert!(registry.get("unknownMethod").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = OperationRegistry::with_builtin(&BridgeConfig::default());
        let err = registry
            .register(GET_SOME_DATA, GetSomeData::default())
            .unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateMethod(name) if name == GET_SOME_DATA));
        assert_eq!(registry.methods().len(), 2);
    }
}
