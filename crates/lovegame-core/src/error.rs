// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the bridge.
//
// These are infrastructure errors. Caller mistakes (bad arguments, unknown
// methods) never become a `BridgeError`; they are answered with an `Outcome`.

use thiserror::Error;

use crate::codes;
use crate::types::Outcome;

/// Top-level error type for bridge infrastructure.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Setup --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("method already registered: {0}")]
    DuplicateMethod(String),

    // -- Execution --
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("owning execution context is closed")]
    OwningContextClosed,

    // -- Wire --
    #[error("malformed method call: {0}")]
    Codec(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),
}

impl BridgeError {
    /// The failure code reported to the caller when this error ends an
    /// invocation.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WorkerPool(_) | Self::OwningContextClosed => codes::WORKER_UNAVAILABLE,
            Self::Codec(_) | Self::Serialization(_) => codes::MALFORMED_CALL,
            Self::Config(_)
            | Self::DuplicateMethod(_)
            | Self::Io(_)
            | Self::Bridge(_) => codes::INTERNAL,
        }
    }

    /// Convert into the failure outcome delivered to the caller.
    pub fn to_outcome(&self) -> Outcome {
        Outcome::failure(self.code(), self.to_string())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_errors_map_to_worker_unavailable() {
        let err = BridgeError::WorkerPool("runtime gone".into());
        assert_eq!(err.code(), codes::WORKER_UNAVAILABLE);

        let outcome = err.to_outcome();
        assert_eq!(outcome.code(), Some(codes::WORKER_UNAVAILABLE));
    }

    #[test]
    fn codec_errors_map_to_malformed_call() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(BridgeError::from(json_err).code(), codes::MALFORMED_CALL);
        assert_eq!(BridgeError::Codec("no method".into()).code(), codes::MALFORMED_CALL);
    }
}
