// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error codes carried in the `code` slot of a failure triple.
//
// The shell matches on these strings, so they are part of the channel
// contract and must not change between releases.

/// Arguments were not the keyed map the method expects.
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
/// Message paired with [`INVALID_ARGUMENTS`].
pub const INVALID_ARGUMENTS_MESSAGE: &str = "Arguments are invalid";

/// `performAction` was called without a string `type`.
pub const INVALID_TYPE: &str = "INVALID_TYPE";
/// Message paired with [`INVALID_TYPE`].
pub const INVALID_TYPE_MESSAGE: &str = "Action type is missing or invalid";

/// The operation panicked on its worker.
pub const OPERATION_PANICKED: &str = "OPERATION_PANICKED";

/// The worker pool could not run the operation (shut down or saturated
/// beyond recovery). The operation never produced an outcome of its own.
pub const WORKER_UNAVAILABLE: &str = "WORKER_UNAVAILABLE";

/// The incoming message could not be decoded into a method call.
pub const MALFORMED_CALL: &str = "MALFORMED_CALL";

/// Catch-all for bridge faults that have no more specific code.
pub const INTERNAL: &str = "INTERNAL";
