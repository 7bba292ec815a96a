// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Seams between the platform-agnostic dispatch core and its surroundings.
//
// The core never names a platform type. Each native adapter supplies an
// `OwningContext` (how to get back onto the UI loop) and a `Reply` (how to
// answer the host channel), and exposes itself as a `PlatformChannel`.

use lovegame_core::error::Result;
use lovegame_core::types::{Invocation, MethodError, Outcome, Value};

use crate::channel::MethodChannel;

/// Unit of work posted onto the owning execution context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The single logical thread allowed to touch the transport.
///
/// Implementations only enqueue; the task runs later, when the owning loop
/// gets to it. `post` must never run the task inline, even when called from
/// the owning thread itself, so deliveries keep their posting order.
pub trait OwningContext: Send + Sync + 'static {
    fn post(&self, task: Task) -> Result<()>;
}

/// Caller handle for one invocation. Consumed by the single delivery.
pub trait Reply: Send + 'static {
    fn send(self: Box<Self>, outcome: Outcome);
}

impl<F> Reply for F
where
    F: FnOnce(Outcome) + Send + 'static,
{
    fn send(self: Box<Self>, outcome: Outcome) {
        (*self)(outcome)
    }
}

/// Argument shape an operation requires before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentShape {
    /// Anything, including no arguments at all.
    Any,
    /// A string-keyed map.
    Map,
}

impl ArgumentShape {
    pub fn accepts(self, arguments: Option<&Value>) -> bool {
        match self {
            Self::Any => true,
            Self::Map => matches!(arguments, Some(Value::Map(_))),
        }
    }
}

/// A registered method implementation.
///
/// `execute` runs on a worker and may block for as long as it needs.
pub trait Operation: Send + Sync + 'static {
    /// Checked by the dispatcher on the owning context. A mismatch is
    /// answered with `INVALID_ARGUMENTS` and never reaches a worker.
    fn argument_shape(&self) -> ArgumentShape {
        ArgumentShape::Any
    }

    fn execute(&self, invocation: &Invocation) -> std::result::Result<Value, MethodError>;
}

/// A native transport adapter wired to a [`MethodChannel`].
pub trait PlatformChannel {
    /// Human-readable platform name (e.g. "Android", "iOS").
    fn platform_name(&self) -> &str;

    fn channel(&self) -> &MethodChannel;
}
