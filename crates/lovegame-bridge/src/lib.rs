// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Lovegame: asynchronous method-dispatch bridge.
//!
//! One platform-agnostic core (registry, dispatcher, worker pool, result
//! deliverer) behind thin native adapters. Each adapter turns host channel
//! calls into `Invocation`s and host result callbacks into `Reply`s; the
//! core guarantees exactly one `Outcome` per call, delivered on the thread
//! that owns the channel.

pub mod channel;
pub mod codec;
pub mod deliverer;
pub mod dispatcher;
pub mod main_loop;
pub mod operations;
pub mod registry;
pub mod traits;
pub mod worker;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;

pub use channel::MethodChannel;
pub use codec::JsonMethodCodec;
pub use dispatcher::Dispatcher;
pub use main_loop::{MainHandle, MainQueue};
pub use registry::OperationRegistry;
pub use traits::{ArgumentShape, Operation, OwningContext, PlatformChannel, Reply};

/// Name of the platform whose adapter this build carries.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "ios")]
    {
        "iOS"
    }
    #[cfg(target_os = "android")]
    {
        "Android"
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        // DESKTOP/CI: JSON stub adapter driven by the host harness.
        "Desktop (stub)"
    }
}
