// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop/CI adapter where the native mobile channel is unavailable.
//
// Speaks the JSON method codec over raw byte messages, so a test harness or
// the desktop host can drive the same dispatch core the phones use. The
// owning context is a `MainQueue` the embedder drains.

use std::sync::Arc;

use lovegame_core::BridgeConfig;
use lovegame_core::error::Result;
use lovegame_core::types::Outcome;
use tracing::{error, warn};

use crate::channel::MethodChannel;
use crate::codec::JsonMethodCodec;
use crate::main_loop::MainHandle;
use crate::traits::PlatformChannel;

pub struct StubChannel {
    channel: MethodChannel,
}

impl StubChannel {
    pub fn new(config: &BridgeConfig, main: MainHandle) -> Result<Self> {
        let channel = MethodChannel::with_builtin(config, Arc::new(main))?;
        channel.install()?;
        Ok(Self { channel })
    }

    /// Handle one encoded call. `reply` receives the encoded envelope on
    /// the owning context; an empty envelope means not-implemented.
    pub fn handle_message<R>(&self, message: &[u8], reply: R)
    where
        R: FnOnce(Vec<u8>) + Send + 'static,
    {
        let encode_reply = move |outcome: Outcome| match JsonMethodCodec::encode_outcome(&outcome) {
            Ok(bytes) => reply(bytes),
            Err(e) => {
                error!(error = %e, "reply could not be encoded");
                let fallback = Outcome::failure(e.code(), e.to_string());
                reply(JsonMethodCodec::encode_outcome(&fallback).unwrap_or_default());
            }
        };

        match JsonMethodCodec::decode_method_call(message) {
            Ok((method, arguments)) => self.channel.handle(&method, arguments, encode_reply),
            Err(e) => {
                warn!(error = %e, "undecodable method call");
                self.channel.reject("", encode_reply, e.to_outcome());
            }
        }
    }
}

impl PlatformChannel for StubChannel {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn channel(&self) -> &MethodChannel {
        &self.channel
    }
}
