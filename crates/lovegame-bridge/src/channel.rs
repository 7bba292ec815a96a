// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named method channel: the platform-agnostic half of every adapter.
//
// Adapters translate host call objects into `(method, Value)` and host
// result callbacks into a `Reply`, then call `MethodChannel::handle` on the
// owning context. The handler is installed by posting onto the owning
// context after the host engine is up, so calls that race ahead of setup
// are answered with not-implemented, the same as a host channel with no
// handler attached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lovegame_core::BridgeConfig;
use lovegame_core::error::Result;
use lovegame_core::types::{Invocation, Outcome, Value};
use tracing::{debug, info};

use crate::deliverer::{Responder, ResultDeliverer};
use crate::dispatcher::Dispatcher;
use crate::registry::OperationRegistry;
use crate::traits::{OwningContext, Reply};
use crate::worker::WorkerPool;

pub struct MethodChannel {
    name: String,
    dispatcher: Dispatcher,
    context: Arc<dyn OwningContext>,
    installed: Arc<AtomicBool>,
}

impl MethodChannel {
    /// Build the channel and its worker pool. The handler starts
    /// uninstalled; call [`MethodChannel::install`].
    pub fn new(
        config: &BridgeConfig,
        registry: OperationRegistry,
        context: Arc<dyn OwningContext>,
    ) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.max_workers)?;
        let deliverer = ResultDeliverer::new(Arc::clone(&context));

        debug!(channel = %config.channel_name, "method channel created");
        Ok(Self {
            name: config.channel_name.clone(),
            dispatcher: Dispatcher::new(registry, pool, deliverer),
            context,
            installed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Channel built with the built-in operations.
    pub fn with_builtin(config: &BridgeConfig, context: Arc<dyn OwningContext>) -> Result<Self> {
        Self::new(config, OperationRegistry::with_builtin(config), context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Schedule handler installation on the owning context.
    pub fn install(&self) -> Result<()> {
        let installed = Arc::clone(&self.installed);
        let name = self.name.clone();
        self.context.post(Box::new(move || {
            installed.store(true, Ordering::Release);
            info!(channel = %name, "method call handler installed");
        }))
    }

    /// Detach the handler. Calls in flight still get their outcome;
    /// new calls are answered with not-implemented.
    pub fn uninstall(&self) {
        if self.installed.swap(false, Ordering::AcqRel) {
            info!(channel = %self.name, "method call handler removed");
        }
    }

    /// Entry point for the transport. Call on the owning context.
    pub fn handle(&self, method: &str, arguments: Option<Value>, reply: impl Reply) {
        let invocation = Invocation::new(method, arguments);

        if !self.is_installed() {
            debug!(id = %invocation.id, method, "call before handler installed");
            self.respond(&invocation, reply, Outcome::NotImplemented);
            return;
        }

        self.dispatcher.dispatch(invocation, Box::new(reply));
    }

    /// Answer a call the transport could not turn into an invocation
    /// (for example an undecodable message). Still delivered through the
    /// owning context.
    pub fn reject(&self, method: &str, reply: impl Reply, outcome: Outcome) {
        let invocation = Invocation::new(method, None);
        self.respond(&invocation, reply, outcome);
    }

    fn respond(&self, invocation: &Invocation, reply: impl Reply, outcome: Outcome) {
        Responder::new(
            invocation.id,
            Box::new(reply),
            self.dispatcher.deliverer().clone(),
        )
        .reject(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::main_loop::MainQueue;
    use crate::operations::GET_SOME_DATA;

    fn channel(queue: &MainQueue) -> MethodChannel {
        MethodChannel::with_builtin(&BridgeConfig::default(), Arc::new(queue.handle())).unwrap()
    }

    fn sink() -> (Arc<Mutex<Vec<Outcome>>>, impl Reply) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let reply_sink = Arc::clone(&outcomes);
        (outcomes, move |o: Outcome| reply_sink.lock().unwrap().push(o))
    }

    #[test]
    fn installation_is_deferred_to_the_owning_loop() {
        let queue = MainQueue::new();
        let channel = channel(&queue);

        channel.install().unwrap();
        assert!(!channel.is_installed());
        queue.pump();
        assert!(channel.is_installed());
    }

    #[test]
    fn calls_before_install_are_not_implemented() {
        let queue = MainQueue::new();
        let channel = channel(&queue);
        let (outcomes, reply) = sink();

        channel.handle(GET_SOME_DATA, None, reply);
        queue.pump();
        assert_eq!(*outcomes.lock().unwrap(), vec![Outcome::NotImplemented]);
    }

    #[test]
    fn installed_channel_dispatches() {
        let queue = MainQueue::new();
        let channel = channel(&queue);
        channel.install().unwrap();
        queue.pump();

        let (outcomes, reply) = sink();
        channel.handle(GET_SOME_DATA, None, reply);
        assert!(queue.run_until(Duration::from_secs(5), || !outcomes.lock().unwrap().is_empty()));
        assert!(outcomes.lock().unwrap()[0].is_success());
    }

    #[test]
    fn uninstall_stops_new_calls() {
        let queue = MainQueue::new();
        let channel = channel(&queue);
        channel.install().unwrap();
        queue.pump();
        channel.uninstall();

        let (outcomes, reply) = sink();
        channel.handle(GET_SOME_DATA, None, reply);
        queue.pump();
        assert_eq!(*outcomes.lock().unwrap(), vec![Outcome::NotImplemented]);
    }

    #[test]
    fn invalid_config_is_refused() {
        let queue = MainQueue::new();
        let config = BridgeConfig {
            max_workers: 0,
            ..BridgeConfig::default()
        };
        assert!(MethodChannel::with_builtin(&config, Arc::new(queue.handle())).is_err());
    }
}
