// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatcher: routes an invocation to its operation and wires the outcome
// back to the caller.
//
// `dispatch` is called on the owning context and returns as soon as the
// work is scheduled. Unknown methods and wrong argument shapes are answered
// without touching a worker.

use std::sync::Arc;

use lovegame_core::types::{Invocation, InvocationState, MethodError, Outcome};
use tracing::{debug, info, instrument};

use crate::deliverer::{Responder, ResultDeliverer};
use crate::registry::OperationRegistry;
use crate::traits::Reply;
use crate::worker::WorkerPool;

pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    pool: WorkerPool,
    deliverer: ResultDeliverer,
}

impl Dispatcher {
    pub fn new(registry: OperationRegistry, pool: WorkerPool, deliverer: ResultDeliverer) -> Self {
        info!(
            methods = ?registry.methods(),
            max_workers = pool.max_workers(),
            "dispatcher ready"
        );
        Self {
            registry: Arc::new(registry),
            pool,
            deliverer,
        }
    }

    pub fn deliverer(&self) -> &ResultDeliverer {
        &self.deliverer
    }

    /// Route `invocation` and arrange for exactly one outcome to reach
    /// `reply` on the owning context.
    #[instrument(skip_all, fields(id = %invocation.id, method = %invocation.method))]
    pub fn dispatch(&self, invocation: Invocation, reply: Box<dyn Reply>) {
        let mut responder = Responder::new(invocation.id, reply, self.deliverer.clone());
        responder.advance(InvocationState::Validating);

        let Some(operation) = self.registry.get(&invocation.method) else {
            info!("method not implemented");
            responder.reject(Outcome::NotImplemented);
            return;
        };

        if !operation.argument_shape().accepts(invocation.arguments.as_ref()) {
            debug!(
                arguments = invocation.arguments.as_ref().map_or("none", |v| v.type_name()),
                "arguments rejected"
            );
            responder.reject(Outcome::Failure(MethodError::invalid_arguments()));
            return;
        }

        responder.advance(InvocationState::DispatchingToWorker);
        self.pool.submit(
            responder,
            move |responder| {
                responder.advance(InvocationState::Executing);
                Outcome::from(operation.execute(&invocation))
            },
            Responder::complete,
        );
    }
}
