// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result delivery back onto the owning execution context.
//
// Every outcome, including ones produced on the owning thread itself, goes
// through `OwningContext::post`. A `Responder` wraps the caller's `Reply`
// so that exactly one outcome is delivered per invocation:
//
// - `Responder::complete` and `Responder::reject` consume the responder,
//   so a second delivery does not type-check.
// - The responder rides along to the owning context and records
//   `Delivered` there, just before the reply is sent.
// - Dropping a responder that never delivered sends a
//   `WORKER_UNAVAILABLE` failure instead of leaving the caller waiting.

use std::sync::Arc;

use lovegame_core::codes;
use lovegame_core::types::{InvocationId, InvocationState, Outcome};
use tracing::{debug, error, warn};

use crate::traits::{OwningContext, Reply, Task};

/// Posts outcomes onto the owning context.
#[derive(Clone)]
pub struct ResultDeliverer {
    context: Arc<dyn OwningContext>,
}

impl ResultDeliverer {
    pub fn new(context: Arc<dyn OwningContext>) -> Self {
        Self { context }
    }

    /// Schedule `reply.send(outcome)` on the owning context.
    fn deliver(&self, id: InvocationId, reply: Box<dyn Reply>, outcome: Outcome) {
        let kind = outcome.kind();
        self.schedule(
            id,
            kind,
            Box::new(move || {
                debug!(id = %id, outcome = kind, "delivering outcome");
                reply.send(outcome);
            }),
        );
    }

    fn schedule(&self, id: InvocationId, kind: &'static str, task: Task) {
        if let Err(e) = self.context.post(task) {
            // Nobody is left to answer on; the transport went down with
            // the loop.
            error!(id = %id, outcome = kind, error = %e, "outcome could not be scheduled");
        }
    }
}

/// Single-use handle that owns the caller's reply for one invocation.
pub struct Responder {
    id: InvocationId,
    reply: Option<Box<dyn Reply>>,
    deliverer: ResultDeliverer,
    state: InvocationState,
}

impl Responder {
    pub fn new(id: InvocationId, reply: Box<dyn Reply>, deliverer: ResultDeliverer) -> Self {
        Self {
            id,
            reply: Some(reply),
            deliverer,
            state: InvocationState::Received,
        }
    }

    /// Move to `next`. Transitions never go backwards.
    pub fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            next > self.state,
            "invocation {} moved backwards: {:?} -> {:?}",
            self.id,
            self.state,
            next
        );
        debug!(id = %self.id, from = ?self.state, to = ?next, "invocation state");
        self.state = next;
    }

    /// Answer the invocation immediately, without a worker.
    pub fn reject(mut self, outcome: Outcome) {
        self.advance(InvocationState::RejectedImmediately);
        self.post(outcome);
    }

    /// Hand the operation's outcome to the owning context.
    pub fn complete(mut self, outcome: Outcome) {
        self.advance(InvocationState::OutcomeReady);
        self.post(outcome);
    }

    fn post(self, outcome: Outcome) {
        let deliverer = self.deliverer.clone();
        let id = self.id;
        let kind = outcome.kind();
        deliverer.schedule(id, kind, Box::new(move || self.send(outcome)));
    }

    /// Runs on the owning context.
    fn send(mut self, outcome: Outcome) {
        self.advance(InvocationState::Delivered);
        if let Some(reply) = self.reply.take() {
            debug!(id = %self.id, outcome = outcome.kind(), "delivering outcome");
            reply.send(outcome);
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            warn!(id = %self.id, state = ?self.state, "responder dropped without an outcome");
            self.deliverer.deliver(
                self.id,
                reply,
                Outcome::failure(
                    codes::WORKER_UNAVAILABLE,
                    "operation ended without producing an outcome",
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::main_loop::MainQueue;

    fn collecting_reply(sink: &Arc<Mutex<Vec<Outcome>>>) -> Box<dyn Reply> {
        let sink = Arc::clone(sink);
        Box::new(move |outcome: Outcome| sink.lock().unwrap().push(outcome))
    }

    #[test]
    fn delivery_waits_for_the_owning_loop() {
        let queue = MainQueue::new();
        let deliverer = ResultDeliverer::new(Arc::new(queue.handle()));
        let sink = Arc::new(Mutex::new(Vec::new()));

        let responder = Responder::new(InvocationId::new(), collecting_reply(&sink), deliverer);
        responder.complete(Outcome::success(true));

        assert!(sink.lock().unwrap().is_empty());
        assert_eq!(queue.pump(), 1);
        assert_eq!(*sink.lock().unwrap(), vec![Outcome::success(true)]);
    }

    #[test]
    fn dropped_responder_still_answers_once() {
        let queue = MainQueue::new();
        let deliverer = ResultDeliverer::new(Arc::new(queue.handle()));
        let sink = Arc::new(Mutex::new(Vec::new()));

        drop(Responder::new(InvocationId::new(), collecting_reply(&sink), deliverer));

        assert_eq!(queue.pump(), 1);
        let outcomes = sink.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].code(), Some(codes::WORKER_UNAVAILABLE));
    }

    #[test]
    fn rejected_invocation_skips_worker_states() {
        let queue = MainQueue::new();
        let deliverer = ResultDeliverer::new(Arc::new(queue.handle()));
        let sink = Arc::new(Mutex::new(Vec::new()));

        let mut responder =
            Responder::new(InvocationId::new(), collecting_reply(&sink), deliverer);
        responder.advance(InvocationState::Validating);
        responder.reject(Outcome::NotImplemented);

        queue.pump();
        assert_eq!(*sink.lock().unwrap(), vec![Outcome::NotImplemented]);
    }

    #[test]
    fn worker_path_walks_every_state() {
        let queue = MainQueue::new();
        let deliverer = ResultDeliverer::new(Arc::new(queue.handle()));
        let sink = Arc::new(Mutex::new(Vec::new()));

        let mut responder =
            Responder::new(InvocationId::new(), collecting_reply(&sink), deliverer);
        for state in [
            InvocationState::Validating,
            InvocationState::DispatchingToWorker,
            InvocationState::Executing,
        ] {
            responder.advance(state);
            assert_eq!(responder.state, state);
        }
        responder.complete(Outcome::success(1i64));

        // OutcomeReady -> Delivered happens when the owning loop runs it.
        assert!(sink.lock().unwrap().is_empty());
        assert_eq!(queue.pump(), 1);
        assert_eq!(*sink.lock().unwrap(), vec![Outcome::success(1i64)]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "moved backwards")]
    fn states_never_move_backwards() {
        let queue = MainQueue::new();
        let deliverer = ResultDeliverer::new(Arc::new(queue.handle()));
        let sink = Arc::new(Mutex::new(Vec::new()));

        let mut responder =
            Responder::new(InvocationId::new(), collecting_reply(&sink), deliverer);
        responder.advance(InvocationState::Executing);
        responder.advance(InvocationState::Validating);
    }
}
