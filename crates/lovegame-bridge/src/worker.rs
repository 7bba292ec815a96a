// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded worker pool for operation execution.
//
// Operations run on Tokio's blocking pool, capped at `max_workers` threads.
// Jobs beyond the cap queue inside Tokio until a thread frees up. A panic
// inside a job is caught on the worker and turned into an
// `OPERATION_PANICKED` failure; the job's state still comes back to `done`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use lovegame_core::codes;
use lovegame_core::error::{BridgeError, Result};
use lovegame_core::types::Outcome;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{Instrument, Span, debug, error, info};

/// Owns the runtime that hosts the blocking pool.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(BridgeError::WorkerPool("max_workers must be at least 1".into()));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_workers)
            .thread_name("lovegame-worker")
            .enable_time()
            .build()
            .map_err(|e| BridgeError::WorkerPool(format!("build runtime: {e}")))?;
        let handle = runtime.handle().clone();

        info!(max_workers, "worker pool started");
        Ok(Self {
            runtime: Some(runtime),
            handle,
            max_workers,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `job` on a worker with mutable access to `state`, then hand the
    /// state and the job's outcome to `done`.
    ///
    /// Returns immediately. `done` runs on a runtime thread, never on the
    /// caller's, inside the caller's current span. If the pool shuts down
    /// before the job finishes, `state` and `done` are dropped without
    /// `done` being called.
    pub fn submit<T, J, D>(&self, state: T, job: J, done: D)
    where
        T: Send + 'static,
        J: FnOnce(&mut T) -> Outcome + Send + 'static,
        D: FnOnce(T, Outcome) + Send + 'static,
    {
        let span = Span::current();
        let worker_span = span.clone();
        self.handle.spawn(
            async move {
                let joined = tokio::task::spawn_blocking(move || {
                    let _entered = worker_span.enter();
                    let mut state = state;
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&mut state)))
                        .unwrap_or_else(panicked);
                    (state, outcome)
                })
                .await;

                match joined {
                    Ok((state, outcome)) => done(state, outcome),
                    Err(e) => debug!(error = %e, "worker job cancelled"),
                }
            }
            .instrument(span),
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Never block the owning thread waiting for stragglers.
            runtime.shutdown_background();
            debug!("worker pool shut down");
        }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> Outcome {
    let reason = panic_message(payload);
    error!(reason = %reason, "operation panicked on worker");
    Outcome::failure(
        codes::OPERATION_PANICKED,
        format!("operation panicked: {reason}"),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use lovegame_core::types::Value;

    #[test]
    fn job_runs_off_the_submitting_thread() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.max_workers(), 2);
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();

        pool.submit(
            None::<std::thread::ThreadId>,
            move |worker| {
                *worker = Some(std::thread::current().id());
                Outcome::success(Value::Bool(true))
            },
            move |worker, outcome| tx.send((worker, outcome)).unwrap(),
        );

        let (worker, outcome) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, Outcome::success(true));
        assert!(worker.is_some());
        assert_ne!(worker, Some(caller));
    }

    #[test]
    fn panics_become_failures() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.submit(
            0u32,
            |attempts| {
                *attempts += 1;
                panic!("boom")
            },
            move |attempts, outcome| tx.send((attempts, outcome)).unwrap(),
        );

        // The state survives the panic and still reaches `done`.
        let (attempts, outcome) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(outcome.code(), Some(codes::OPERATION_PANICKED));
        match outcome {
            Outcome::Failure(e) => assert!(e.message.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(BridgeError::WorkerPool(_))));
    }
}
