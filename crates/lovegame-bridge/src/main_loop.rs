// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-consumer task queue standing in for the UI thread's run loop.
//
// Any thread may post through a `MainHandle`; only the thread that owns the
// `MainQueue` runs the tasks. The receiver is not `Sync`, so the queue can
// only ever be drained from one place at a time.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use lovegame_core::error::{BridgeError, Result};
use tracing::{trace, warn};

use crate::traits::{OwningContext, Task};

/// Posting side of the owning loop. Cheap to clone.
#[derive(Clone)]
pub struct MainHandle {
    tx: mpsc::Sender<Task>,
}

impl MainHandle {
    /// Queue `task`, then ask the platform to come and drain the queue.
    ///
    /// Once the task is queued, a failed `wake` is only logged: the task
    /// runs on the next drain, whoever triggers it.
    pub fn post_and_wake(&self, task: Task, wake: impl FnOnce() -> Result<()>) -> Result<()> {
        self.post(task)?;
        if let Err(e) = wake() {
            warn!(error = %e, "task queued but the owning loop could not be woken");
        }
        Ok(())
    }
}

impl OwningContext for MainHandle {
    fn post(&self, task: Task) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|_| BridgeError::OwningContextClosed)
    }
}

/// Draining side of the owning loop.
pub struct MainQueue {
    rx: mpsc::Receiver<Task>,
    tx: mpsc::Sender<Task>,
}

impl MainQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { rx, tx }
    }

    pub fn handle(&self) -> MainHandle {
        MainHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every task that is already queued, without waiting.
    /// Returns the number of tasks run.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "main queue pumped");
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it.
    /// Returns `false` if nothing arrived in time.
    pub fn turn(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }

    /// Keep running tasks until `done` returns true or `deadline` elapses.
    /// Returns whether `done` was satisfied.
    pub fn run_until(&self, deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while !done() {
            let Some(left) = deadline.checked_sub(start.elapsed()) else {
                return false;
            };
            self.turn(left.min(Duration::from_millis(50)));
        }
        true
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}
