//! Hand-off of work from network tasks to the game loop
//!
//! Network tasks never touch game state directly. They wrap what they want
//! done in a closure and enqueue it; the game loop drains the queue once per
//! tick and runs every closure against its own state.

use log::{error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;

/// Deferred action run against the game loop's context
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Producer handle, cheap to clone into every connection task
pub struct TaskSender<C> {
    tx: mpsc::UnboundedSender<Task<C>>,
}

impl<C> Clone for TaskSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> TaskSender<C> {
    /// Queues an action without running it
    ///
    /// Returns false if the game loop is gone, in which case the action is
    /// dropped.
    pub fn enqueue<F>(&self, action: F) -> bool
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        if self.tx.send(Box::new(action)).is_err() {
            warn!("Game loop has shut down, dropping queued action");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of one drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub executed: usize,
    pub panicked: usize,
}

/// Single-consumer end owned by the game loop
pub struct MainThreadQueue<C> {
    tx: mpsc::UnboundedSender<Task<C>>,
    rx: mpsc::UnboundedReceiver<Task<C>>,
}

impl<C> Default for MainThreadQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> MainThreadQueue<C> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> TaskSender<C> {
        TaskSender {
            tx: self.tx.clone(),
        }
    }

    /// Runs every action queued before this call, in FIFO order
    ///
    /// Actions queued while the drain runs wait for the next one. A panicking
    /// action is logged and the rest still run.
    pub fn drain(&mut self, ctx: &mut C) -> DrainReport {
        // Snapshot first so actions that enqueue more work cannot starve the tick
        let mut pending = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            pending.push(task);
        }

        let mut report = DrainReport::default();
        for task in pending {
            report.executed += 1;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| task(ctx))) {
                report.panicked += 1;
                error!("Queued action panicked: {}", panic_message(&*panic));
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
