//! Worker threads executing posted tasks off the reactor thread.
//!
//! This module provides:
//! - [`WorkerThread`]: the strategy trait used by [`Worker`](crate::Worker)
//! - [`WorkerPool`]: the built-in strategies, serial and per-task
//!
//! A worker thread only executes tasks; it never touches the reactor. Results
//! travel back through the task itself.

mod context;
pub mod pool;
mod queue;

pub use pool::{Strategy, WorkerPool};

use crate::error::WorkerError;
use crate::task::Runnable;

use std::sync::Arc;

/// Strategy executing posted tasks on background threads.
pub trait WorkerThread: Send + Sync {
    /// Starts the background thread. Starting a live worker thread does nothing.
    fn start(&self) -> Result<(), WorkerError>;

    /// Asks the background thread to stop after its current task.
    ///
    /// Tasks still queued are kept and executed after a restart.
    fn stop(&self);

    fn is_alive(&self) -> bool;

    /// Whether the calling thread belongs to this worker thread.
    fn is_worker_thread(&self) -> bool;

    /// Hands `task` to the background thread and returns immediately.
    fn post_task(&self, task: Arc<dyn Runnable>);

    /// Executes `task` on the calling thread.
    fn run_task(&self, task: &dyn Runnable);
}
