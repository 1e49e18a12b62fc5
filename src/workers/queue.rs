//! Thread-safe task queue shared by a pool's submitters and its consumer.
//!
//! Provides a FIFO queue with a condition variable: submitters push from any
//! thread, the pool's consumer thread parks in [`TaskQueue::take`] until a
//! task arrives or it is told to stop.

use crate::interrupt::Interrupter;
use crate::task::Runnable;

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// FIFO of units waiting for a worker thread.
///
/// A single mutex guards the queue; tasks are taken in insertion order.
pub(crate) struct TaskQueue {
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,
    available: Condvar,
    closed: AtomicBool,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Appends a task and wakes the consumer.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        let mut queue = self.queue.lock();

        if queue.is_empty() {
            tracing::debug!(task_id = task.context().id(), "task queue empty, adding task");
        } else {
            tracing::debug!(task_id = task.context().id(), "task queue not empty, enqueueing task");
        }

        queue.push_back(task);
        self.available.notify_all();
    }

    /// Removes the next task, parking while the queue is empty.
    ///
    /// Returns `None` once `interrupter` is raised or `keep_running` turns
    /// false; the task, if any, stays queued for the next consumer. A closed
    /// queue hands out its remaining tasks, then returns `None`.
    pub(crate) fn take(
        &self,
        interrupter: &Interrupter,
        keep_running: impl Fn() -> bool,
    ) -> Option<Arc<dyn Runnable>> {
        let mut queue = self.queue.lock();

        loop {
            if interrupter.is_interrupted() || !keep_running() {
                return None;
            }

            if let Some(task) = queue.pop_front() {
                return Some(task);
            }

            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            tracing::trace!("task queue empty, waiting for tasks");
            self.available.wait(&mut queue);
        }
    }

    /// Wakes every parked consumer so it re-checks its stop conditions.
    pub(crate) fn wake_all(&self) {
        let _queue = self.queue.lock();
        self.available.notify_all();
    }

    /// Lets consumers exit once the queue is drained.
    pub(crate) fn close(&self) {
        let _queue = self.queue.lock();
        self.closed.store(true, Ordering::Release);
        self.available.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}
