//! Cooperative interruption of worker threads.
//!
//! Rust threads cannot be interrupted from the outside, so every thread started
//! by a [`WorkerPool`](crate::WorkerPool) carries an [`Interrupter`]. Stopping
//! the pool raises the flag. A task observes it through [`is_interrupted`],
//! [`interrupted`] or the interruptible [`sleep`], and decides whether to honor
//! it.
//!
//! Honoring an interruption means leaving the flag raised (or raising it again
//! with [`Interrupter::interrupt`] after [`sleep`] consumed it): the worker
//! thread then exits after the current task. Swallowing it means returning with
//! the flag cleared, and the thread keeps consuming its queue.
//!
//! # Example
//!
//! ```ignore
//! use reactor_bridge::interrupt;
//! use std::time::Duration;
//!
//! let task = Task::new(|_| {
//!     match interrupt::sleep(Duration::from_secs(1)) {
//!         Ok(()) => Ok(42),
//!         Err(interrupted) => {
//!             // Restore the flag so the worker thread shuts down.
//!             if let Some(interrupter) = interrupt::current() {
//!                 interrupter.interrupt();
//!             }
//!             Err(interrupted)
//!         }
//!     }
//! });
//! ```

use parking_lot::{Condvar, Mutex};

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Returned by [`sleep`] when the thread was interrupted while sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("thread interrupted")]
pub struct Interrupted;

thread_local! {
    /// Interrupter of the worker thread running on this OS thread, if any.
    static CURRENT_INTERRUPTER: RefCell<Option<Interrupter>> = const { RefCell::new(None) };
}

/// Shared interruption flag of one worker thread.
#[derive(Clone, Default)]
pub struct Interrupter {
    inner: Arc<Flag>,
}

#[derive(Default)]
struct Flag {
    interrupted: Mutex<bool>,
    signal: Condvar,
}

impl Interrupter {
    /// Creates an interrupter with the flag lowered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes an interruptible sleep in progress.
    pub fn interrupt(&self) {
        let mut interrupted = self.inner.interrupted.lock();
        *interrupted = true;
        self.inner.signal.notify_all();
    }

    /// Reads the flag without clearing it.
    pub fn is_interrupted(&self) -> bool {
        *self.inner.interrupted.lock()
    }

    /// Clears the flag, returning whether it was raised.
    pub fn clear(&self) -> bool {
        std::mem::replace(&mut *self.inner.interrupted.lock(), false)
    }

    /// Sleeps for `duration` unless interrupted first.
    ///
    /// An interruption is consumed: the flag is cleared before `Interrupted`
    /// is returned.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        let mut interrupted = self.inner.interrupted.lock();

        loop {
            if *interrupted {
                *interrupted = false;
                return Err(Interrupted);
            }

            if self
                .inner
                .signal
                .wait_until(&mut interrupted, deadline)
                .timed_out()
            {
                if *interrupted {
                    *interrupted = false;
                    return Err(Interrupted);
                }
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupter")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns the interrupter of the calling worker thread.
///
/// `None` on threads that were not started by a worker pool.
pub fn current() -> Option<Interrupter> {
    CURRENT_INTERRUPTER.with(|current| current.borrow().clone())
}

/// Whether the calling worker thread has been asked to stop.
pub fn is_interrupted() -> bool {
    current().is_some_and(|interrupter| interrupter.is_interrupted())
}

/// Tests and clears the calling thread's interruption flag.
pub fn interrupted() -> bool {
    current().is_some_and(|interrupter| interrupter.clear())
}

/// Interruptible sleep for the calling thread.
///
/// Threads without an interrupter fall back to [`std::thread::sleep`].
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    match current() {
        Some(interrupter) => interrupter.sleep(duration),
        None => {
            thread::sleep(duration);
            Ok(())
        }
    }
}

/// Installs `interrupter` as the calling thread's interrupter for the
/// duration of `function`, restoring the previous one afterwards.
pub(crate) fn with_interrupter<F, R>(interrupter: Interrupter, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_INTERRUPTER.with(|current| current.borrow_mut().replace(interrupter));
    let _restore = Restore(previous);

    function()
}

struct Restore(Option<Interrupter>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT_INTERRUPTER.with(|current| *current.borrow_mut() = previous);
    }
}
