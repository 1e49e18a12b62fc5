//! Thread-local worker membership.
//!
//! Every thread started by a [`WorkerPool`](crate::WorkerPool) runs inside
//! [`enter_context`], which records the pool that owns the thread and installs
//! the thread's interrupter. `WorkerThread::is_worker_thread` is answered from
//! this record, so runner threads spawned for individual tasks are recognized
//! as well as the pool's main thread.

use crate::interrupt::{self, Interrupter};

use std::cell::Cell;

thread_local! {
    /// Id of the pool owning the current thread.
    ///
    /// Set by [`enter_context`] for the lifetime of a worker thread.
    pub(crate) static CURRENT_POOL: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Runs `function` as a thread of pool `pool`, interruptible through
/// `interrupter`. The previous context is restored on exit.
pub(crate) fn enter_context<F, R>(pool: usize, interrupter: Interrupter, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_POOL.with(|current| current.replace(Some(pool)));
    let _restore = RestorePool(previous);

    interrupt::with_interrupter(interrupter, function)
}

/// Id of the pool owning the calling thread, if any.
pub(crate) fn current_pool() -> Option<usize> {
    CURRENT_POOL.with(|current| current.get())
}

struct RestorePool(Option<usize>);

impl Drop for RestorePool {
    fn drop(&mut self) {
        CURRENT_POOL.with(|current| current.set(self.0));
    }
}
