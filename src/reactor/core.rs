//! In-process reactor: a single-threaded event loop with a thread-safe queue.
//!
//! The loop is owned by one thread (the reactor thread). Any thread may post
//! events into it; only the owner fetches and dispatches them. Fetching blocks
//! on a condition variable while the queue is empty, and every post notifies
//! it, so a parked reactor thread wakes as soon as work arrives.

use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::WorkerError;
use crate::reactor::event::Event;
use crate::reactor::{Reactor, dispatch_guarded};

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// A cheap-to-clone handle on an in-process event loop.
///
/// Clones share the same queue, so a clone can be moved into worker threads
/// and used to post events back to the reactor thread.
///
/// # Example
/// ```ignore
/// let event_loop = EventLoop::new();
/// let handle = event_loop.clone();
///
/// std::thread::spawn(move || handle.post(|| println!("on the reactor thread")));
/// event_loop.run_until_idle()?;
/// ```
#[derive(Clone)]
pub struct EventLoop {
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<VecDeque<Event>>,
    available: Condvar,
    owner: Mutex<ThreadId>,
    quit: AtomicBool,
    sink: Arc<dyn DiagnosticSink>,
}

impl EventLoop {
    /// Creates an event loop owned by the calling thread.
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingSink))
    }

    /// Creates an event loop reporting dispatch panics to `sink`.
    pub fn with_diagnostics(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                owner: Mutex::new(thread::current().id()),
                quit: AtomicBool::new(false),
                sink,
            }),
        }
    }

    /// Makes the calling thread the reactor thread of this loop.
    pub fn bind_current_thread(&self) {
        *self.shared.owner.lock() = thread::current().id();
    }

    /// Schedules `action` on the reactor thread.
    pub fn post<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_soon(Event::new(action));
    }

    /// Schedules an already built event, keeping its kind.
    pub fn post_event(&self, event: Event) {
        self.schedule_soon(event);
    }

    /// Number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Asks the innermost [`run`](EventLoop::run) to return.
    pub fn quit(&self) {
        self.shared.quit.store(true, Ordering::SeqCst);
        self.wake();
    }

    /// Dispatches events until [`quit`](EventLoop::quit) is called.
    ///
    /// # Errors
    /// [`WorkerError::IllegalCallContext`] when called off the reactor thread.
    pub fn run(&self) -> Result<(), WorkerError> {
        self.ensure_reactor_thread()?;

        loop {
            if self.shared.quit.swap(false, Ordering::SeqCst) {
                return Ok(());
            }

            let event = self.next_event();
            dispatch_guarded(self, event, self.shared.sink.as_ref());
        }
    }

    /// Dispatches queued events until the queue is empty.
    ///
    /// Events posted by the dispatched events themselves are drained as well.
    pub fn run_until_idle(&self) -> Result<(), WorkerError> {
        self.ensure_reactor_thread()?;

        while let Some(event) = self.try_next_event() {
            dispatch_guarded(self, event, self.shared.sink.as_ref());
        }

        Ok(())
    }

    fn ensure_reactor_thread(&self) -> Result<(), WorkerError> {
        if self.is_reactor_thread() {
            return Ok(());
        }

        Err(WorkerError::IllegalCallContext {
            thread: thread_label(),
        })
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor for EventLoop {
    fn is_reactor_thread(&self) -> bool {
        *self.shared.owner.lock() == thread::current().id()
    }

    fn next_event(&self) -> Event {
        let mut queue = self.shared.queue.lock();

        loop {
            if let Some(event) = queue.pop_front() {
                return event;
            }

            tracing::trace!("reactor queue empty, waiting for events");
            self.shared.available.wait(&mut queue);
        }
    }

    fn try_next_event(&self) -> Option<Event> {
        self.shared.queue.lock().pop_front()
    }

    fn schedule_soon(&self, event: Event) {
        let mut queue = self.shared.queue.lock();
        queue.push_back(event);

        self.shared.available.notify_all();
    }

    fn reschedule(&self, events: Vec<Event>) {
        let mut queue = self.shared.queue.lock();

        for event in events.into_iter().rev() {
            queue.push_front(event);
        }

        self.shared.available.notify_all();
    }

    fn pump_while(&self, condition: &dyn Fn() -> bool) -> Result<(), WorkerError> {
        while condition() {
            let event = self.next_event();
            dispatch_guarded(self, event, self.shared.sink.as_ref());
        }

        Ok(())
    }
}

/// Name of the calling thread, or its id when unnamed.
pub(crate) fn thread_label() -> String {
    let current = thread::current();

    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
