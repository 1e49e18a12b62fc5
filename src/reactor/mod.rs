//! The reactor collaborator.
//!
//! The bridge never owns the reactor's event queue: it only needs the
//! capabilities described by [`Reactor`]. This module provides:
//! - [`Reactor`]: the capability trait required by pumps and the worker
//! - [`event`]: the [`Event`] type dispatched on the reactor thread
//! - [`core`]: [`EventLoop`], an in-process reactor implementing the trait

pub mod core;
pub mod event;

pub use self::core::EventLoop;
pub use event::{Event, EventKind};

use crate::diagnostics::{Diagnostic, DiagnosticSink, panic_message};
use crate::error::WorkerError;

use std::panic::{self, AssertUnwindSafe};

/// Capabilities the bridge requires from a reactor's event queue.
///
/// All methods except [`schedule_soon`](Reactor::schedule_soon) and
/// [`wake`](Reactor::wake) are called on the reactor thread only.
///
/// # Example
/// ```ignore
/// let reactor: Arc<dyn Reactor> = Arc::new(EventLoop::new());
///
/// reactor.schedule_soon(Event::new(|| println!("on the reactor thread")));
/// let event = reactor.next_event();
/// reactor.dispatch(event);
/// ```
pub trait Reactor: Send + Sync {
    /// Whether the calling thread is the reactor thread.
    fn is_reactor_thread(&self) -> bool;

    /// Removes the next pending event, blocking while the queue is empty.
    fn next_event(&self) -> Event;

    /// Removes the next pending event without blocking.
    fn try_next_event(&self) -> Option<Event>;

    /// Dispatches one event to its target on the calling thread.
    ///
    /// A panicking event unwinds out of this call; pumps guard it.
    fn dispatch(&self, event: Event) {
        event.dispatch()
    }

    /// Enqueues `event` to run on the reactor thread at its next opportunity.
    ///
    /// Callable from any thread; wakes a thread parked in `next_event`.
    fn schedule_soon(&self, event: Event);

    /// Puts events taken from the queue back at its head, keeping their order
    /// and ahead of anything posted since.
    ///
    /// The default appends them, for reactors whose queue cannot be pushed
    /// at the front.
    fn reschedule(&self, events: Vec<Event>) {
        for event in events {
            self.schedule_soon(event);
        }
    }

    /// Wakes a thread parked in [`next_event`](Reactor::next_event).
    fn wake(&self) {
        self.schedule_soon(Event::wake())
    }

    /// Native "pump while the condition holds" primitive.
    ///
    /// Reactors without one keep the default, and delegating pumps fall back
    /// to draining the queue themselves.
    fn pump_while(&self, condition: &dyn Fn() -> bool) -> Result<(), WorkerError> {
        let _ = condition;
        Err(WorkerError::Unsupported("pump_while"))
    }
}

/// Dispatches `event`, reporting a panic to `sink` instead of unwinding.
pub(crate) fn dispatch_guarded(reactor: &dyn Reactor, event: Event, sink: &dyn DiagnosticSink) {
    let kind = event.kind();

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| reactor.dispatch(event))) {
        sink.report(Diagnostic::DispatchPanic {
            kind,
            message: panic_message(payload.as_ref()),
        });
    }
}
