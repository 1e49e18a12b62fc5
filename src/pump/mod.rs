//! Event pumps: keep the reactor thread dispatching while a task runs.
//!
//! - [`QueueEventPump`]: fetches and dispatches reactor events itself
//! - [`ConditionalEventPump`]: delegates to the reactor's own
//!   `pump_while` primitive and guards against it returning too early

pub mod conditional;
pub mod queue;
mod waker;

pub use conditional::ConditionalEventPump;
pub use queue::{EventFilter, QueueEventPump};

use crate::reactor::Reactor;
use crate::task::Runnable;

use std::sync::Arc;

/// Drains the reactor's event queue until a task completes.
///
/// Implementations are called on the reactor thread only and must be
/// reentrant: an event dispatched by the pump may post another task, which
/// starts a nested pump on the same thread before the outer one returns.
pub trait EventPump: Send + Sync {
    /// Blocks the reactor thread, dispatching its events, until `task`
    /// completes.
    ///
    /// Panics raised by dispatched events never escape. The task's own
    /// failure is not reported here; it is retrieved from the task afterwards.
    fn pump_events(&self, reactor: &Arc<dyn Reactor>, task: &dyn Runnable);
}
