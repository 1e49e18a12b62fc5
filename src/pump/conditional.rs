//! Delegating event pump.
//!
//! Hands the reactor thread to the reactor's own `pump_while` primitive with
//! the condition "task not completed yet". Reactors that lack the primitive
//! are drained manually instead.
//!
//! A native primitive may hand control back while the task is still running.
//! Returning at that point would let `post` observe an unfinished task, so the
//! pump then parks on the task's completion signal before returning, and
//! records the occurrence.

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::WorkerError;
use crate::pump::EventPump;
use crate::pump::queue::drain_until_complete;
use crate::pump::waker::make_waker;
use crate::reactor::Reactor;
use crate::task::Runnable;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event pump delegating to [`Reactor::pump_while`].
///
/// Reactors without the primitive are drained the way [`QueueEventPump`]
/// does it. When the primitive returns while the task is still running, the
/// return is counted and reported, then the pump blocks until the task
/// completes.
///
/// [`QueueEventPump`]: crate::QueueEventPump
pub struct ConditionalEventPump {
    sink: Arc<dyn DiagnosticSink>,
    premature_returns: AtomicU64,
}

impl ConditionalEventPump {
    /// Creates a pump reporting to [`TracingSink`].
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingSink))
    }

    /// Creates a pump reporting dispatch panics and premature returns to
    /// `sink`.
    pub fn with_diagnostics(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            premature_returns: AtomicU64::new(0),
        }
    }

    /// How many times the reactor's primitive returned before its task
    /// completed.
    pub fn premature_returns(&self) -> u64 {
        self.premature_returns.load(Ordering::Relaxed)
    }
}

impl Default for ConditionalEventPump {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPump for ConditionalEventPump {
    fn pump_events(&self, reactor: &Arc<dyn Reactor>, task: &dyn Runnable) {
        let task_id = task.context().id();
        task.register_waker(&make_waker(reactor.clone()));

        match reactor.pump_while(&|| !task.is_completed()) {
            Ok(()) => {}
            Err(WorkerError::Unsupported(primitive)) => {
                tracing::debug!(task_id, primitive, "reactor cannot pump conditionally, draining manually");
                drain_until_complete(reactor.as_ref(), task, None, self.sink.as_ref());
            }
            Err(error) => {
                tracing::warn!(task_id, %error, "reactor failed to pump events");
            }
        }

        if !task.is_completed() {
            self.premature_returns.fetch_add(1, Ordering::Relaxed);
            self.sink.report(Diagnostic::PrematureReturn { task_id });

            task.wait_completed();
        }
    }
}
