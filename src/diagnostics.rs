//! Diagnostic channel for failures that must not reach the caller.
//!
//! A panic raised while an event pump dispatches some unrelated reactor event,
//! a job that broke its contract, or a pump that handed control back too early
//! are all absorbed by the bridge. They are reported here instead.

use crate::reactor::event::EventKind;

use std::any::Any;

/// A condition absorbed by the bridge and reported for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An event dispatched while pumping panicked.
    DispatchPanic { kind: EventKind, message: String },

    /// A job's computation returned a checked failure.
    ContractViolation { task_id: u64, message: String },

    /// An event pump or worker thread handed control back while its task was
    /// still running.
    PrematureReturn { task_id: u64 },
}

/// Receives diagnostics from pumps, reactors and the worker.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::DispatchPanic { kind, message } => {
                tracing::error!(?kind, %message, "exception occurred during event dispatching");
            }
            Diagnostic::ContractViolation { task_id, message } => {
                tracing::error!(task_id, %message, "checked failure thrown by a job");
            }
            Diagnostic::PrematureReturn { task_id } => {
                tracing::warn!(
                    task_id,
                    "event pump returned before task completion, waiting for the task"
                );
            }
        }
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// Renders a panic payload the way the standard panic hook does.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
