//! Manual event pump: fetch one event, dispatch it, check the task, repeat.

use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::pump::EventPump;
use crate::pump::waker::make_waker;
use crate::reactor::{Event, EventKind, Reactor, dispatch_guarded};
use crate::task::Runnable;

use parking_lot::Mutex;

use std::sync::Arc;

/// Decides which events a pump may dispatch while its task runs.
///
/// Rejected events are not lost: they are held back and handed to
/// [`Reactor::reschedule`] when the pump returns, so they stay in their
/// original order ahead of events posted while the pump ran. Wake events are
/// never offered to the filter.
pub trait EventFilter: Send + Sync {
    fn accept(&self, event: &Event) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn accept(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Event pump that drains the reactor queue itself.
///
/// Works with any [`Reactor`], since it only needs `next_event` and
/// `dispatch`. While the queue is empty the reactor thread parks inside
/// `next_event`; completion of the task posts a wake event to unpark it.
pub struct QueueEventPump {
    sink: Arc<dyn DiagnosticSink>,
    filter: Mutex<Option<Arc<dyn EventFilter>>>,
}

impl QueueEventPump {
    /// Creates a pump without a filter, reporting to [`TracingSink`].
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingSink))
    }

    /// Creates a pump reporting dispatch panics to `sink`.
    pub fn with_diagnostics(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            filter: Mutex::new(None),
        }
    }

    /// The filter applied to events dispatched while pumping, if any.
    pub fn event_filter(&self) -> Option<Arc<dyn EventFilter>> {
        self.filter.lock().clone()
    }

    /// Installs the filter applied by subsequent pumps; `None` removes it.
    pub fn set_event_filter(&self, filter: Option<Arc<dyn EventFilter>>) {
        *self.filter.lock() = filter;
    }
}

impl Default for QueueEventPump {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPump for QueueEventPump {
    fn pump_events(&self, reactor: &Arc<dyn Reactor>, task: &dyn Runnable) {
        task.register_waker(&make_waker(reactor.clone()));

        let filter = self.event_filter();
        drain_until_complete(reactor.as_ref(), task, filter.as_deref(), self.sink.as_ref());
    }
}

/// Dispatches reactor events until `task` completes.
///
/// The caller must have registered a completion waker on `task`.
pub(crate) fn drain_until_complete(
    reactor: &dyn Reactor,
    task: &dyn Runnable,
    filter: Option<&dyn EventFilter>,
    sink: &dyn DiagnosticSink,
) {
    let task_id = task.context().id();
    let mut deferred = Vec::new();

    tracing::debug!(task_id, "start dequeueing events from the reactor queue");

    while !task.is_completed() {
        let event = reactor.next_event();

        if let Some(filter) = filter
            && event.kind() != EventKind::Wake
            && !filter.accept(&event)
        {
            tracing::trace!(task_id, kind = ?event.kind(), "event filtered out while pumping");
            deferred.push(event);
            continue;
        }

        dispatch_guarded(reactor, event, sink);
    }

    if !deferred.is_empty() {
        tracing::trace!(task_id, count = deferred.len(), "rescheduling filtered events");
        reactor.reschedule(deferred);
    }

    tracing::debug!(task_id, "stop dequeueing events from the reactor queue");
}
