//! Completion waker for event pumps.
//!
//! A pump parked in the reactor's `next_event` would otherwise only return
//! when some unrelated event arrives. The waker built here is registered on
//! the pumped task: completing the task posts a no-op event into the reactor
//! queue, which unparks the pump so it can observe the completion.

use crate::reactor::Reactor;

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waker that nudges a reactor when the task it is registered on completes.
pub(crate) struct ReactorWaker {
    reactor: Arc<dyn Reactor>,
}

impl Wake for ReactorWaker {
    fn wake(self: Arc<Self>) {
        self.reactor.wake();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.reactor.wake();
    }
}

/// Creates a waker that wakes `reactor` when invoked.
pub(crate) fn make_waker(reactor: Arc<dyn Reactor>) -> Waker {
    Waker::from(Arc::new(ReactorWaker { reactor }))
}
