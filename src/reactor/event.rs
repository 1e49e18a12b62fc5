use std::fmt;

/// Broad category of a reactor event, used by event filters and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A callback scheduled with `schedule_soon`.
    Invocation,
    /// User input (key presses, clicks, ...).
    Input,
    /// A repaint request.
    Paint,
    /// A no-op posted only to wake a thread parked in `next_event`.
    Wake,
}

/// A unit of reactor work, dispatched on the reactor thread.
pub struct Event {
    kind: EventKind,
    action: Box<dyn FnOnce() + Send>,
}

impl Event {
    /// Creates an invocation event running `action`.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_kind(EventKind::Invocation, action)
    }

    /// Creates an event of the given kind.
    ///
    /// # Arguments
    /// * `kind` - What filters see when the event is pumped
    /// * `action` - Run once, on the reactor thread
    pub fn with_kind<F>(kind: EventKind, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            kind,
            action: Box::new(action),
        }
    }

    /// An event that does nothing when dispatched.
    pub fn wake() -> Self {
        Self::with_kind(EventKind::Wake, || {})
    }

    /// Returns the kind the event was created with.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Runs the event's action on the calling thread.
    pub fn dispatch(self) {
        (self.action)()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("kind", &self.kind).finish()
    }
}
