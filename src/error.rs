//! Error types returned by the bridge.
//!
//! Failures raised by a task's own computation are never wrapped into these
//! types: they travel back to the posting thread untouched inside
//! [`PostError::Task`]. Everything in [`WorkerError`] is raised by the bridge
//! itself.

use std::fmt;

/// Failures raised by the bridge itself rather than by a task's computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// `post` was called from a thread that is neither the reactor thread nor
    /// a thread owned by the active worker thread.
    #[error(
        "Worker::post() can be called only from the reactor thread or from a worker thread (called from {thread})"
    )]
    IllegalCallContext { thread: String },

    /// A strategy or configuration value was missing or empty.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The reactor does not provide the requested primitive.
    #[error("{0} is not supported by this reactor")]
    Unsupported(&'static str),

    /// A job produced a checked failure, which its entry point forbids.
    #[error("checked failure escaped from a job: {0}")]
    ContractViolation(String),

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread {name}: {reason}")]
    Spawn { name: String, reason: String },

    /// The configuration document could not be parsed.
    #[error("failed to parse worker configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for WorkerError {
    fn from(error: toml::de::Error) -> Self {
        WorkerError::Config(error.to_string())
    }
}

/// Error returned by [`Worker::post`](crate::Worker::post).
///
/// `Task` carries the exact value the computation returned as its error.
/// `Worker` carries a failure raised by the bridge before the task could run.
pub enum PostError<E> {
    Task(E),
    Worker(WorkerError),
}

impl<E> PostError<E> {
    /// Returns the task's own failure, if that is what this error holds.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            PostError::Task(error) => Some(error),
            PostError::Worker(_) => None,
        }
    }

    /// Returns the bridge failure, if that is what this error holds.
    pub fn worker_error(&self) -> Option<&WorkerError> {
        match self {
            PostError::Task(_) => None,
            PostError::Worker(error) => Some(error),
        }
    }
}

impl<E> From<WorkerError> for PostError<E> {
    fn from(error: WorkerError) -> Self {
        PostError::Worker(error)
    }
}

impl<E: fmt::Debug> fmt::Debug for PostError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::Task(error) => f.debug_tuple("Task").field(error).finish(),
            PostError::Worker(error) => f.debug_tuple("Worker").field(error).finish(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for PostError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::Task(error) => write!(f, "task failed: {}", error),
            PostError::Worker(error) => error.fmt(f),
        }
    }
}

impl<E> std::error::Error for PostError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PostError::Task(error) => Some(error),
            PostError::Worker(error) => Some(error),
        }
    }
}
