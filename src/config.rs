//! Declarative worker configuration.
//!
//! A [`WorkerConfig`] names the strategies a [`Worker`](crate::Worker) creates
//! lazily when none was installed explicitly. It is usually loaded from a
//! TOML document:
//!
//! ```toml
//! worker_thread = "per-task"
//! event_pump = "conditional"
//! async_worker_thread = "per-task"
//! thread_name = "indexer"
//! ```
//!
//! Every key is optional.

use crate::diagnostics::DiagnosticSink;
use crate::error::WorkerError;
use crate::pump::{ConditionalEventPump, EventPump, QueueEventPump};
use crate::workers::{WorkerPool, WorkerThread};

use serde::{Deserialize, Serialize};

use std::path::Path;
use std::sync::Arc;

/// Worker thread strategy created by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerThreadKind {
    /// One background thread, tasks run one at a time.
    #[default]
    Serial,
    /// A fresh runner thread per task.
    PerTask,
}

impl WorkerThreadKind {
    pub(crate) fn create(self, name: &str) -> Arc<dyn WorkerThread> {
        match self {
            WorkerThreadKind::Serial => Arc::new(WorkerPool::serial(name)),
            WorkerThreadKind::PerTask => Arc::new(WorkerPool::per_task(name)),
        }
    }
}

/// Event pump strategy created by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventPumpKind {
    /// Drains the reactor queue itself.
    #[default]
    Queue,
    /// Delegates to the reactor's native conditional pump.
    Conditional,
}

impl EventPumpKind {
    pub(crate) fn create(self, sink: Arc<dyn DiagnosticSink>) -> Arc<dyn EventPump> {
        match self {
            EventPumpKind::Queue => Arc::new(QueueEventPump::with_diagnostics(sink)),
            EventPumpKind::Conditional => Arc::new(ConditionalEventPump::with_diagnostics(sink)),
        }
    }
}

/// Strategy selection for a [`Worker`](crate::Worker), loadable from TOML.
///
/// Every field is optional in the document:
///
/// ```toml
/// worker_thread = "per-task"
/// event_pump = "conditional"
/// thread_name = "indexer"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(default)]
    pub worker_thread: WorkerThreadKind,

    #[serde(default)]
    pub event_pump: EventPumpKind,

    #[serde(default = "default_async_worker_thread")]
    pub async_worker_thread: WorkerThreadKind,

    /// Name of the synchronous worker thread. The async worker thread is
    /// named after it with an `-async` suffix.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_async_worker_thread() -> WorkerThreadKind {
    WorkerThreadKind::PerTask
}

fn default_thread_name() -> String {
    "bridge-worker".to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_thread: WorkerThreadKind::default(),
            event_pump: EventPumpKind::default(),
            async_worker_thread: default_async_worker_thread(),
            thread_name: default_thread_name(),
        }
    }
}

impl WorkerConfig {
    /// Parses and validates a TOML document.
    pub fn from_str(content: &str) -> Result<Self, WorkerError> {
        let config: WorkerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorkerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|error| WorkerError::Config(format!("{}: {}", path.display(), error)))?;

        Self::from_str(&content)
    }

    /// Checks values the TOML schema cannot express.
    ///
    /// # Errors
    /// [`WorkerError::InvalidConfiguration`] when `thread_name` is blank.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.thread_name.trim().is_empty() {
            return Err(WorkerError::InvalidConfiguration(
                "thread_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Name given to the async worker thread.
    pub fn async_thread_name(&self) -> String {
        format!("{}-async", self.thread_name)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, WorkerError> {
        toml::to_string_pretty(self).map_err(|error| WorkerError::Config(error.to_string()))
    }
}

