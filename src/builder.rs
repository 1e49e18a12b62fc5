//! Fluent builder for Worker construction.
//!
//! Provides a builder pattern interface for creating and configuring
//! [`Worker`] instances, either from a [`WorkerConfig`] or from explicit
//! strategy instances.

use crate::config::{WorkerConfig, WorkerThreadKind};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::WorkerError;
use crate::pump::EventPump;
use crate::reactor::Reactor;
use crate::worker::Worker;
use crate::workers::WorkerThread;

use std::sync::Arc;

/// Builder for constructing Worker instances with fluent API.
///
/// Strategies that are not given explicitly are created lazily from the
/// configuration the first time the worker needs them.
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(Arc::new(event_loop.clone()))
///     .thread_name("indexer")
///     .concurrent()
///     .build()?;
/// ```
pub struct WorkerBuilder {
    reactor: Arc<dyn Reactor>,
    config: WorkerConfig,
    sink: Option<Arc<dyn DiagnosticSink>>,
    event_pump: Option<Arc<dyn EventPump>>,
    worker_thread: Option<Arc<dyn WorkerThread>>,
    async_worker_thread: Option<Arc<dyn WorkerThread>>,
}

impl WorkerBuilder {
    /// Creates a builder for a worker bridging `reactor`.
    pub fn new(reactor: Arc<dyn Reactor>) -> Self {
        Self {
            reactor,
            config: WorkerConfig::default(),
            sink: None,
            event_pump: None,
            worker_thread: None,
            async_worker_thread: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the name of the synchronous worker thread.
    ///
    /// # Arguments
    /// * `name` - Thread name; the async worker thread gets an `-async` suffix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Runs every synchronous post on its own thread.
    ///
    /// Posts from the reactor thread made while another post is pumping run
    /// concurrently instead of queueing behind it.
    pub fn concurrent(mut self) -> Self {
        self.config.worker_thread = WorkerThreadKind::PerTask;
        self
    }

    /// Routes dispatch panics and contract violations to `sink`.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Installs `pump` instead of the configured event pump.
    pub fn event_pump(mut self, pump: Arc<dyn EventPump>) -> Self {
        self.event_pump = Some(pump);
        self
    }

    /// Installs `thread` for synchronous posts instead of the configured one.
    pub fn worker_thread(mut self, thread: Arc<dyn WorkerThread>) -> Self {
        self.worker_thread = Some(thread);
        self
    }

    /// Installs `thread` for [`AsyncTask`](crate::AsyncTask)s.
    pub fn async_worker_thread(mut self, thread: Arc<dyn WorkerThread>) -> Self {
        self.async_worker_thread = Some(thread);
        self
    }

    /// Builds the worker.
    ///
    /// # Errors
    /// [`WorkerError::InvalidConfiguration`] when the configuration is invalid.
    pub fn build(self) -> Result<Worker, WorkerError> {
        self.config.validate()?;

        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let worker = Worker::with_parts(self.reactor, sink, self.config);

        if let Some(pump) = self.event_pump {
            worker.set_event_pump(Some(pump))?;
        }
        if let Some(thread) = self.worker_thread {
            worker.set_worker_thread(Some(thread))?;
        }
        if let Some(thread) = self.async_worker_thread {
            worker.set_async_worker_thread(Some(thread))?;
        }

        Ok(worker)
    }
}
