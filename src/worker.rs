//! The worker: runs tasks off the reactor thread while the reactor thread keeps
//! dispatching events.
//!
//! [`Worker::post`] looks synchronous to its caller. On the reactor thread it
//! hands the task to the worker thread and then pumps reactor events until the
//! task completes, so the reactor never freezes and the caller still gets the
//! task's result as a plain return value. On a worker thread (a task posting
//! another task) it simply runs the task inline.
//!
//! # Example
//!
//! ```ignore
//! use reactor_bridge::{EventLoop, Task, Worker};
//! use std::sync::Arc;
//!
//! let event_loop = EventLoop::new();
//! let worker = Worker::new(Arc::new(event_loop.clone()));
//!
//! event_loop.post(move || {
//!     let task = Task::new(|_| std::fs::read_to_string("Cargo.toml"));
//!     match worker.post(&task) {
//!         Ok(manifest) => println!("{manifest}"),
//!         Err(error) => eprintln!("{error}"),
//!     }
//! });
//! ```

use crate::config::WorkerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{PostError, WorkerError};
use crate::pump::EventPump;
use crate::reactor::Reactor;
use crate::reactor::core::thread_label;
use crate::task::{AsyncTask, Runnable, Task};
use crate::workers::WorkerThread;

use parking_lot::Mutex;

use std::fmt;
use std::panic;
use std::sync::Arc;

/// Bridges a reactor and its worker threads.
///
/// A `Worker` owns (or lazily creates) three strategies:
/// - the event pump used while a synchronous post waits
/// - the worker thread executing synchronous posts
/// - the worker thread executing [`AsyncTask`]s
///
/// Strategies can be replaced at any time; a replacement is used starting with
/// the next post.
pub struct Worker {
    reactor: Arc<dyn Reactor>,
    sink: Arc<dyn DiagnosticSink>,
    config: WorkerConfig,
    event_pump: Mutex<Option<Arc<dyn EventPump>>>,
    worker_thread: Mutex<Option<Installed>>,
    async_worker_thread: Mutex<Option<Installed>>,
}

/// A worker thread together with whether this worker ever started it.
struct Installed {
    thread: Arc<dyn WorkerThread>,
    started: bool,
}

impl Installed {
    fn new(thread: Arc<dyn WorkerThread>) -> Self {
        Self {
            thread,
            started: false,
        }
    }
}

impl Worker {
    /// Creates a worker with the default strategies: a serial worker thread,
    /// a queue event pump and a per-task async worker thread.
    pub fn new(reactor: Arc<dyn Reactor>) -> Self {
        Self::with_parts(reactor, Arc::new(TracingSink), WorkerConfig::default())
    }

    pub(crate) fn with_parts(
        reactor: Arc<dyn Reactor>,
        sink: Arc<dyn DiagnosticSink>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            reactor,
            sink,
            config,
            event_pump: Mutex::new(None),
            worker_thread: Mutex::new(None),
            async_worker_thread: Mutex::new(None),
        }
    }

    /// The reactor whose thread posts synchronously.
    pub fn reactor(&self) -> &Arc<dyn Reactor> {
        &self.reactor
    }

    /// Sink receiving the conditions this worker absorbs.
    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Configuration the default strategies are created from.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The event pump, created on first use when none was installed.
    pub fn event_pump(&self) -> Arc<dyn EventPump> {
        self.event_pump
            .lock()
            .get_or_insert_with(|| self.config.event_pump.create(self.sink.clone()))
            .clone()
    }

    /// Replaces the event pump.
    ///
    /// # Errors
    /// [`WorkerError::InvalidConfiguration`] when `pump` is `None`.
    pub fn set_event_pump(&self, pump: Option<Arc<dyn EventPump>>) -> Result<(), WorkerError> {
        let pump = pump.ok_or_else(|| {
            WorkerError::InvalidConfiguration("event pump cannot be unset".to_string())
        })?;

        *self.event_pump.lock() = Some(pump);
        Ok(())
    }

    /// The worker thread for synchronous posts, created on first use.
    pub fn worker_thread(&self) -> Arc<dyn WorkerThread> {
        self.worker_thread
            .lock()
            .get_or_insert_with(|| Installed::new(self.default_worker_thread()))
            .thread
            .clone()
    }

    /// Replaces the worker thread for synchronous posts.
    ///
    /// The previous worker thread is not stopped; tasks it already holds
    /// complete normally.
    ///
    /// # Errors
    /// [`WorkerError::InvalidConfiguration`] when `thread` is `None`.
    pub fn set_worker_thread(
        &self,
        thread: Option<Arc<dyn WorkerThread>>,
    ) -> Result<(), WorkerError> {
        let thread = thread.ok_or_else(|| {
            WorkerError::InvalidConfiguration("worker thread cannot be unset".to_string())
        })?;

        *self.worker_thread.lock() = Some(Installed::new(thread));
        Ok(())
    }

    /// The worker thread for [`AsyncTask`]s, created on first use.
    pub fn async_worker_thread(&self) -> Arc<dyn WorkerThread> {
        self.async_worker_thread
            .lock()
            .get_or_insert_with(|| Installed::new(self.default_async_worker_thread()))
            .thread
            .clone()
    }

    /// Replaces the worker thread for [`AsyncTask`]s.
    ///
    /// # Errors
    /// [`WorkerError::InvalidConfiguration`] when `thread` is `None`.
    pub fn set_async_worker_thread(
        &self,
        thread: Option<Arc<dyn WorkerThread>>,
    ) -> Result<(), WorkerError> {
        let thread = thread.ok_or_else(|| {
            WorkerError::InvalidConfiguration("async worker thread cannot be unset".to_string())
        })?;

        *self.async_worker_thread.lock() = Some(Installed::new(thread));
        Ok(())
    }

    /// Runs `task` on the worker thread and returns its result.
    ///
    /// On the reactor thread, reactor events keep being dispatched until the
    /// task completes. On a thread of the active worker thread, the task runs
    /// inline. A panic raised by the computation is resumed here with its
    /// original payload.
    ///
    /// An event pump or worker thread that hands control back before the task
    /// completed is reported as [`Diagnostic::PrematureReturn`], and the call
    /// keeps waiting for the task.
    ///
    /// The task is reset afterwards and may be posted again.
    ///
    /// # Errors
    /// - [`PostError::Task`] with the computation's own error
    /// - [`PostError::Worker`] with [`WorkerError::IllegalCallContext`] when
    ///   called from any other thread
    pub fn post<T, E>(&self, task: &Arc<Task<T, E>>) -> Result<T, PostError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        if self.reactor.is_reactor_thread() {
            let thread = running(&self.worker_thread, || self.default_worker_thread())?;
            let runnable: Arc<dyn Runnable> = task.clone();

            tracing::trace!(task_id = task.context().id(), "posting task from the reactor thread");
            thread.post_task(runnable);
            self.event_pump().pump_events(&self.reactor, &**task);
        } else {
            let thread = self.worker_thread();

            if !thread.is_worker_thread() {
                return Err(PostError::Worker(WorkerError::IllegalCallContext {
                    thread: thread_label(),
                }));
            }

            tracing::trace!(task_id = task.context().id(), "running nested task inline");
            thread.run_task(&**task);
        }

        if !task.is_completed() {
            self.sink.report(Diagnostic::PrematureReturn {
                task_id: task.context().id(),
            });
            task.wait_completed();
        }

        let outcome = task.take_outcome();
        task.reset();

        match outcome.into_result() {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(PostError::Task(error)),
            // Only when another holder of the task took the outcome first.
            None => Err(PostError::Worker(WorkerError::ContractViolation(format!(
                "outcome of task {} was taken by another caller",
                task.context().id()
            )))),
        }
    }

    /// Like [`post`](Worker::post), for computations that must not fail.
    ///
    /// An `Err` produced by the computation breaks that contract: it is
    /// reported to the diagnostic sink and raised as a panic carrying
    /// [`WorkerError::ContractViolation`].
    ///
    /// # Errors
    /// [`WorkerError::IllegalCallContext`] when called from a thread that is
    /// neither the reactor thread nor a worker thread.
    pub fn post_job<T, E>(&self, job: &Arc<Task<T, E>>) -> Result<T, WorkerError>
    where
        T: Send + 'static,
        E: Send + fmt::Debug + 'static,
    {
        match self.post(job) {
            Ok(value) => Ok(value),
            Err(PostError::Worker(error)) => Err(error),
            Err(PostError::Task(error)) => {
                let message = format!("{:?}", error);

                self.sink.report(Diagnostic::ContractViolation {
                    task_id: job.context().id(),
                    message: message.clone(),
                });
                panic::panic_any(WorkerError::ContractViolation(message))
            }
        }
    }

    /// Submits `task` to the async worker thread and returns immediately.
    ///
    /// Callable from any thread. The task's `finish` callback runs on the
    /// reactor thread once the computation is over.
    pub fn post_async<T, E>(&self, task: AsyncTask<T, E>) -> Result<(), WorkerError>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let thread = running(&self.async_worker_thread, || self.default_async_worker_thread())?;

        tracing::trace!(task_id = task.task().context().id(), "posting async task");
        thread.post_task(task.into_runnable(self.reactor.clone()));

        Ok(())
    }

    fn default_worker_thread(&self) -> Arc<dyn WorkerThread> {
        self.config.worker_thread.create(&self.config.thread_name)
    }

    fn default_async_worker_thread(&self) -> Arc<dyn WorkerThread> {
        self.config
            .async_worker_thread
            .create(&self.config.async_thread_name())
    }
}

/// Returns the thread in `slot`, installing a default and starting it when it
/// is not alive.
fn running(
    slot: &Mutex<Option<Installed>>,
    create: impl FnOnce() -> Arc<dyn WorkerThread>,
) -> Result<Arc<dyn WorkerThread>, WorkerError> {
    let mut slot = slot.lock();
    let installed = slot.get_or_insert_with(|| Installed::new(create()));

    if !installed.thread.is_alive() {
        if installed.started {
            tracing::warn!("worker thread is not alive, restarting");
        } else {
            tracing::debug!("starting worker thread");
        }

        installed.thread.start()?;
        installed.started = true;
    }

    Ok(installed.thread.clone())
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
