//! Built-in worker thread strategies.
//!
//! Both strategies share one consumer thread that takes tasks from a FIFO
//! queue. They differ in what the consumer does with a task:
//!
//! - [`Strategy::Serial`]: executes it itself, so tasks run one at a time in
//!   submission order
//! - [`Strategy::PerTask`]: hands it to a fresh runner thread named
//!   `<name>/<n>`, so tasks run concurrently
//!
//! # Stopping and restarting
//!
//! Every start begins a new generation with its own [`Interrupter`]. Stopping
//! raises the interrupter and wakes the queue. The consumer exits once it is
//! idle or once the task it is running returns with the flag still raised.
//! A task may swallow the interruption (clear the flag), in which case the
//! consumer keeps going.
//!
//! Starting again while a previous consumer is still busy spawns a new
//! consumer that waits for the old one to exit before taking any task. The
//! old one finishes its task and exits without taking another, so two tasks
//! of a serial pool never overlap.
//!
//! Dropping the pool closes its queue: the consumer runs what is left, then
//! exits.

use crate::error::WorkerError;
use crate::interrupt::Interrupter;
use crate::task::Runnable;
use crate::workers::WorkerThread;
use crate::workers::context::{current_pool, enter_context};
use crate::workers::queue::TaskQueue;

use parking_lot::Mutex;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

/// How a [`WorkerPool`] runs the tasks it takes from its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One thread executes every task, in submission order.
    Serial,
    /// Every task gets a dedicated runner thread.
    PerTask,
}

/// A [`WorkerThread`] backed by OS threads.
///
/// # Example
/// ```ignore
/// let pool = WorkerPool::serial("indexer");
/// pool.start()?;
///
/// pool.post_task(task.clone());
/// task.wait_completed();
/// ```
pub struct WorkerPool {
    shared: Arc<Shared>,
}

struct Shared {
    id: usize,
    name: String,
    strategy: Strategy,
    queue: TaskQueue,
    consumer: Mutex<Option<Consumer>>,
    generation: AtomicU64,
    runners: AtomicU64,
}

/// The consumer thread of one generation.
struct Consumer {
    interrupter: Interrupter,
    handle: JoinHandle<()>,
}

impl Consumer {
    /// A consumer asked to stop is no longer alive, even while it finishes
    /// its current task.
    fn is_alive(&self) -> bool {
        !self.handle.is_finished() && !self.interrupter.is_interrupted()
    }
}

impl WorkerPool {
    /// Creates a stopped pool.
    ///
    /// # Arguments
    /// * `name` - Name of the consumer thread, and prefix of runner threads
    /// * `strategy` - How taken tasks are run
    pub fn new(name: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                strategy,
                queue: TaskQueue::new(),
                consumer: Mutex::new(None),
                generation: AtomicU64::new(0),
                runners: AtomicU64::new(0),
            }),
        }
    }

    /// A pool executing tasks one at a time on a thread called `name`.
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, Strategy::Serial)
    }

    /// A pool executing each task on its own thread, named `name/<n>`.
    pub fn per_task(name: impl Into<String>) -> Self {
        Self::new(name, Strategy::PerTask)
    }

    /// The pool name, also used to name its threads.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the strategy given at construction.
    pub fn strategy(&self) -> Strategy {
        self.shared.strategy
    }

    /// Number of tasks waiting for the consumer.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }
}

impl WorkerThread for WorkerPool {
    fn start(&self) -> Result<(), WorkerError> {
        let mut consumer = self.shared.consumer.lock();

        if let Some(current) = consumer.as_ref()
            && current.is_alive()
        {
            return Ok(());
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let interrupter = Interrupter::new();

        // The previous consumer may still be running a task.
        let previous = consumer.take().map(|previous| {
            previous.interrupter.interrupt();
            previous.handle
        });

        let shared = self.shared.clone();
        let thread_interrupter = interrupter.clone();
        let handle = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || {
                if let Some(previous) = previous {
                    let _ = previous.join();
                }
                shared.consume(generation, thread_interrupter)
            })
            .map_err(|error| WorkerError::Spawn {
                name: self.shared.name.clone(),
                reason: error.to_string(),
            })?;

        *consumer = Some(Consumer {
            interrupter,
            handle,
        });

        // A consumer of an older generation may be parked on the queue.
        self.shared.queue.wake_all();

        tracing::debug!(pool = %self.shared.name, generation, "worker thread started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(consumer) = self.shared.consumer.lock().as_ref() {
            tracing::debug!(pool = %self.shared.name, "interrupting worker thread");
            consumer.interrupter.interrupt();
        }

        self.shared.queue.wake_all();
    }

    fn is_alive(&self) -> bool {
        self.shared
            .consumer
            .lock()
            .as_ref()
            .is_some_and(Consumer::is_alive)
    }

    fn is_worker_thread(&self) -> bool {
        current_pool() == Some(self.shared.id)
    }

    fn post_task(&self, task: Arc<dyn Runnable>) {
        self.shared.queue.push(task);
    }

    fn run_task(&self, task: &dyn Runnable) {
        execute(task);
    }
}

impl Shared {
    /// Body of a consumer thread.
    fn consume(self: Arc<Self>, generation: u64, interrupter: Interrupter) {
        let is_current = || self.generation.load(Ordering::Acquire) == generation;

        enter_context(self.id, interrupter.clone(), || {
            while !interrupter.is_interrupted() && is_current() {
                let Some(task) = self.queue.take(&interrupter, is_current) else {
                    break;
                };

                match self.strategy {
                    Strategy::Serial => execute(task.as_ref()),
                    Strategy::PerTask => self.spawn_runner(task),
                }
            }
        });

        tracing::debug!(pool = %self.name, generation, "worker thread exiting");
    }

    fn spawn_runner(&self, task: Arc<dyn Runnable>) {
        let serial = self.runners.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("{}/{}", self.name, serial);
        let pool = self.id;

        let runner_task = task.clone();
        let spawned = thread::Builder::new()
            .name(name.clone())
            .spawn(move || enter_context(pool, Interrupter::new(), || execute(runner_task.as_ref())));

        if let Err(error) = spawned {
            tracing::warn!(runner = %name, %error, "failed to spawn runner thread, running task inline");
            execute(task.as_ref());
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("strategy", &self.shared.strategy)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.queue.close();
    }
}

/// Runs `task` on the calling thread inside the span it was created under.
fn execute(task: &dyn Runnable) {
    let context = task.context();
    let _entered = context.span().enter();

    tracing::debug!(task_id = context.id(), origin = context.origin_thread(), "executing task");
    task.execute();
    tracing::debug!(task_id = context.id(), "task run complete");
}
