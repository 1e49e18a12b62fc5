//! Units of work posted to the bridge.
//!
//! A [`Task`] wraps a fallible computation together with the bookkeeping the
//! bridge needs to hand its outcome back to the posting thread: the value or
//! failure, a completion flag, a condition variable for threads parked on
//! completion, and the wakers registered by event pumps.
//!
//! # Kinds of units
//!
//! - [`Task`]: a computation returning `Result<T, E>`. The failure is handed
//!   back verbatim.
//! - [`Job`]: a task whose computation cannot fail with a checked error, built
//!   with [`Task::job`]. Only panics escape it.
//! - [`AsyncTask`]: a task plus a `finish` callback that runs on the reactor
//!   thread once the computation is over. Posting it never blocks.
//!
//! # Example
//!
//! ```ignore
//! use reactor_bridge::{Task, Worker};
//!
//! let task = Task::new(|_| std::fs::read_to_string("Cargo.toml"));
//! let manifest = worker.post(&task)?;
//! ```
//!
//! # How a task completes
//!
//! 1. The worker thread calls [`Runnable::execute`]
//! 2. The computation runs under `catch_unwind`, with its [`TaskContext`] entered
//! 3. The outcome is stored and `completed` is raised under the task's lock
//! 4. Threads parked in [`Task::wait_completed`] and registered wakers are woken
//! 5. The posting thread takes the result and resets the task

use crate::reactor::core::thread_label;
use crate::reactor::{Event, Reactor};

use parking_lot::{Condvar, Mutex};

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::task::Waker;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

type Work<T, E> = Box<dyn FnMut(&TaskContext) -> Result<T, E> + Send>;

/// A task whose computation has no checked failure.
pub type Job<T> = Task<T, Infallible>;

/// Context captured when a unit of work is created.
///
/// Holds the `tracing` span that was current at creation time, which the
/// executing worker thread enters around the computation, so logs emitted by
/// the computation are attributed to the code that created the task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: u64,
    span: tracing::Span,
    origin: String,
}

impl TaskContext {
    /// Captures the calling thread's current span.
    pub fn capture() -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            span: tracing::Span::current(),
            origin: thread_label(),
        }
    }

    /// Process-unique id of the task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Span that was current when the task was created.
    ///
    /// Executing threads enter it around the computation.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Name of the thread that created the task.
    pub fn origin_thread(&self) -> &str {
        &self.origin
    }
}

/// What a finished computation produced.
pub(crate) enum Outcome<T, E> {
    Pending,
    Value(T),
    Failure(E),
    Panic(Box<dyn Any + Send>),
}

impl<T, E> Outcome<T, E> {
    /// Converts into the caller-facing result, resuming a captured panic.
    pub(crate) fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Outcome::Pending => None,
            Outcome::Value(value) => Some(Ok(value)),
            Outcome::Failure(error) => Some(Err(error)),
            Outcome::Panic(payload) => panic::resume_unwind(payload),
        }
    }
}

struct State<T, E> {
    outcome: Outcome<T, E>,
    completed: bool,
    waiters: Vec<Waker>,
}

/// A fallible computation and its completion bookkeeping.
///
/// Tasks are shared between the posting thread and the executing thread, so
/// they are always handled through an `Arc`. A task may be posted again once
/// its previous result was taken and it was [`reset`](Task::reset), but never
/// while it is still in flight.
pub struct Task<T, E> {
    work: Mutex<Work<T, E>>,
    state: Mutex<State<T, E>>,
    done: Condvar,
    context: TaskContext,
    runs: AtomicUsize,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a task running `work`.
    ///
    /// The computation must not assume it runs on any particular thread, and
    /// must not take locks that the reactor thread may hold while pumping.
    ///
    /// # Example
    /// ```ignore
    /// let task = Task::new(|_| -> Result<u32, std::io::Error> { Ok(42) });
    /// ```
    pub fn new<F>(work: F) -> Arc<Self>
    where
        F: FnMut(&TaskContext) -> Result<T, E> + Send + 'static,
    {
        Arc::new(Self {
            work: Mutex::new(Box::new(work)),
            state: Mutex::new(State {
                outcome: Outcome::Pending,
                completed: false,
                waiters: Vec::new(),
            }),
            done: Condvar::new(),
            context: TaskContext::capture(),
            runs: AtomicUsize::new(0),
        })
    }

    /// Checks whether the computation has finished.
    ///
    /// # Returns
    /// true once an outcome (value, failure or panic) is stored, until the
    /// next [`reset`](Task::reset)
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Parks the calling thread until the task completes.
    pub fn wait_completed(&self) {
        let mut state = self.state.lock();

        while !state.completed {
            self.done.wait(&mut state);
        }
    }

    /// Takes the outcome of a completed task.
    ///
    /// Returns `None` while the task is running or once the outcome was
    /// already taken. A panic raised by the computation is resumed on the
    /// calling thread with its original payload.
    pub fn take_result(&self) -> Option<Result<T, E>> {
        self.take_outcome().into_result()
    }

    /// Clears the outcome and completion flag so the task can be posted again.
    pub fn reset(&self) {
        let mut state = self.state.lock();

        state.outcome = Outcome::Pending;
        state.completed = false;
        state.waiters.clear();
    }

    /// Context captured when the task was created.
    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// How many times the computation has been executed.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }

    pub(crate) fn take_outcome(&self) -> Outcome<T, E> {
        let mut state = self.state.lock();

        if !state.completed {
            return Outcome::Pending;
        }

        std::mem::replace(&mut state.outcome, Outcome::Pending)
    }

    /// Stores the outcome, raises the completion flag and wakes waiters.
    ///
    /// This is the only writer of the task's state.
    fn mark_completed(&self, outcome: Outcome<T, E>) {
        let mut state = self.state.lock();

        state.outcome = outcome;
        state.completed = true;
        self.done.notify_all();

        for waker in state.waiters.drain(..) {
            waker.wake();
        }
    }
}

impl<T> Task<T, Infallible>
where
    T: Send + 'static,
{
    /// Creates a job: a task whose computation only fails by panicking.
    pub fn job<F>(mut work: F) -> Arc<Self>
    where
        F: FnMut(&TaskContext) -> T + Send + 'static,
    {
        Task::new(move |context: &TaskContext| Ok(work(context)))
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.context.id)
            .field("completed", &self.state.lock().completed)
            .finish()
    }
}

/// Type-erased unit of work, as seen by worker threads and event pumps.
pub trait Runnable: Send + Sync {
    /// Runs the computation on the calling thread and marks the unit completed.
    fn execute(&self);

    fn is_completed(&self) -> bool;

    /// Parks the calling thread until the unit completes.
    fn wait_completed(&self);

    /// Registers a waker woken on completion, immediately if already complete.
    fn register_waker(&self, waker: &Waker);

    fn context(&self) -> &TaskContext;
}

impl<T, E> Runnable for Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn execute(&self) {
        self.runs.fetch_add(1, Ordering::AcqRel);

        let outcome = {
            let mut work = self.work.lock();

            match panic::catch_unwind(AssertUnwindSafe(|| (*work)(&self.context))) {
                Ok(Ok(value)) => Outcome::Value(value),
                Ok(Err(error)) => Outcome::Failure(error),
                Err(payload) => Outcome::Panic(payload),
            }
        };

        self.mark_completed(outcome);
    }

    fn is_completed(&self) -> bool {
        Task::is_completed(self)
    }

    fn wait_completed(&self) {
        Task::wait_completed(self)
    }

    fn register_waker(&self, waker: &Waker) {
        let mut state = self.state.lock();

        if state.completed {
            waker.wake_by_ref();
        } else {
            state.waiters.push(waker.clone());
        }
    }

    fn context(&self) -> &TaskContext {
        &self.context
    }
}

/// A task whose outcome is delivered to a callback on the reactor thread.
///
/// # Example
/// ```ignore
/// let download = AsyncTask::new(
///     |_| fetch_report(),
///     |result| match result {
///         Ok(report) => show(report),
///         Err(error) => show_error(error),
///     },
/// );
/// worker.post_async(download)?;
/// ```
pub struct AsyncTask<T, E> {
    task: Arc<Task<T, E>>,
    finish: Box<dyn FnOnce(Result<T, E>) + Send>,
}

impl<T, E> AsyncTask<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates an async task.
    ///
    /// # Arguments
    /// * `work` - Computation run on the async worker thread
    /// * `finish` - Receives the computation's result on the reactor thread
    pub fn new<W, F>(work: W, finish: F) -> Self
    where
        W: FnMut(&TaskContext) -> Result<T, E> + Send + 'static,
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Self {
            task: Task::new(work),
            finish: Box::new(finish),
        }
    }

    /// The underlying task.
    pub fn task(&self) -> &Arc<Task<T, E>> {
        &self.task
    }

    /// Binds the task to the reactor its `finish` callback will run on.
    pub(crate) fn into_runnable(self, reactor: Arc<dyn Reactor>) -> Arc<dyn Runnable> {
        Arc::new(Finishing {
            task: self.task,
            finish: Mutex::new(Some(self.finish)),
            reactor,
        })
    }
}

/// An [`AsyncTask`] bound to its reactor.
struct Finishing<T, E> {
    task: Arc<Task<T, E>>,
    finish: Mutex<Option<Box<dyn FnOnce(Result<T, E>) + Send>>>,
    reactor: Arc<dyn Reactor>,
}

impl<T, E> Runnable for Finishing<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn execute(&self) {
        self.task.execute();

        let Some(finish) = self.finish.lock().take() else {
            return;
        };
        let outcome = self.task.take_outcome();

        tracing::trace!(task_id = self.task.context.id, "scheduling async task completion");
        self.reactor.schedule_soon(Event::new(move || {
            if let Some(result) = outcome.into_result() {
                finish(result);
            }
        }));
    }

    fn is_completed(&self) -> bool {
        self.task.is_completed()
    }

    fn wait_completed(&self) {
        self.task.wait_completed()
    }

    fn register_waker(&self, waker: &Waker) {
        Runnable::register_waker(&*self.task, waker)
    }

    fn context(&self) -> &TaskContext {
        &self.task.context
    }
}
