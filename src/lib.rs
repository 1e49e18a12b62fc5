//! Synchronous-looking background work for single-threaded reactors.
//!
//! A reactor thread must never block on long computations, or every event
//! queued behind it (input, repaints, timers) freezes. This crate lets code on
//! the reactor thread call [`Worker::post`], which runs a [`Task`] on a
//! background thread and returns the task's result, while the reactor thread
//! keeps dispatching its events in the meantime.
//!
//! # Architecture
//!
//! - **Worker**: orchestrator exposing `post`, `post_job` and `post_async`
//! - **Task / AsyncTask**: units of work carrying their own completion state
//! - **WorkerThread**: strategy executing tasks off the reactor thread
//!   (serial or one thread per task)
//! - **EventPump**: strategy keeping the reactor thread dispatching until a
//!   task completes (manual queue draining or the reactor's own primitive)
//! - **Reactor**: capabilities required from the host event loop, with
//!   [`EventLoop`] as an in-process implementation
//! - **WorkerBuilder / WorkerConfig**: construction from code or TOML
//! - **interrupt**: cooperative interruption of worker threads

mod builder;
mod config;
mod diagnostics;
mod error;
pub mod interrupt;
pub mod pump;
pub mod reactor;
mod task;
mod worker;
pub mod workers;

pub use builder::WorkerBuilder;
pub use config::{EventPumpKind, WorkerConfig, WorkerThreadKind};
pub use diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
pub use error::{PostError, WorkerError};
pub use pump::{ConditionalEventPump, EventFilter, EventPump, QueueEventPump};
pub use reactor::{Event, EventKind, EventLoop, Reactor};
pub use task::{AsyncTask, Job, Runnable, Task, TaskContext};
pub use worker::Worker;
pub use workers::{Strategy, WorkerPool, WorkerThread};
