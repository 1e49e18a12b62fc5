use reactor_bridge::{
    Diagnostic, EventLoop, EventPump, PostError, QueueEventPump, Reactor, Runnable, Task, Worker,
    WorkerBuilder, WorkerError, WorkerThread,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
struct LookupError {
    key: String,
    code: i32,
}

#[derive(Debug, PartialEq)]
struct Marker(&'static str);

/// Queue pump counting how often it was entered.
#[derive(Default)]
struct CountingPump {
    inner: QueueEventPump,
    entered: AtomicUsize,
}

impl EventPump for CountingPump {
    fn pump_events(&self, reactor: &Arc<dyn Reactor>, task: &dyn Runnable) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.inner.pump_events(reactor, task);
    }
}

#[test]
fn test_post_returns_value() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));

    let task = Task::new(|_| -> Result<u64, LookupError> { Ok(6 * 7) });

    assert_eq!(worker.post(&task).unwrap(), 42);
}

#[test]
fn test_post_runs_task_off_the_reactor_thread() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));
    let reactor_thread = thread::current().id();

    let task = Task::job(move |_| thread::current().id() != reactor_thread);

    assert!(worker.post_job(&task).unwrap());
}

#[test]
fn test_post_delivers_task_error_verbatim() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));
    let expected = LookupError {
        key: "user:7".to_string(),
        code: 404,
    };

    let error = expected.clone();
    let task = Task::new(move |_| -> Result<(), LookupError> { Err(error.clone()) });

    match worker.post(&task) {
        Err(PostError::Task(error)) => assert_eq!(error, expected),
        other => panic!("Expected the task's own error, got {other:?}"),
    }
}

#[test]
fn test_post_resumes_panic_with_original_payload() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));

    let task = Task::job(|_| -> u32 { panic::panic_any(Marker("broken invariant")) });

    let payload = panic::catch_unwind(AssertUnwindSafe(|| worker.post_job(&task))).unwrap_err();

    assert_eq!(
        payload.downcast_ref::<Marker>(),
        Some(&Marker("broken invariant"))
    );
    assert!(!task.is_completed(), "The task is reset even when it panicked");
}

#[test]
fn test_post_from_foreign_thread_is_rejected() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop)));
    let task = Task::job(|_| 1);

    let foreign_worker = worker.clone();
    let foreign_task = task.clone();
    let result = thread::Builder::new()
        .name("foreign".to_string())
        .spawn(move || foreign_worker.post_job(&foreign_task))
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(
        result,
        Err(WorkerError::IllegalCallContext {
            thread: "foreign".to_string()
        })
    );
    assert_eq!(task.run_count(), 0, "A rejected task never runs");
}

#[test]
fn test_nested_post_runs_inline_on_worker_thread() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop)));

    let inner_worker = worker.clone();
    let outer = Task::job(move |_| {
        let outer_thread = thread::current().id();
        let inner = Task::job(|_| thread::current().id());

        let inner_thread = inner_worker.post_job(&inner).unwrap();
        inner_thread == outer_thread
    });

    assert!(
        worker.post_job(&outer).unwrap(),
        "Nested posts run on the posting worker thread"
    );
}

#[test]
fn test_nested_post_does_not_pump_events() {
    let event_loop = EventLoop::new();
    let pump = Arc::new(CountingPump::default());
    let worker = Arc::new(
        WorkerBuilder::new(Arc::new(event_loop))
            .event_pump(pump.clone())
            .build()
            .unwrap(),
    );

    let inner_worker = worker.clone();
    let outer = Task::job(move |_| {
        let inner = Task::job(|_| 7);
        inner_worker.post_job(&inner).unwrap()
    });

    assert_eq!(worker.post_job(&outer).unwrap(), 7);
    assert_eq!(
        pump.entered.load(Ordering::SeqCst),
        1,
        "Only the outer post pumps reactor events"
    );
}

#[test]
fn test_post_from_event_dispatched_while_pumping() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop.clone())));

    let nested_result = Arc::new(Mutex::new(None));
    let handle = event_loop.clone();
    let event_worker = worker.clone();
    let event_result = nested_result.clone();
    let outer = Task::job(move |_| {
        let worker = event_worker.clone();
        let result = event_result.clone();

        handle.post(move || {
            let nested = Task::job(|_| "nested");
            *result.lock().unwrap() = Some(worker.post_job(&nested).unwrap());
        });

        thread::sleep(Duration::from_millis(100));
        "outer"
    });

    assert_eq!(worker.post_job(&outer).unwrap(), "outer");
    assert_eq!(*nested_result.lock().unwrap(), Some("nested"));
}

#[test]
fn test_task_can_be_posted_again() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));

    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();
    let task = Task::job(move |_| {
        let mut counter = counter_clone.lock().unwrap();
        *counter += 1;
        *counter
    });

    assert_eq!(worker.post_job(&task).unwrap(), 1);
    assert!(!task.is_completed(), "Posting resets the task");
    assert_eq!(worker.post_job(&task).unwrap(), 2);
    assert_eq!(task.run_count(), 2);
}

#[test]
fn test_post_job_checked_failure_is_contract_violation() {
    let event_loop = EventLoop::new();
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let sink_diagnostics = diagnostics.clone();
    let worker = WorkerBuilder::new(Arc::new(event_loop))
        .diagnostics(Arc::new(move |diagnostic: Diagnostic| {
            sink_diagnostics.lock().unwrap().push(diagnostic)
        }))
        .build()
        .unwrap();

    let task = Task::new(|_| -> Result<(), String> { Err("disk full".to_string()) });
    let task_id = task.context().id();

    let payload = panic::catch_unwind(AssertUnwindSafe(|| worker.post_job(&task))).unwrap_err();

    assert!(matches!(
        payload.downcast_ref::<WorkerError>(),
        Some(WorkerError::ContractViolation(message)) if message.contains("disk full")
    ));
    assert_eq!(
        *diagnostics.lock().unwrap(),
        vec![Diagnostic::ContractViolation {
            task_id,
            message: "\"disk full\"".to_string(),
        }]
    );
}

#[test]
fn test_setters_reject_none() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));

    assert!(matches!(
        worker.set_event_pump(None),
        Err(WorkerError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        worker.set_worker_thread(None),
        Err(WorkerError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        worker.set_async_worker_thread(None),
        Err(WorkerError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_installed_worker_thread_is_used() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));
    let pool: Arc<dyn WorkerThread> = Arc::new(reactor_bridge::WorkerPool::serial("custom"));

    worker.set_worker_thread(Some(pool.clone())).unwrap();
    assert!(Arc::ptr_eq(&worker.worker_thread(), &pool));

    let task = Task::job(|_| thread::current().name().unwrap_or("").to_string());
    assert_eq!(worker.post_job(&task).unwrap(), "custom");
}

#[test]
fn test_dead_worker_thread_is_restarted() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop));

    let first = Task::job(|_| 1);
    assert_eq!(worker.post_job(&first).unwrap(), 1);

    let worker_thread = worker.worker_thread();
    worker_thread.stop();

    let deadline = Instant::now() + Duration::from_secs(2);
    while worker_thread.is_alive() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!worker_thread.is_alive());

    let second = Task::job(|_| 2);
    assert_eq!(worker.post_job(&second).unwrap(), 2);
    assert!(worker_thread.is_alive(), "Posting restarts the worker thread");
}

#[test]
fn test_serial_posts_from_nested_pumps_queue_in_order() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop.clone())));

    let log = Arc::new(Mutex::new(Vec::new()));
    let handle = event_loop.clone();
    let event_worker = worker.clone();
    let outer_log = log.clone();
    let outer = Task::job(move |_| {
        let worker = event_worker.clone();
        let nested_log = outer_log.clone();

        handle.post(move || {
            let log = nested_log.clone();
            let nested = Task::job(move |_| log.lock().unwrap().push("nested"));
            worker.post_job(&nested).unwrap();
        });

        thread::sleep(Duration::from_millis(100));
        outer_log.lock().unwrap().push("outer");
    });

    worker.post_job(&outer).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer", "nested"],
        "The serial worker thread runs the nested task after the outer one"
    );
}

#[test]
fn test_stopped_worker_thread_finishes_task_before_next_one() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop.clone())));

    let log = Arc::new(Mutex::new(Vec::new()));
    let handle = event_loop.clone();
    let event_worker = worker.clone();
    let outer_log = log.clone();
    let outer = Task::job(move |_| {
        outer_log.lock().unwrap().push("outer-start");
        thread::sleep(Duration::from_millis(100));
        event_worker.worker_thread().stop();

        let worker = event_worker.clone();
        let nested_log = outer_log.clone();
        handle.post(move || {
            let log = nested_log.clone();
            let nested = Task::job(move |_| log.lock().unwrap().push("nested"));
            worker.post_job(&nested).unwrap();
        });

        thread::sleep(Duration::from_millis(300));
        outer_log.lock().unwrap().push("outer-end");
    });

    worker.post_job(&outer).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer-start", "outer-end", "nested"],
        "The restarted worker thread waits for the task still running"
    );
}
