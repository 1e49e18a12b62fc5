use reactor_bridge::{AsyncTask, EventLoop, Worker, WorkerThread};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

#[test]
fn test_finish_runs_on_reactor_thread() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop.clone()));
    let reactor_thread = thread::current().id();

    let threads: Arc<Mutex<Option<(ThreadId, ThreadId)>>> = Arc::new(Mutex::new(None));
    let finish_threads = threads.clone();
    let quit = event_loop.clone();

    let task = AsyncTask::new(
        |_| -> Result<ThreadId, String> { Ok(thread::current().id()) },
        move |result| {
            let work_thread = result.unwrap();
            *finish_threads.lock().unwrap() = Some((work_thread, thread::current().id()));
            quit.quit();
        },
    );

    worker.post_async(task).unwrap();
    event_loop.run().unwrap();

    let (work_thread, finish_thread) = threads.lock().unwrap().take().unwrap();
    assert_ne!(work_thread, reactor_thread, "The computation runs off the reactor");
    assert_eq!(finish_thread, reactor_thread, "finish runs on the reactor thread");
}

#[test]
fn test_post_async_does_not_block() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop.clone()));
    let quit = event_loop.clone();

    let task = AsyncTask::new(
        |_| -> Result<(), String> {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        },
        move |_| quit.quit(),
    );

    let start = std::time::Instant::now();
    worker.post_async(task).unwrap();
    assert!(start.elapsed() < Duration::from_millis(150));

    event_loop.run().unwrap();
}

#[test]
fn test_failure_is_delivered_to_finish() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop.clone()));

    let delivered = Arc::new(Mutex::new(None));
    let finish_delivered = delivered.clone();
    let quit = event_loop.clone();

    let task = AsyncTask::new(
        |_| -> Result<u32, String> { Err("unreachable host".to_string()) },
        move |result| {
            *finish_delivered.lock().unwrap() = Some(result);
            quit.quit();
        },
    );

    worker.post_async(task).unwrap();
    event_loop.run().unwrap();

    assert_eq!(
        *delivered.lock().unwrap(),
        Some(Err("unreachable host".to_string()))
    );
}

#[test]
fn test_post_async_from_foreign_thread() {
    let event_loop = EventLoop::new();
    let worker = Arc::new(Worker::new(Arc::new(event_loop.clone())));

    let delivered = Arc::new(Mutex::new(None));
    let finish_delivered = delivered.clone();
    let quit = event_loop.clone();

    let foreign_worker = worker.clone();
    thread::spawn(move || {
        let task = AsyncTask::new(
            |_| -> Result<&'static str, String> { Ok("from afar") },
            move |result| {
                *finish_delivered.lock().unwrap() = Some(result);
                quit.quit();
            },
        );
        foreign_worker.post_async(task)
    })
    .join()
    .unwrap()
    .unwrap();

    event_loop.run().unwrap();

    assert_eq!(*delivered.lock().unwrap(), Some(Ok("from afar")));
}

#[test]
fn test_async_tasks_use_their_own_worker_thread() {
    let event_loop = EventLoop::new();
    let worker = Worker::new(Arc::new(event_loop.clone()));

    let runner = Arc::new(Mutex::new(String::new()));
    let finish_runner = runner.clone();
    let quit = event_loop.clone();

    let task = AsyncTask::new(
        |_| -> Result<String, String> { Ok(thread::current().name().unwrap_or("").to_string()) },
        move |result| {
            *finish_runner.lock().unwrap() = result.unwrap_or_default();
            quit.quit();
        },
    );

    worker.post_async(task).unwrap();
    event_loop.run().unwrap();

    let runner = runner.lock().unwrap();
    assert!(
        runner.starts_with("bridge-worker-async/"),
        "Unexpected async runner name {runner}"
    );
    assert!(worker.async_worker_thread().is_alive());
    assert!(
        !worker.worker_thread().is_alive(),
        "The sync worker thread was never needed"
    );
}
