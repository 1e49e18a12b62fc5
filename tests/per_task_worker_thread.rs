use reactor_bridge::{Strategy, Task, WorkerPool, WorkerThread};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_runner_threads_named_after_pool() {
    let pool = WorkerPool::per_task("per-task-names");
    assert_eq!(pool.strategy(), Strategy::PerTask);
    pool.start().unwrap();

    let tasks: Vec<_> = (0..3)
        .map(|_| Task::job(|_| thread::current().name().unwrap_or("").to_string()))
        .collect();

    for task in &tasks {
        pool.post_task(task.clone());
    }

    let mut names = Vec::new();
    for task in &tasks {
        task.wait_completed();
        names.push(task.take_result().unwrap().unwrap());
    }

    assert!(
        names.iter().all(|name| name.starts_with("per-task-names/")),
        "Unexpected runner names: {names:?}"
    );

    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3, "Every task gets its own runner thread");
}

#[test]
fn test_tasks_run_concurrently() {
    let pool = WorkerPool::per_task("per-task-concurrent");
    pool.start().unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| Task::job(|_| thread::sleep(Duration::from_millis(300))))
        .collect();

    let start = Instant::now();
    for task in &tasks {
        pool.post_task(task.clone());
    }
    for task in &tasks {
        task.wait_completed();
    }

    assert!(
        start.elapsed() < Duration::from_millis(900),
        "Four 300ms tasks should overlap, took {:?}",
        start.elapsed()
    );
}

#[test]
fn test_runner_threads_are_worker_threads() {
    let pool = Arc::new(WorkerPool::per_task("per-task-membership"));
    pool.start().unwrap();

    let inside = pool.clone();
    let task = Task::job(move |_| inside.is_worker_thread());

    pool.post_task(task.clone());
    task.wait_completed();

    assert_eq!(task.take_result(), Some(Ok(true)));
    assert!(!pool.is_worker_thread());
}

#[test]
fn test_stop_and_restart() {
    let pool = WorkerPool::per_task("per-task-lifecycle");

    pool.start().unwrap();
    assert!(pool.is_alive());

    pool.stop();
    assert!(!pool.is_alive());

    pool.start().unwrap();
    let task = Task::job(|_| 9);
    pool.post_task(task.clone());
    task.wait_completed();

    assert_eq!(task.take_result(), Some(Ok(9)));
}
