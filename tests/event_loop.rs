use reactor_bridge::{Diagnostic, Event, EventKind, EventLoop, Reactor, WorkerError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_run_until_idle_dispatches_in_order() {
    let event_loop = EventLoop::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    for index in 0..3 {
        let log = log.clone();
        event_loop.post(move || log.lock().unwrap().push(index));
    }
    assert_eq!(event_loop.pending(), 3);

    event_loop.run_until_idle().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(event_loop.pending(), 0);
}

#[test]
fn test_run_returns_after_quit_from_other_thread() {
    let event_loop = EventLoop::new();
    let handle = event_loop.clone();

    let quitter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.quit();
    });

    event_loop.run().unwrap();
    quitter.join().unwrap();
}

#[test]
fn test_only_owner_thread_runs_the_loop() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_reactor_thread());

    let handle = event_loop.clone();
    let result = thread::Builder::new()
        .name("intruder".to_string())
        .spawn(move || (handle.is_reactor_thread(), handle.run_until_idle()))
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(
        result,
        (
            false,
            Err(WorkerError::IllegalCallContext {
                thread: "intruder".to_string()
            })
        )
    );
}

#[test]
fn test_bind_current_thread_moves_ownership() {
    let event_loop = EventLoop::new();
    let handle = event_loop.clone();

    let owned_elsewhere = thread::spawn(move || {
        handle.bind_current_thread();
        handle.is_reactor_thread()
    })
    .join()
    .unwrap();

    assert!(owned_elsewhere);
    assert!(!event_loop.is_reactor_thread());
}

#[test]
fn test_panicking_event_reported_and_loop_continues() {
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let sink_diagnostics = diagnostics.clone();
    let event_loop = EventLoop::with_diagnostics(Arc::new(move |diagnostic: Diagnostic| {
        sink_diagnostics.lock().unwrap().push(diagnostic)
    }));

    let reached = Arc::new(Mutex::new(false));
    let flag = reached.clone();
    event_loop.post_event(Event::with_kind(EventKind::Paint, || panic!("paint failed")));
    event_loop.post(move || *flag.lock().unwrap() = true);

    event_loop.run_until_idle().unwrap();

    assert!(*reached.lock().unwrap(), "Later events still run");
    assert_eq!(
        *diagnostics.lock().unwrap(),
        vec![Diagnostic::DispatchPanic {
            kind: EventKind::Paint,
            message: "paint failed".to_string(),
        }]
    );
}

#[test]
fn test_wake_event_is_a_no_op() {
    let event_loop = EventLoop::new();
    event_loop.wake();

    let event = event_loop.try_next_event().unwrap();
    assert_eq!(event.kind(), EventKind::Wake);
    event_loop.dispatch(event);

    assert!(event_loop.try_next_event().is_none());
}

#[test]
fn test_rescheduled_events_go_to_the_front() {
    let event_loop = EventLoop::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let later_log = log.clone();
    event_loop.post(move || later_log.lock().unwrap().push("later"));

    let events = ["first", "second"]
        .into_iter()
        .map(|name| {
            let log = log.clone();
            Event::new(move || log.lock().unwrap().push(name))
        })
        .collect();
    event_loop.reschedule(events);

    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "later"]);
}
