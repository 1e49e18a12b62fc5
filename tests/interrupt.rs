use reactor_bridge::interrupt::{self, Interrupted, Interrupter};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sleep_completes_without_interruption() {
    let interrupter = Interrupter::new();
    let start = Instant::now();

    assert_eq!(interrupter.sleep(Duration::from_millis(50)), Ok(()));
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_interrupt_wakes_sleep_and_clears_flag() {
    let interrupter = Interrupter::new();
    let remote = interrupter.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.interrupt();
    });

    let start = Instant::now();
    let result = interrupter.sleep(Duration::from_secs(5));
    handle.join().unwrap();

    assert_eq!(result, Err(Interrupted));
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "Sleep should end as soon as the interrupt arrives"
    );
    assert!(
        !interrupter.is_interrupted(),
        "A reported interruption is consumed"
    );
}

#[test]
fn test_pending_interrupt_ends_sleep_immediately() {
    let interrupter = Interrupter::new();
    interrupter.interrupt();

    assert_eq!(interrupter.sleep(Duration::from_secs(5)), Err(Interrupted));
}

#[test]
fn test_clear_reports_previous_state() {
    let interrupter = Interrupter::new();

    assert!(!interrupter.clear());
    interrupter.interrupt();
    assert!(interrupter.is_interrupted());
    assert!(interrupter.clear());
    assert!(!interrupter.is_interrupted());
}

#[test]
fn test_plain_threads_have_no_interrupter() {
    assert!(interrupt::current().is_none());
    assert!(!interrupt::is_interrupted());
    assert!(!interrupt::interrupted());
    assert_eq!(interrupt::sleep(Duration::from_millis(10)), Ok(()));
}
