// Tests for the periodic progress clock.

use audio_demo::ProgressClock;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_clock_ticks_past_limit_then_completes() {
    let clock = ProgressClock::new(Duration::from_millis(100));
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = oneshot::channel();
    let started = Instant::now();

    let recorded = Arc::clone(&ticks);
    let _handle = clock.spawn(
        5,
        move |tick| {
            recorded.lock().unwrap().push((tick, started.elapsed().as_millis()));
            ControlFlow::Continue(())
        },
        move || {
            let _ = done_tx.send(());
        },
    );

    done_rx.await.expect("clock completes");

    let ticks = ticks.lock().unwrap().clone();
    assert_eq!(
        ticks,
        vec![(0, 100), (1, 200), (2, 300), (3, 400), (4, 500), (5, 600), (6, 700)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_break_ends_without_completion() {
    let clock = ProgressClock::new(Duration::from_millis(100));
    let ticks = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let counted = Arc::clone(&ticks);
    let finished = Arc::clone(&completed);
    let handle = clock.spawn(
        100,
        move |tick| {
            counted.fetch_add(1, Ordering::SeqCst);
            if tick == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        },
        move || {
            finished.fetch_add(1, Ordering::SeqCst);
        },
    );

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(completed.load(Ordering::SeqCst), 0);
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_ticks() {
    let clock = ProgressClock::new(Duration::from_millis(100));
    let ticks = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let counted = Arc::clone(&ticks);
    let finished = Arc::clone(&completed);
    let handle = clock.spawn(
        100,
        move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        },
        move || {
            finished.fetch_add(1, Ordering::SeqCst);
        },
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    handle.cancel();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_cancels() {
    let clock = ProgressClock::new(Duration::from_millis(100));
    let ticks = Arc::new(AtomicUsize::new(0));

    let counted = Arc::clone(&ticks);
    let handle = clock.spawn(
        100,
        move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        },
        || {},
    );
    drop(handle);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}
