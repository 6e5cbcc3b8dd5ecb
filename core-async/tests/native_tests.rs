//! Integration tests for core-async.
//!
//! Covers the re-exported Tokio primitives and the background runtime used to
//! keep network work off the caller's thread.

use core_async::runtime::BackgroundRuntime;
use core_async::{sync, task, time};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_timeout_success() {
    let result = time::timeout(time::Duration::from_millis(100), async {
        time::sleep(time::Duration::from_millis(10)).await;
        42
    })
    .await;

    assert_eq!(result.unwrap(), 42);
}

#[tokio::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_mutex() {
    let mutex = Arc::new(sync::Mutex::new(0));
    let mutex_clone = mutex.clone();

    let handle = task::spawn(async move {
        let mut guard = mutex_clone.lock().await;
        *guard += 1;
    });

    handle.await.unwrap();

    let guard = mutex.lock().await;
    assert_eq!(*guard, 1);
}

#[tokio::test]
async fn test_broadcast_channel() {
    let (tx, mut rx1) = sync::broadcast::channel(10);
    let mut rx2 = tx.subscribe();

    task::spawn(async move {
        for i in 0..5 {
            tx.send(i).unwrap();
        }
    });

    let mut values1 = vec![];
    let mut values2 = vec![];

    for _ in 0..5 {
        values1.push(rx1.recv().await.unwrap());
        values2.push(rx2.recv().await.unwrap());
    }

    assert_eq!(values1, vec![0, 1, 2, 3, 4]);
    assert_eq!(values2, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_background_runtime_runs_work_off_the_calling_thread() {
    let runtime = BackgroundRuntime::start("bg-test").unwrap();
    let caller = std::thread::current().id();
    let (tx, rx) = std_mpsc::channel();

    runtime.spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        tx.send(std::thread::current().id()).unwrap();
    });

    let worker = rx.recv_timeout(time::Duration::from_secs(2)).unwrap();
    assert_ne!(worker, caller);
    assert!(runtime.is_running());
    assert!(runtime.shutdown(time::Duration::from_secs(1)));
}

#[test]
fn test_background_runtime_multiplexes_concurrent_tasks() {
    let runtime = BackgroundRuntime::start("bg-multiplex").unwrap();
    let (tx, rx) = std_mpsc::channel();

    for (label, delay_ms) in [("slow", 60u64), ("fast", 5u64)] {
        let tx = tx.clone();
        runtime.spawn(async move {
            time::sleep(time::Duration::from_millis(delay_ms)).await;
            tx.send(label).unwrap();
        });
    }

    let first = rx.recv_timeout(time::Duration::from_secs(2)).unwrap();
    let second = rx.recv_timeout(time::Duration::from_secs(2)).unwrap();
    assert_eq!((first, second), ("fast", "slow"));

    assert!(runtime.shutdown(time::Duration::from_secs(1)));
}

#[test]
fn test_shutdown_abandons_in_flight_work_within_grace_period() {
    let runtime = BackgroundRuntime::start("bg-abandon").unwrap();
    let (tx, rx) = std_mpsc::channel::<()>();

    runtime.spawn(async move {
        time::sleep(time::Duration::from_secs(30)).await;
        let _ = tx.send(());
    });

    let started = time::Instant::now();
    assert!(runtime.shutdown(time::Duration::from_secs(1)));
    assert!(started.elapsed() < time::Duration::from_secs(1));

    // The abandoned task was dropped together with its sender.
    assert!(rx.recv_timeout(time::Duration::from_millis(50)).is_err());
}
