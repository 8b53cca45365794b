// tests/scheduler.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use newswatch::ingest::scheduler::Scheduler;
use newswatch::store::MemoryStateStore;
use newswatch::DedupMode;

#[tokio::test]
async fn first_tick_runs_eagerly_and_shutdown_stops_the_timer() {
    let transport = Arc::new(CountingTransport::new(TIMELINE));
    let sink = Arc::new(RecordingNotifier::default());
    let p = Arc::new(pipeline(
        cfg(),
        transport.clone(),
        Arc::new(MemoryStateStore::empty(DedupMode::SetDifference)),
        sink.clone(),
    ));

    let scheduler = Scheduler::spawn(p.clone(), Duration::from_secs(3600));
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.attempts() < 5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("startup run delivers");

    assert!(!scheduler.is_finished());
    scheduler.shutdown().await;
    assert_eq!(transport.fetches(), 1, "interval not yet elapsed");
    assert!(!p.is_running());
}

#[tokio::test(start_paused = true)]
async fn ticks_repeat_on_the_interval() {
    let transport = Arc::new(CountingTransport::new(TIMELINE));
    let p = Arc::new(pipeline(
        cfg(),
        transport.clone(),
        Arc::new(MemoryStateStore::empty(DedupMode::SetDifference)),
        Arc::new(RecordingNotifier::default()),
    ));

    let scheduler = Scheduler::spawn(p, Duration::from_secs(60));
    // paused clock auto-advances while every task is idle
    tokio::time::sleep(Duration::from_secs(150)).await;
    scheduler.shutdown().await;
    assert_eq!(transport.fetches(), 3, "ticks at 0s, 60s and 120s");
}
