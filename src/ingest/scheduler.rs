// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::pipeline::{Pipeline, RunOutcome};

/// Recurring trigger owning its timer task. The first tick fires
/// immediately, which is the eager startup run.
pub struct Scheduler {
    handle: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
}

impl Scheduler {
    pub fn spawn(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // a tick that lands while a run is still going is dropped, not queued
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::info!(target: "newswatch", "scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        counter!("newswatch_ticks_total").increment(1);
                        let outcome = pipeline.run_once().await;
                        if let RunOutcome::FetchFailed { error } = &outcome {
                            tracing::debug!(target: "newswatch", %error, "tick degraded, retrying next interval");
                        }
                    }
                }
            }
        });
        Self {
            handle,
            stop: Some(stop_tx),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the timer and wait for an in-flight run to complete.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(target: "newswatch", "scheduler task ended abnormally: {e}");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.stop.is_some() {
            self.handle.abort();
        }
    }
}
