// src/ingest/mod.rs
pub mod dedup;
pub mod dom;
pub mod extract;
pub mod http;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod types;

pub use pipeline::{Pipeline, RunOutcome};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("newswatch_ticks_total", "Scheduler ticks fired.");
        describe_counter!("newswatch_runs_total", "Pipeline runs started.");
        describe_counter!(
            "newswatch_runs_skipped_total",
            "Triggers ignored because a run was already in progress."
        );
        describe_counter!("newswatch_fetch_errors_total", "Page fetch failures.");
        describe_counter!(
            "newswatch_extracted_total",
            "Items materialized by the extraction cascade."
        );
        describe_counter!(
            "newswatch_extract_strategy_total",
            "Cascade wins per extraction strategy."
        );
        describe_counter!("newswatch_fresh_total", "Items detected as new.");
        describe_counter!("newswatch_delivered_total", "Items announced successfully.");
        describe_counter!(
            "newswatch_delivery_errors_total",
            "Announcements the sink rejected or failed."
        );
        describe_counter!(
            "newswatch_state_write_errors_total",
            "Persisted state writes that failed."
        );
        describe_histogram!("newswatch_extract_ms", "Extraction time in milliseconds.");
        describe_gauge!(
            "newswatch_last_run_ts",
            "Unix ts when the pipeline last completed a run."
        );
    });
}
