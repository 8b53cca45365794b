use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::ingest::pipeline::{Pipeline, RunOutcome};
use crate::ingest::types::NewsItem;
use crate::store::SeenState;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Admin surface: liveness, on-demand runs, forced re-announce, state dump.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/run", post(run_now))
        .route("/api/force", post(force_latest))
        .route("/api/state", get(seen_state))
        .with_state(state)
}

async fn run_now(State(state): State<AppState>) -> Json<RunOutcome> {
    Json(state.pipeline.run_once().await)
}

#[derive(Serialize)]
struct ForceResp {
    posted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<NewsItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn force_latest(State(state): State<AppState>) -> (StatusCode, Json<ForceResp>) {
    match state.pipeline.force_latest().await {
        Ok(item) => (
            StatusCode::OK,
            Json(ForceResp {
                posted: item.is_some(),
                item,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "newswatch", "forced announce failed: {e:#}");
            (
                StatusCode::BAD_GATEWAY,
                Json(ForceResp {
                    posted: false,
                    item: None,
                    error: Some(format!("{e:#}")),
                }),
            )
        }
    }
}

#[derive(Serialize)]
struct StateResp {
    running: bool,
    #[serde(flatten)]
    state: SeenState,
}

async fn seen_state(State(state): State<AppState>) -> Json<StateResp> {
    Json(StateResp {
        running: state.pipeline.is_running(),
        state: state.pipeline.seen_state().await,
    })
}
