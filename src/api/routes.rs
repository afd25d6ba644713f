use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::aggregator::{PerformanceAggregator, PerformanceFilter, PerformanceSummary};
use crate::api::health::RunStatus;
use crate::db::models::{parse_date, PickResultRow};
use crate::db::store::ResultStore;
use crate::error::AppError;
use crate::reconciler::Reconciler;
use crate::types::RunReport;

#[derive(Clone)]
pub struct ApiState {
    pub store: ResultStore,
    pub aggregator: PerformanceAggregator,
    pub reconciler: Arc<Reconciler>,
    pub status: Arc<RunStatus>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/runs/:date", post(trigger_run))
        .route("/results/:date", get(get_results))
        .route("/performance", get(get_performance))
        .route("/schedule", put(set_schedule))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query / body structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PerformanceQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub league: Option<String>,
}

#[derive(Deserialize)]
pub struct ScheduleBody {
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub schedule_enabled: bool,
    pub run_in_progress: bool,
    pub last_run: Option<RunReport>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub schedule_enabled: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        schedule_enabled: state.status.schedule_enabled(),
        run_in_progress: state.status.running(),
        last_run: state.status.last_run(),
    })
}

/// Manual "check results for date X" trigger. 409 while a run is active.
async fn trigger_run(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> Result<Json<RunReport>, AppError> {
    let date = parse_date(&date).map_err(|_| AppError::BadRequest(format!("bad date: {date}")))?;
    let report = state.reconciler.try_run_for_date(date).await?;
    Ok(Json(report))
}

async fn get_results(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<PickResultRow>>, AppError> {
    let date = parse_date(&date).map_err(|_| AppError::BadRequest(format!("bad date: {date}")))?;
    let rows = state.store.results_for_date(date).await?;
    Ok(Json(rows))
}

async fn get_performance(
    State(state): State<ApiState>,
    Query(params): Query<PerformanceQuery>,
) -> Result<Json<PerformanceSummary>, AppError> {
    let filter = PerformanceFilter {
        from: params
            .from
            .as_deref()
            .map(|d| parse_date(d).map_err(|_| AppError::BadRequest(format!("bad from date: {d}"))))
            .transpose()?,
        to: params
            .to
            .as_deref()
            .map(|d| parse_date(d).map_err(|_| AppError::BadRequest(format!("bad to date: {d}"))))
            .transpose()?,
        league: params
            .league
            .as_deref()
            .map(|l| {
                l.parse()
                    .map_err(|_| AppError::BadRequest(format!("unknown league: {l}")))
            })
            .transpose()?,
    };
    let summary = state.aggregator.summary(&filter).await?;
    Ok(Json(summary))
}

async fn set_schedule(
    State(state): State<ApiState>,
    Json(body): Json<ScheduleBody>,
) -> Json<ScheduleResponse> {
    state.status.set_schedule_enabled(body.enabled);
    Json(ScheduleResponse {
        schedule_enabled: state.status.schedule_enabled(),
    })
}
