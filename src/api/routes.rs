use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::stats::{RunOutcome, StatsQuery};

use super::dashboard::now_ms;
use super::server::AppState;
use super::types::*;

fn parse_query(params: &StatsParams) -> Result<StatsQuery, (StatusCode, String)> {
    params.to_query().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid range. Allowed: day, week, month, quarter, year, all, custom".into(),
        )
    })
}

pub async fn operators(State(state): State<AppState>) -> impl IntoResponse {
    Json(DashboardResponse::from(state.dashboard.view().await))
}

/// Stores new query parameters and recomputes in the background.
pub async fn set_query(
    State(state): State<AppState>,
    Json(params): Json<StatsParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = parse_query(&params)?;
    state.dashboard.set_query(query).await;

    let dashboard = state.dashboard.clone();
    tokio::spawn(async move {
        dashboard.refresh(query, now_ms()).await;
    });

    Ok((StatusCode::ACCEPTED, Json(query)))
}

/// Runs the engine with the given parameters and waits for the result.
pub async fn operator_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let query = parse_query(&params)?;
    state.dashboard.set_query(query).await;

    match state.dashboard.refresh(query, now_ms()).await {
        RunOutcome::Completed { result: Ok(report), .. } => Ok(Json(StatsResponse::from(&report))),
        RunOutcome::Completed { result: Err(e), .. } => Err((StatusCode::BAD_GATEWAY, e.to_string())),
        RunOutcome::Superseded { .. } => Err((
            StatusCode::CONFLICT,
            "Superseded by a newer request".into(),
        )),
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        snapshot_chats: state.snapshots.len().await,
        latest_run: state.dashboard.engine().latest_token().0,
    })
}
