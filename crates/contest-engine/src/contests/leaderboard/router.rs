use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::stream;
use serde::Deserialize;
use serde_json::json;

use crate::contests::leaderboard::domain::{EntrantId, SubmissionPayload};
use crate::contests::leaderboard::pipeline::{RefreshError, RefreshEvent};
use crate::contests::leaderboard::ranking::{SortDirection, SortKey, SortSpec};
use crate::contests::leaderboard::repository::{SubmissionStore, SubmissionStoreError};
use crate::contests::leaderboard::scheduler::SchedulerError;
use crate::contests::leaderboard::service::{LeaderboardService, ServiceError};
use crate::contests::leaderboard::sources::{ContestDirectory, MetricsSource};
use crate::contests::leaderboard::standings::PageRequest;
use crate::contests::ContestId;

/// Router builder exposing the leaderboard HTTP surface.
pub fn leaderboard_router<S, M, D>(service: Arc<LeaderboardService<S, M, D>>) -> Router
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/contests/:contest_id/standings",
            get(standings_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/entrants/:entrant_id",
            get(entrant_detail_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/submissions",
            post(submit_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/events",
            get(events_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/live",
            post(go_live_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/conclude",
            post(conclude_handler::<S, M, D>),
        )
        .route(
            "/api/v1/contests/:contest_id/recompute",
            post(recompute_handler::<S, M, D>),
        )
        .route("/api/v1/submissions/score", post(score_preview_handler::<S, M, D>))
        .with_state(service)
}

/// Query parameters accepted by the standings endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StandingsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<SortKey>,
    pub direction: Option<SortDirection>,
}

pub(crate) async fn standings_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
    Query(query): Query<StandingsQuery>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        query.page.unwrap_or(defaults.page),
        query.page_size.unwrap_or(defaults.page_size),
    );
    let sort = SortSpec::new(
        query.sort.unwrap_or_default(),
        query.direction.unwrap_or_default(),
    );

    match service.standings(&contest_id, page, sort).await {
        Ok(standings) => (StatusCode::OK, axum::Json(standings)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn entrant_detail_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path((contest_id, entrant_id)): Path<(String, String)>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    let entrant_id = EntrantId(entrant_id);
    match service.entrant_detail(&contest_id, &entrant_id).await {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
    axum::Json(payload): axum::Json<SubmissionPayload>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    match service.submit_for_scoring(&contest_id, payload).await {
        Ok(scored) => (StatusCode::ACCEPTED, axum::Json(scored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_preview_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    axum::Json(payload): axum::Json<SubmissionPayload>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    match service.score_preview(payload) {
        Ok(scored) => (StatusCode::OK, axum::Json(scored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn events_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    match service.subscribe(&contest_id).await {
        Ok(events) => {
            let stream = stream::unfold(events, |mut events| async move {
                let event = events.recv().await?;
                Some((Ok::<_, Infallible>(sse_event(&event)), events))
            });
            Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn go_live_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    match service.go_live(&contest_id).await {
        Ok(()) => {
            let payload = json!({
                "contest_id": contest_id.0,
                "refreshing": true,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn conclude_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    match service.conclude(&contest_id).await {
        Ok(()) => {
            let payload = json!({
                "contest_id": contest_id.0,
                "refreshing": false,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recompute_handler<S, M, D>(
    State(service): State<Arc<LeaderboardService<S, M, D>>>,
    Path(contest_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    let contest_id = ContestId(contest_id);
    match service.recompute_now(&contest_id).await {
        Ok(snapshot) => {
            let payload = json!({
                "contest_id": snapshot.contest_id.0,
                "computed_at": snapshot.computed_at,
                "entrants": snapshot.entries.len(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn sse_event(event: &RefreshEvent) -> Event {
    let built = match event {
        RefreshEvent::Standings(snapshot) => Event::default()
            .event("standings")
            .json_data(snapshot.as_ref()),
        RefreshEvent::CycleFailed {
            contest_id,
            reason,
            last_computed_at,
        } => Event::default().event("cycle_failed").json_data(json!({
            "contest_id": contest_id.0,
            "reason": reason,
            "last_computed_at": last_computed_at,
        })),
    };
    built.unwrap_or_else(|err| Event::default().event("error").data(err.to_string()))
}

fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::UnknownContest | ServiceError::UnknownEntrant => StatusCode::NOT_FOUND,
        ServiceError::InvalidMetric(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::ContestClosed => StatusCode::CONFLICT,
        ServiceError::Store(SubmissionStoreError::Conflict) => StatusCode::CONFLICT,
        ServiceError::Store(SubmissionStoreError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Store(SubmissionStoreError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ServiceError::Scheduler(SchedulerError::AlreadyLive | SchedulerError::NotLive) => {
            StatusCode::CONFLICT
        }
        ServiceError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Refresh(
            RefreshError::SourceUnavailable(_) | RefreshError::Timeout { .. },
        ) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
