use crate::infra::{effective_status, AppState, InMemoryContestDirectory};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use contest_engine::contests::leaderboard::{
    leaderboard_router, ContestDirectory, LeaderboardService, MetricsSource, SubmissionStore,
};
use contest_engine::contests::{Contest, ContestId, ContestStatus, ContestWindow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ContestCreateRequest {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) starts_at: DateTime<Utc>,
    pub(crate) ends_at: DateTime<Utc>,
    #[serde(default = "default_prize_tiers")]
    pub(crate) prize_tiers: u8,
}

fn default_prize_tiers() -> u8 {
    3
}

impl ContestCreateRequest {
    fn into_contest(self, now: DateTime<Utc>) -> Contest {
        let mut contest = Contest {
            id: ContestId(self.id),
            name: self.name,
            window: ContestWindow {
                starts_at: self.starts_at,
                ends_at: self.ends_at,
            },
            status: ContestStatus::Draft,
            prize_tiers: self.prize_tiers,
        };
        contest.status = effective_status(&contest, now);
        contest
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ContestCreateResponse {
    pub(crate) contest: Contest,
    pub(crate) status_label: &'static str,
}

pub(crate) fn with_contest_routes<S, M, D>(
    service: Arc<LeaderboardService<S, M, D>>,
) -> axum::Router
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    leaderboard_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/contests",
            axum::routing::post(create_contest_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn create_contest_endpoint(
    Extension(directory): Extension<Arc<InMemoryContestDirectory>>,
    Json(payload): Json<ContestCreateRequest>,
) -> Response {
    if payload.id.trim().is_empty() {
        let body = json!({ "error": "contest id must not be blank" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }
    if payload.ends_at <= payload.starts_at {
        let body = json!({ "error": "contest window must end after it starts" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    let contest = payload.into_contest(Utc::now());
    directory.upsert(contest.clone());
    let response = ContestCreateResponse {
        status_label: contest.status.label(),
        contest,
    };
    (StatusCode::CREATED, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(id: &str, starts_in_hours: i64, ends_in_hours: i64) -> ContestCreateRequest {
        let now = Utc::now();
        ContestCreateRequest {
            id: id.to_string(),
            name: "Summer Shorts Showdown".to_string(),
            starts_at: now + Duration::hours(starts_in_hours),
            ends_at: now + Duration::hours(ends_in_hours),
            prize_tiers: 3,
        }
    }

    #[tokio::test]
    async fn create_contest_endpoint_registers_a_live_contest() {
        let directory = Arc::new(InMemoryContestDirectory::default());

        let response = create_contest_endpoint(
            Extension(directory.clone()),
            Json(request("summer-shorts", -1, 23)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let contest = directory
            .contest(&ContestId("summer-shorts".to_string()))
            .await
            .expect("contest registered");
        assert_eq!(contest.status, ContestStatus::Live);
        assert_eq!(contest.prize_tiers, 3);
    }

    #[tokio::test]
    async fn create_contest_endpoint_rejects_inverted_windows() {
        let directory = Arc::new(InMemoryContestDirectory::default());

        let response = create_contest_endpoint(
            Extension(directory.clone()),
            Json(request("backwards", 23, -1)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let missing = directory.contest(&ContestId("backwards".to_string())).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn readiness_endpoint_follows_the_flag() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let state = AppState {
            readiness: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            metrics: Arc::new(handle),
        };

        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state
            .readiness
            .store(true, std::sync::atomic::Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
