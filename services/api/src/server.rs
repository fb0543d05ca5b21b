use crate::cli::ServeArgs;
use crate::demo::seed_demo_contest;
use crate::infra::{
    AppState, InMemoryContestDirectory, InMemorySubmissionStore, SimulatedMetricsSource,
};
use crate::routes::with_contest_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use contest_engine::config::AppConfig;
use contest_engine::contests::leaderboard::{LeaderboardService, ScoringConfig};
use contest_engine::error::AppError;
use contest_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemorySubmissionStore::default());
    let source = Arc::new(SimulatedMetricsSource::default());
    let directory = Arc::new(InMemoryContestDirectory::default());
    let service = Arc::new(LeaderboardService::new(
        store.clone(),
        source.clone(),
        directory.clone(),
        ScoringConfig::default(),
        config.refresh.to_refresh_config(),
    ));

    if args.seed_demo {
        let (contest_id, roster, _) = seed_demo_contest(None, &store, &source, &directory)?;
        service.go_live(&contest_id).await?;
        info!(
            contest = %contest_id,
            entrants = roster.entrants,
            items = roster.items,
            "demo contest seeded and refreshing"
        );
    }

    let app = with_contest_routes(service)
        .layer(Extension(app_state))
        .layer(Extension(directory))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "contest standings engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
