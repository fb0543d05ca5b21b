use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{Duration as Window, Utc};
use serde_json::Value;

use crate::contests::leaderboard::domain::{
    ContentItem, ContentItemId, EngagementMetrics, Entrant, EntrantId, MetricSample,
    SubmissionPayload,
};
use crate::contests::leaderboard::ranking::ScoredEntrant;
use crate::contests::leaderboard::repository::{SubmissionStore, SubmissionStoreError};
use crate::contests::leaderboard::scheduler::RefreshConfig;
use crate::contests::leaderboard::scoring::{ProfileId, ScoreSet};
use crate::contests::leaderboard::sources::{
    ContestDirectory, DirectoryError, MetricsSource, MetricsSourceError,
};
use crate::contests::leaderboard::standings::EntrantDelta;
use crate::contests::leaderboard::{leaderboard_router, LeaderboardService, ScoringConfig};
use crate::contests::{Contest, ContestId, ContestStatus, ContestWindow};

pub(super) type TestService = LeaderboardService<MemoryStore, ScriptedSource, StaticDirectory>;

pub(super) fn contest_id() -> ContestId {
    ContestId("summer-shorts".to_string())
}

pub(super) fn live_contest() -> Contest {
    let now = Utc::now();
    Contest {
        id: contest_id(),
        name: "Summer Shorts Showdown".to_string(),
        window: ContestWindow {
            starts_at: now - Window::hours(1),
            ends_at: now + Window::hours(23),
        },
        status: ContestStatus::Live,
        prize_tiers: 3,
    }
}

pub(super) fn sample(views: i64, likes: i64, comments: i64, shares: i64) -> MetricSample {
    MetricSample {
        views,
        likes,
        comments,
        shares,
    }
}

pub(super) fn payload(entrant: &str, item: &str, metrics: MetricSample) -> SubmissionPayload {
    SubmissionPayload {
        item_id: ContentItemId(item.to_string()),
        entrant_id: EntrantId(entrant.to_string()),
        display_name: Some(format!("Creator {entrant}")),
        handle: Some(format!("@{entrant}")),
        submitted_at: None,
        duration_secs: Some(60),
        metrics,
    }
}

pub(super) fn score_set(final_score: u8) -> ScoreSet {
    ScoreSet {
        profile: ProfileId::Leaderboard,
        engagement_score: f64::from(final_score),
        quality_score: 50.0,
        virality_score: 0.0,
        final_score,
        components: Vec::new(),
    }
}

pub(super) fn scored(id: &str, final_score: u8, views: u64) -> ScoredEntrant {
    ScoredEntrant {
        entrant: Entrant {
            id: EntrantId(id.to_string()),
            display_name: format!("Creator {id}"),
            handle: format!("@{id}"),
        },
        scores: score_set(final_score),
        totals: EngagementMetrics {
            views,
            likes: 0,
            comments: 0,
            shares: 0,
        },
        submissions: 1,
    }
}

/// Cadence tightened far below production values so scheduler tests finish
/// in tens of milliseconds.
pub(super) fn fast_refresh_config() -> RefreshConfig {
    RefreshConfig {
        refresh_interval: Duration::from_millis(40),
        metrics_deadline: Duration::from_millis(250),
        pulse_interval: Some(Duration::from_millis(15)),
        event_capacity: 64,
    }
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryStore>,
    Arc<ScriptedSource>,
    Arc<StaticDirectory>,
) {
    let store = Arc::new(MemoryStore::default());
    let source = Arc::new(ScriptedSource::default());
    let directory = Arc::new(StaticDirectory::default());
    directory.insert(live_contest());
    let service = Arc::new(LeaderboardService::new(
        store.clone(),
        source.clone(),
        directory.clone(),
        ScoringConfig::default(),
        fast_refresh_config(),
    ));
    (service, store, source, directory)
}

pub(super) fn leaderboard_router_with_service(service: Arc<TestService>) -> axum::Router {
    leaderboard_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
struct MemoryStoreState {
    entrants: HashMap<ContestId, BTreeMap<EntrantId, Entrant>>,
    items: HashMap<ContestId, BTreeMap<ContentItemId, ContentItem>>,
}

/// In-memory submission store backing most workflow tests.
#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

impl SubmissionStore for MemoryStore {
    fn upsert_entrant(
        &self,
        contest_id: &ContestId,
        entrant: Entrant,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state
            .entrants
            .entry(contest_id.clone())
            .or_default()
            .insert(entrant.id.clone(), entrant);
        Ok(())
    }

    fn record_item(
        &self,
        contest_id: &ContestId,
        item: ContentItem,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let items = state.items.entry(contest_id.clone()).or_default();
        if items.contains_key(&item.id) {
            return Err(SubmissionStoreError::Conflict);
        }
        items.insert(item.id.clone(), item);
        Ok(())
    }

    fn update_metrics(
        &self,
        contest_id: &ContestId,
        item_id: &ContentItemId,
        metrics: EngagementMetrics,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let item = state
            .items
            .get_mut(contest_id)
            .and_then(|items| items.get_mut(item_id))
            .ok_or(SubmissionStoreError::NotFound)?;
        item.metrics = metrics;
        Ok(())
    }

    fn entrant(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Option<Entrant>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .entrants
            .get(contest_id)
            .and_then(|entrants| entrants.get(entrant_id))
            .cloned())
    }

    fn entrants(&self, contest_id: &ContestId) -> Result<Vec<Entrant>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .entrants
            .get(contest_id)
            .map(|entrants| entrants.values().cloned().collect())
            .unwrap_or_default())
    }

    fn items(&self, contest_id: &ContestId) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .items
            .get(contest_id)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    fn items_for(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .items
            .get(contest_id)
            .map(|items| {
                items
                    .values()
                    .filter(|item| item.entrant_id == *entrant_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Store whose every operation fails, for degraded-path assertions.
pub(super) struct UnavailableStore;

impl SubmissionStore for UnavailableStore {
    fn upsert_entrant(
        &self,
        _contest_id: &ContestId,
        _entrant: Entrant,
    ) -> Result<(), SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn record_item(
        &self,
        _contest_id: &ContestId,
        _item: ContentItem,
    ) -> Result<(), SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn update_metrics(
        &self,
        _contest_id: &ContestId,
        _item_id: &ContentItemId,
        _metrics: EngagementMetrics,
    ) -> Result<(), SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn entrant(
        &self,
        _contest_id: &ContestId,
        _entrant_id: &EntrantId,
    ) -> Result<Option<Entrant>, SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn entrants(&self, _contest_id: &ContestId) -> Result<Vec<Entrant>, SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn items(&self, _contest_id: &ContestId) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }

    fn items_for(
        &self,
        _contest_id: &ContestId,
        _entrant_id: &EntrantId,
    ) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        Err(SubmissionStoreError::Unavailable("database offline".to_string()))
    }
}

enum SourceScript {
    Samples(Vec<(ContentItemId, MetricSample)>),
    Fail(String),
    Stall(Duration),
}

/// Metrics source driven by a queue of scripted responses. An empty queue
/// answers with no samples, leaving stored counters untouched.
#[derive(Default)]
pub(super) struct ScriptedSource {
    responses: Mutex<VecDeque<SourceScript>>,
    pulses: Mutex<VecDeque<Vec<EntrantDelta>>>,
}

impl ScriptedSource {
    pub(super) fn push_samples(&self, samples: Vec<(ContentItemId, MetricSample)>) {
        self.responses
            .lock()
            .expect("source mutex poisoned")
            .push_back(SourceScript::Samples(samples));
    }

    pub(super) fn push_failure(&self, reason: &str) {
        self.responses
            .lock()
            .expect("source mutex poisoned")
            .push_back(SourceScript::Fail(reason.to_string()));
    }

    pub(super) fn push_stall(&self, delay: Duration) {
        self.responses
            .lock()
            .expect("source mutex poisoned")
            .push_back(SourceScript::Stall(delay));
    }

    pub(super) fn push_pulse(&self, deltas: Vec<EntrantDelta>) {
        self.pulses
            .lock()
            .expect("source mutex poisoned")
            .push_back(deltas);
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn fetch_metrics(
        &self,
        _contest_id: &ContestId,
        _items: &[ContentItemId],
    ) -> Result<Vec<(ContentItemId, MetricSample)>, MetricsSourceError> {
        let script = self
            .responses
            .lock()
            .expect("source mutex poisoned")
            .pop_front();
        match script {
            None => Ok(Vec::new()),
            Some(SourceScript::Samples(samples)) => Ok(samples),
            Some(SourceScript::Fail(reason)) => Err(MetricsSourceError::Unavailable(reason)),
            Some(SourceScript::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn growth_pulse(
        &self,
        _contest_id: &ContestId,
    ) -> Result<Vec<EntrantDelta>, MetricsSourceError> {
        let deltas = self
            .pulses
            .lock()
            .expect("source mutex poisoned")
            .pop_front();
        Ok(deltas.unwrap_or_default())
    }
}

/// Directory over a mutable map so tests can flip contest status mid-flight.
#[derive(Default)]
pub(super) struct StaticDirectory {
    contests: Mutex<HashMap<ContestId, Contest>>,
}

impl StaticDirectory {
    pub(super) fn insert(&self, contest: Contest) {
        self.contests
            .lock()
            .expect("directory mutex poisoned")
            .insert(contest.id.clone(), contest);
    }

    pub(super) fn set_status(&self, contest_id: &ContestId, status: ContestStatus) {
        let mut contests = self.contests.lock().expect("directory mutex poisoned");
        if let Some(contest) = contests.get_mut(contest_id) {
            contest.status = status;
        }
    }
}

#[async_trait]
impl ContestDirectory for StaticDirectory {
    async fn contest(&self, contest_id: &ContestId) -> Result<Contest, DirectoryError> {
        self.contests
            .lock()
            .expect("directory mutex poisoned")
            .get(contest_id)
            .cloned()
            .ok_or(DirectoryError::UnknownContest)
    }
}
