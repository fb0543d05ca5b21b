use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contest_engine::contests::leaderboard::{
    ContentItem, ContentItemId, ContestDirectory, DirectoryError, EngagementMetrics, Entrant,
    EntrantDelta, EntrantId, MetricSample, MetricsSource, MetricsSourceError, SubmissionStore,
    SubmissionStoreError,
};
use contest_engine::contests::{Contest, ContestId, ContestStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionStore {
    entrants: Arc<Mutex<HashMap<ContestId, BTreeMap<EntrantId, Entrant>>>>,
    items: Arc<Mutex<HashMap<ContestId, BTreeMap<ContentItemId, ContentItem>>>>,
}

impl SubmissionStore for InMemorySubmissionStore {
    fn upsert_entrant(
        &self,
        contest_id: &ContestId,
        entrant: Entrant,
    ) -> Result<(), SubmissionStoreError> {
        let mut guard = self.entrants.lock().expect("store mutex poisoned");
        guard
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
        let mut guard = self.items.lock().expect("store mutex poisoned");
        let items = guard.entry(contest_id.clone()).or_default();
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
        let mut guard = self.items.lock().expect("store mutex poisoned");
        let item = guard
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
        let guard = self.entrants.lock().expect("store mutex poisoned");
        Ok(guard
            .get(contest_id)
            .and_then(|entrants| entrants.get(entrant_id))
            .cloned())
    }

    fn entrants(&self, contest_id: &ContestId) -> Result<Vec<Entrant>, SubmissionStoreError> {
        let guard = self.entrants.lock().expect("store mutex poisoned");
        Ok(guard
            .get(contest_id)
            .map(|entrants| entrants.values().cloned().collect())
            .unwrap_or_default())
    }

    fn items(&self, contest_id: &ContestId) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let guard = self.items.lock().expect("store mutex poisoned");
        Ok(guard
            .get(contest_id)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    fn items_for(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let guard = self.items.lock().expect("store mutex poisoned");
        Ok(guard
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

/// Directory whose contests report a status derived from their window: a
/// draft goes live when the window opens and everything ends when it closes,
/// unless an operator ended the contest early.
#[derive(Default, Clone)]
pub(crate) struct InMemoryContestDirectory {
    contests: Arc<Mutex<HashMap<ContestId, Contest>>>,
}

impl InMemoryContestDirectory {
    pub(crate) fn upsert(&self, contest: Contest) {
        let mut guard = self.contests.lock().expect("directory mutex poisoned");
        guard.insert(contest.id.clone(), contest);
    }
}

pub(crate) fn effective_status(contest: &Contest, now: DateTime<Utc>) -> ContestStatus {
    match contest.status {
        ContestStatus::Ended => ContestStatus::Ended,
        _ if now >= contest.window.ends_at => ContestStatus::Ended,
        _ if contest.window.contains(now) => ContestStatus::Live,
        _ => ContestStatus::Draft,
    }
}

#[async_trait]
impl ContestDirectory for InMemoryContestDirectory {
    async fn contest(&self, contest_id: &ContestId) -> Result<Contest, DirectoryError> {
        let guard = self.contests.lock().expect("directory mutex poisoned");
        let mut contest = guard
            .get(contest_id)
            .cloned()
            .ok_or(DirectoryError::UnknownContest)?;
        contest.status = effective_status(&contest, Utc::now());
        Ok(contest)
    }
}

struct SimulatedCounter {
    entrant_id: EntrantId,
    sample: MetricSample,
    pulls: i64,
}

/// Synthetic engagement feed. Counters only ever grow, on deterministic
/// curves, so demo runs and seeded deployments are reproducible.
#[derive(Default)]
pub(crate) struct SimulatedMetricsSource {
    counters: Mutex<HashMap<ContentItemId, SimulatedCounter>>,
}

impl SimulatedMetricsSource {
    pub(crate) fn prime(
        &self,
        item_id: ContentItemId,
        entrant_id: EntrantId,
        sample: MetricSample,
    ) {
        let mut guard = self.counters.lock().expect("feed mutex poisoned");
        guard.insert(
            item_id,
            SimulatedCounter {
                entrant_id,
                sample,
                pulls: 0,
            },
        );
    }
}

fn grow(counter: &mut SimulatedCounter) -> MetricSample {
    counter.pulls += 1;
    let pulse = counter.pulls;
    let sample = &mut counter.sample;
    sample.views += sample.views / 25 + 40 + (pulse * 17) % 23;
    sample.likes += sample.likes / 30 + 6 + (pulse * 7) % 11;
    sample.comments += sample.comments / 45 + 2 + (pulse * 5) % 7;
    sample.shares += sample.shares / 60 + 1 + (pulse * 3) % 5;
    *sample
}

#[async_trait]
impl MetricsSource for SimulatedMetricsSource {
    async fn fetch_metrics(
        &self,
        _contest_id: &ContestId,
        items: &[ContentItemId],
    ) -> Result<Vec<(ContentItemId, MetricSample)>, MetricsSourceError> {
        let mut guard = self.counters.lock().expect("feed mutex poisoned");
        Ok(items
            .iter()
            .filter_map(|id| guard.get_mut(id).map(|counter| (id.clone(), grow(counter))))
            .collect())
    }

    async fn growth_pulse(
        &self,
        _contest_id: &ContestId,
    ) -> Result<Vec<EntrantDelta>, MetricsSourceError> {
        let guard = self.counters.lock().expect("feed mutex poisoned");
        let mut by_entrant: BTreeMap<EntrantId, EntrantDelta> = BTreeMap::new();
        for counter in guard.values() {
            let delta = by_entrant
                .entry(counter.entrant_id.clone())
                .or_insert_with(|| EntrantDelta {
                    entrant_id: counter.entrant_id.clone(),
                    views: 0,
                    likes: 0,
                    comments: 0,
                    shares: 0,
                });
            delta.views += (counter.sample.views / 120 + 15) as u64;
            delta.likes += (counter.sample.likes / 160 + 2) as u64;
            delta.comments += (counter.sample.comments / 200) as u64;
            delta.shares += (counter.sample.shares / 240) as u64;
        }
        Ok(by_entrant.into_values().collect())
    }
}
