//! Full standings recomputation and the event fan-out that announces it.
//!
//! One cycle pulls fresh counters from the metrics source, rescores every
//! entrant, ranks the field against the outgoing snapshot, publishes the
//! result, and broadcasts it. A per-contest lock keeps cycles serial; a
//! failed cycle records its reason and leaves the last good snapshot in
//! place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::contests::leaderboard::aggregate::aggregate_items;
use crate::contests::leaderboard::domain::{
    ContentItem, ContentItemId, EngagementMetrics, EntrantId, InvalidMetricError,
};
use crate::contests::leaderboard::ranking::{
    RankingEngine, ScoredEntrant, SortSpec, StandingsSnapshot,
};
use crate::contests::leaderboard::repository::{SubmissionStore, SubmissionStoreError};
use crate::contests::leaderboard::scheduler::RefreshConfig;
use crate::contests::leaderboard::scoring::ScoreCalculator;
use crate::contests::leaderboard::sources::{
    ContestDirectory, DirectoryError, MetricsSource, MetricsSourceError,
};
use crate::contests::leaderboard::standings::SnapshotStore;
use crate::contests::{Contest, ContestId};

/// Error enumeration for refresh cycle failures.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("contest not found")]
    UnknownContest,
    #[error("contest directory unavailable: {0}")]
    Directory(String),
    #[error("metrics source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("metrics fetch timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },
    #[error("invalid metrics for {item}: {source}")]
    InvalidMetrics {
        item: ContentItemId,
        source: InvalidMetricError,
    },
    #[error("submission store failed: {0}")]
    Store(#[from] SubmissionStoreError),
}

/// What subscribers hear about a contest.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// A new or delta-adjusted snapshot is available.
    Standings(Arc<StandingsSnapshot>),
    /// A cycle failed; the last good snapshot (if any) is still being
    /// served.
    CycleFailed {
        contest_id: ContestId,
        reason: String,
        last_computed_at: Option<DateTime<Utc>>,
    },
}

impl RefreshEvent {
    pub fn contest_id(&self) -> &ContestId {
        match self {
            RefreshEvent::Standings(snapshot) => &snapshot.contest_id,
            RefreshEvent::CycleFailed { contest_id, .. } => contest_id,
        }
    }
}

/// A subscription filtered down to one contest's events.
pub struct ContestEvents {
    contest_id: ContestId,
    receiver: broadcast::Receiver<RefreshEvent>,
}

impl ContestEvents {
    /// Next event for the subscribed contest, or `None` once the engine
    /// shuts down. A slow subscriber that lags the broadcast buffer skips
    /// the missed events and picks up from the most recent ones.
    pub async fn recv(&mut self) -> Option<RefreshEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if *event.contest_id() == self.contest_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(contest = %self.contest_id, missed, "subscriber lagged; skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Recomputes standings for any contest on demand.
pub struct RecomputePipeline<S, M, D> {
    store: Arc<S>,
    source: Arc<M>,
    directory: Arc<D>,
    calculator: ScoreCalculator,
    ranking: RankingEngine,
    snapshots: Arc<SnapshotStore>,
    config: RefreshConfig,
    events: broadcast::Sender<RefreshEvent>,
    cycle_locks: Mutex<HashMap<ContestId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S, M, D> RecomputePipeline<S, M, D>
where
    S: SubmissionStore,
    M: MetricsSource,
    D: ContestDirectory,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<M>,
        directory: Arc<D>,
        calculator: ScoreCalculator,
        snapshots: Arc<SnapshotStore>,
        config: RefreshConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            store,
            source,
            directory,
            calculator,
            ranking: RankingEngine,
            snapshots,
            config,
            events,
            cycle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, contest_id: &ContestId) -> ContestEvents {
        ContestEvents {
            contest_id: contest_id.clone(),
            receiver: self.events.subscribe(),
        }
    }

    /// Runs one full refresh cycle for the contest.
    ///
    /// Cycles for the same contest never overlap: a second caller waits for
    /// the in-flight cycle to finish before starting its own. Any failure
    /// past the existence check is recorded against the contest's health and
    /// broadcast as [`RefreshEvent::CycleFailed`].
    pub async fn run_cycle(
        &self,
        contest_id: &ContestId,
    ) -> Result<Arc<StandingsSnapshot>, RefreshError> {
        let lock = self.cycle_lock(contest_id);
        let _in_flight = lock.lock().await;

        let contest = match self.directory.contest(contest_id).await {
            Ok(contest) => contest,
            Err(DirectoryError::UnknownContest) => return Err(RefreshError::UnknownContest),
            Err(DirectoryError::Unavailable(reason)) => {
                let err = RefreshError::Directory(reason);
                self.record_cycle_failure(contest_id, &err);
                return Err(err);
            }
        };

        match self.refresh_standings(&contest).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                self.record_cycle_failure(contest_id, &err);
                Err(err)
            }
        }
    }

    /// Applies incremental counter growth to the current snapshot without
    /// rescoring or reranking anything.
    pub async fn growth_pulse(
        &self,
        contest_id: &ContestId,
    ) -> Result<Option<Arc<StandingsSnapshot>>, RefreshError> {
        let deltas = self
            .source
            .growth_pulse(contest_id)
            .await
            .map_err(|err| match err {
                MetricsSourceError::Unavailable(reason) => RefreshError::SourceUnavailable(reason),
            })?;
        if deltas.is_empty() {
            return Ok(None);
        }

        let Some(updated) = self.snapshots.apply_deltas(contest_id, &deltas) else {
            return Ok(None);
        };
        debug!(contest = %contest_id, deltas = deltas.len(), "growth pulse applied");
        let _ = self.events.send(RefreshEvent::Standings(Arc::clone(&updated)));
        Ok(Some(updated))
    }

    async fn refresh_standings(
        &self,
        contest: &Contest,
    ) -> Result<Arc<StandingsSnapshot>, RefreshError> {
        self.pull_latest_metrics(contest).await?;

        let entrants = self.store.entrants(&contest.id)?;
        let mut grouped: HashMap<EntrantId, Vec<ContentItem>> = HashMap::new();
        for item in self.store.items(&contest.id)? {
            grouped.entry(item.entrant_id.clone()).or_default().push(item);
        }

        let now = Utc::now();
        let scored = entrants
            .into_iter()
            .map(|entrant| {
                let items = grouped.remove(&entrant.id).unwrap_or_default();
                let aggregate = aggregate_items(entrant.id.clone(), items);
                let scores = self.calculator.score_aggregate(&aggregate, now);
                ScoredEntrant {
                    entrant,
                    totals: aggregate.totals,
                    submissions: aggregate.item_count,
                    scores,
                }
            })
            .collect();
        if !grouped.is_empty() {
            debug!(
                contest = %contest.id,
                orphaned = grouped.len(),
                "items without a registered entrant skipped"
            );
        }

        let previous = self.snapshots.current(&contest.id);
        let snapshot =
            self.ranking
                .build_snapshot(contest, scored, previous.as_deref(), SortSpec::default(), now);
        let published = self.snapshots.publish(snapshot);
        info!(
            contest = %contest.id,
            entrants = published.entries.len(),
            "standings recomputed"
        );
        let _ = self.events.send(RefreshEvent::Standings(Arc::clone(&published)));
        Ok(published)
    }

    async fn pull_latest_metrics(&self, contest: &Contest) -> Result<(), RefreshError> {
        let items = self.store.items(&contest.id)?;
        if items.is_empty() {
            return Ok(());
        }

        let ids: Vec<ContentItemId> = items.iter().map(|item| item.id.clone()).collect();
        let deadline = self.config.metrics_deadline;
        let fetched = match tokio::time::timeout(
            deadline,
            self.source.fetch_metrics(&contest.id, &ids),
        )
        .await
        {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(MetricsSourceError::Unavailable(reason))) => {
                return Err(RefreshError::SourceUnavailable(reason));
            }
            Err(_) => {
                return Err(RefreshError::Timeout {
                    deadline_ms: deadline.as_millis() as u64,
                });
            }
        };

        for (item_id, sample) in fetched {
            let metrics = EngagementMetrics::try_from(sample)
                .map_err(|source| RefreshError::InvalidMetrics {
                    item: item_id.clone(),
                    source,
                })?;
            match self.store.update_metrics(&contest.id, &item_id, metrics) {
                Ok(()) => {}
                Err(SubmissionStoreError::NotFound) => {
                    debug!(contest = %contest.id, item = %item_id, "metrics for unknown item ignored");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn record_cycle_failure(&self, contest_id: &ContestId, err: &RefreshError) {
        let reason = err.to_string();
        self.snapshots.record_failure(contest_id, &reason, Utc::now());
        let last_computed_at = self
            .snapshots
            .current(contest_id)
            .map(|snapshot| snapshot.computed_at);
        warn!(contest = %contest_id, error = %reason, "refresh cycle failed; retaining last snapshot");
        let _ = self.events.send(RefreshEvent::CycleFailed {
            contest_id: contest_id.clone(),
            reason,
            last_computed_at,
        });
    }

    fn cycle_lock(&self, contest_id: &ContestId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.cycle_locks.lock().expect("cycle lock registry poisoned");
        Arc::clone(locks.entry(contest_id.clone()).or_default())
    }
}
