use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contests::leaderboard::aggregate::aggregate_items;
use crate::contests::leaderboard::domain::{
    ContentItem, EngagementMetrics, Entrant, EntrantId, InvalidMetricError, SubmissionPayload,
};
use crate::contests::leaderboard::pipeline::{ContestEvents, RecomputePipeline, RefreshError};
use crate::contests::leaderboard::ranking::{
    RankChange, RankingEngine, SortSpec, StandingsSnapshot,
};
use crate::contests::leaderboard::repository::{SubmissionStore, SubmissionStoreError};
use crate::contests::leaderboard::scheduler::{RefreshConfig, RefreshScheduler, SchedulerError};
use crate::contests::leaderboard::scoring::{ScoreCalculator, ScoreSet, ScoringConfig};
use crate::contests::leaderboard::sources::{ContestDirectory, DirectoryError, MetricsSource};
use crate::contests::leaderboard::standings::{PageRequest, SnapshotStore, StandingsPage};
use crate::contests::{Contest, ContestId, ContestStatus};

/// Service composing the submission store, metrics source, scoring rubric,
/// and refresh machinery behind one façade.
pub struct LeaderboardService<S, M, D> {
    store: Arc<S>,
    directory: Arc<D>,
    calculator: ScoreCalculator,
    snapshots: Arc<SnapshotStore>,
    ranking: RankingEngine,
    pipeline: Arc<RecomputePipeline<S, M, D>>,
    scheduler: RefreshScheduler<S, M, D>,
}

impl<S, M, D> LeaderboardService<S, M, D>
where
    S: SubmissionStore + 'static,
    M: MetricsSource + 'static,
    D: ContestDirectory + 'static,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<M>,
        directory: Arc<D>,
        scoring: ScoringConfig,
        refresh: RefreshConfig,
    ) -> Self {
        let calculator = ScoreCalculator::new(scoring);
        let snapshots = Arc::new(SnapshotStore::new());
        let pipeline = Arc::new(RecomputePipeline::new(
            Arc::clone(&store),
            source,
            Arc::clone(&directory),
            calculator.clone(),
            Arc::clone(&snapshots),
            refresh.clone(),
        ));
        let scheduler =
            RefreshScheduler::new(Arc::clone(&pipeline), Arc::clone(&directory), refresh);

        Self {
            store,
            directory,
            calculator,
            snapshots,
            ranking: RankingEngine,
            pipeline,
            scheduler,
        }
    }

    /// One page of current standings, optionally under a non-default sort.
    ///
    /// A contest that has never been computed gets its first snapshot built
    /// on the spot. Non-default sorts are derived views over the stored
    /// snapshot; they are never persisted.
    pub async fn standings(
        &self,
        contest_id: &ContestId,
        page: PageRequest,
        sort: SortSpec,
    ) -> Result<StandingsPage, ServiceError> {
        let contest = self.lookup_contest(contest_id).await?;
        let (current, previous) = match self.snapshots.pair(contest_id) {
            Some(pair) => pair,
            None => (self.pipeline.run_cycle(contest_id).await?, None),
        };
        let health = self.snapshots.health(contest_id);

        if sort == SortSpec::default() {
            Ok(StandingsPage::from_snapshot(&current, page, health))
        } else {
            let view = self
                .ranking
                .resort(&contest, &current, previous.as_deref(), sort);
            Ok(StandingsPage::from_snapshot(&view, page, health))
        }
    }

    /// Everything known about one entrant: aggregate scores, per-item
    /// scores, and their place in the latest snapshot if they hold one.
    pub async fn entrant_detail(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<EntrantDetail, ServiceError> {
        self.lookup_contest(contest_id).await?;
        let entrant = self
            .store
            .entrant(contest_id, entrant_id)?
            .ok_or(ServiceError::UnknownEntrant)?;
        let items = self.store.items_for(contest_id, entrant_id)?;

        let now = Utc::now();
        let submissions: Vec<ScoredSubmission> = items
            .iter()
            .map(|item| ScoredSubmission {
                scores: self.calculator.score_item(item, now),
                item: item.clone(),
            })
            .collect();
        let aggregate = aggregate_items(entrant_id.clone(), items);
        let scores = self.calculator.score_aggregate(&aggregate, now);
        let standing = self
            .snapshots
            .current(contest_id)
            .and_then(|snapshot| standing_summary(&snapshot, entrant_id));

        Ok(EntrantDetail {
            contest_id: contest_id.clone(),
            entrant,
            totals: aggregate.totals,
            scores,
            submissions,
            standing,
            as_of: now,
        })
    }

    /// Validates, records, and immediately scores one submission.
    ///
    /// The returned score uses the submission profile so the creator gets
    /// instant feedback; leaderboard placement follows with the next
    /// refresh, which this call nudges forward when the contest is live.
    pub async fn submit_for_scoring(
        &self,
        contest_id: &ContestId,
        payload: SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError> {
        let contest = self.lookup_contest(contest_id).await?;
        if contest.status == ContestStatus::Ended {
            return Err(ServiceError::ContestClosed);
        }

        let now = Utc::now();
        let entrant = payload.entrant();
        let item = payload.into_item(now)?;
        self.store.upsert_entrant(contest_id, entrant)?;
        self.store.record_item(contest_id, item.clone())?;

        let scores = self.calculator.score_item(&item, now);
        if self.scheduler.is_running(contest_id) {
            if let Err(err) = self.scheduler.trigger(contest_id) {
                debug!(contest = %contest_id, error = %err, "post-submission refresh nudge skipped");
            }
        }

        Ok(ScoredSubmission { item, scores })
    }

    /// Scores a payload without recording anything.
    pub fn score_preview(
        &self,
        payload: SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError> {
        let now = Utc::now();
        let item = payload.into_item(now)?;
        let scores = self.calculator.score_item(&item, now);
        Ok(ScoredSubmission { item, scores })
    }

    /// Runs a full refresh cycle right now, leaving the periodic cadence
    /// untouched.
    pub async fn recompute_now(
        &self,
        contest_id: &ContestId,
    ) -> Result<Arc<StandingsSnapshot>, ServiceError> {
        Ok(self.pipeline.run_cycle(contest_id).await?)
    }

    /// Live event feed for one contest.
    pub async fn subscribe(&self, contest_id: &ContestId) -> Result<ContestEvents, ServiceError> {
        self.lookup_contest(contest_id).await?;
        Ok(self.pipeline.subscribe(contest_id))
    }

    /// Starts periodic refreshes for a live contest.
    pub async fn go_live(&self, contest_id: &ContestId) -> Result<(), ServiceError> {
        self.scheduler.go_live(contest_id).await?;
        Ok(())
    }

    /// Stops refreshes, freezing the last snapshot as the final standings.
    /// Concluding a contest whose loop already ended is not an error.
    pub async fn conclude(&self, contest_id: &ContestId) -> Result<(), ServiceError> {
        match self.scheduler.stop(contest_id).await {
            Ok(()) | Err(SchedulerError::NotRunning) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn is_refreshing(&self, contest_id: &ContestId) -> bool {
        self.scheduler.is_running(contest_id)
    }

    /// Winds down every refresh loop. Called once at engine shutdown.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown_all().await;
    }

    async fn lookup_contest(&self, contest_id: &ContestId) -> Result<Contest, ServiceError> {
        self.directory
            .contest(contest_id)
            .await
            .map_err(|err| match err {
                DirectoryError::UnknownContest => ServiceError::UnknownContest,
                DirectoryError::Unavailable(reason) => ServiceError::Directory(reason),
            })
    }
}

fn standing_summary(
    snapshot: &StandingsSnapshot,
    entrant_id: &EntrantId,
) -> Option<StandingSummary> {
    snapshot
        .entries
        .iter()
        .find(|entry| entry.entrant.id == *entrant_id)
        .map(|entry| StandingSummary {
            rank: entry.rank,
            change: entry.change,
            prize_tier: entry.prize_tier,
            computed_at: snapshot.computed_at,
        })
}

/// A submission together with its submission-profile score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSubmission {
    pub item: ContentItem,
    pub scores: ScoreSet,
}

/// An entrant's place in the latest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingSummary {
    pub rank: u32,
    pub change: RankChange,
    pub prize_tier: Option<u8>,
    pub computed_at: DateTime<Utc>,
}

/// Full per-entrant view for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrantDetail {
    pub contest_id: ContestId,
    pub entrant: Entrant,
    pub totals: EngagementMetrics,
    pub scores: ScoreSet,
    pub submissions: Vec<ScoredSubmission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standing: Option<StandingSummary>,
    pub as_of: DateTime<Utc>,
}

/// Error raised by the leaderboard service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("contest not found")]
    UnknownContest,
    #[error("entrant not found")]
    UnknownEntrant,
    #[error("contest has ended; submissions are closed")]
    ContestClosed,
    #[error(transparent)]
    InvalidMetric(#[from] InvalidMetricError),
    #[error(transparent)]
    Store(#[from] SubmissionStoreError),
    #[error("contest directory unavailable: {0}")]
    Directory(String),
    #[error(transparent)]
    Refresh(RefreshError),
    #[error(transparent)]
    Scheduler(SchedulerError),
}

impl From<RefreshError> for ServiceError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::UnknownContest => ServiceError::UnknownContest,
            other => ServiceError::Refresh(other),
        }
    }
}

impl From<SchedulerError> for ServiceError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::UnknownContest => ServiceError::UnknownContest,
            other => ServiceError::Scheduler(other),
        }
    }
}
