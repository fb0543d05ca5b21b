//! Leaderboard scoring, ranking, and live refresh for creator contests.
//!
//! Raw engagement metrics enter through submission intake or the metrics
//! source, get aggregated per entrant, scored against a named weight profile,
//! and ranked into an immutable standings snapshot. A per-contest refresh
//! loop keeps the snapshot current while the contest is live; readers only
//! ever see fully published snapshots.

pub mod aggregate;
pub mod domain;
pub mod pipeline;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod scheduler;
pub(crate) mod scoring;
pub mod service;
pub mod sources;
pub mod standings;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate_items, EntrantAggregate};
pub use domain::{
    ContentItem, ContentItemId, EngagementMetrics, Entrant, EntrantId, InvalidMetricError,
    MetricSample, SubmissionPayload,
};
pub use pipeline::{ContestEvents, RecomputePipeline, RefreshError, RefreshEvent};
pub use ranking::{
    RankChange, RankingEngine, ScoredEntrant, SortDirection, SortKey, SortSpec, StandingEntry,
    StandingsSnapshot,
};
pub use repository::{SubmissionStore, SubmissionStoreError};
pub use router::leaderboard_router;
pub use scheduler::{RefreshConfig, RefreshScheduler, SchedulerError};
pub use scoring::{
    FactorScores, ProfileId, ScoreCalculator, ScoreComponent, ScoreFactor, ScoreSet,
    ScoringConfig, WeightProfile,
};
pub use service::{
    EntrantDetail, LeaderboardService, ScoredSubmission, ServiceError, StandingSummary,
};
pub use sources::{ContestDirectory, DirectoryError, MetricsSource, MetricsSourceError};
pub use standings::{EntrantDelta, PageRequest, RefreshHealth, SnapshotStore, StandingsPage};
