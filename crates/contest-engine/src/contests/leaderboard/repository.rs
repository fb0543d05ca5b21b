use crate::contests::leaderboard::domain::{
    ContentItem, ContentItemId, EngagementMetrics, Entrant, EntrantId,
};
use crate::contests::ContestId;

/// Storage abstraction so scoring and refresh logic can run against any
/// backing store. Everything is scoped by contest: the same entrant may
/// compete in several contests with separate bodies of work.
pub trait SubmissionStore: Send + Sync {
    fn upsert_entrant(
        &self,
        contest_id: &ContestId,
        entrant: Entrant,
    ) -> Result<(), SubmissionStoreError>;

    /// Records a new submission. Item ids are unique per contest; replaying
    /// one is a conflict, not an update.
    fn record_item(
        &self,
        contest_id: &ContestId,
        item: ContentItem,
    ) -> Result<(), SubmissionStoreError>;

    /// Overwrites the stored counters for one item with freshly fetched
    /// figures.
    fn update_metrics(
        &self,
        contest_id: &ContestId,
        item_id: &ContentItemId,
        metrics: EngagementMetrics,
    ) -> Result<(), SubmissionStoreError>;

    fn entrant(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Option<Entrant>, SubmissionStoreError>;

    fn entrants(&self, contest_id: &ContestId) -> Result<Vec<Entrant>, SubmissionStoreError>;

    fn items(&self, contest_id: &ContestId) -> Result<Vec<ContentItem>, SubmissionStoreError>;

    fn items_for(
        &self,
        contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Vec<ContentItem>, SubmissionStoreError>;
}

/// Error enumeration for submission store failures.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionStoreError {
    #[error("submission already recorded")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("submission store unavailable: {0}")]
    Unavailable(String),
}
