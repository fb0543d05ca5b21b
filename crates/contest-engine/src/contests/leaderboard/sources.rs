use async_trait::async_trait;

use crate::contests::leaderboard::domain::{ContentItemId, MetricSample};
use crate::contests::leaderboard::standings::EntrantDelta;
use crate::contests::{Contest, ContestId};

/// Upstream platform counters for submitted content.
///
/// Implementations talk to whatever analytics surface the hosting platform
/// offers. Samples come back raw and are validated at the engine boundary,
/// exactly as user-submitted counters are.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Latest counters for the requested items. Items the source cannot
    /// resolve are simply absent from the response and keep their stored
    /// counters.
    async fn fetch_metrics(
        &self,
        contest_id: &ContestId,
        items: &[ContentItemId],
    ) -> Result<Vec<(ContentItemId, MetricSample)>, MetricsSourceError>;

    /// Counter growth since the last full fetch, for cheap between-cycle
    /// pulses. Sources without an incremental feed return nothing.
    async fn growth_pulse(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<EntrantDelta>, MetricsSourceError> {
        let _ = contest_id;
        Ok(Vec::new())
    }
}

/// Error enumeration for metrics source failures.
#[derive(Debug, thiserror::Error)]
pub enum MetricsSourceError {
    #[error("metrics source unavailable: {0}")]
    Unavailable(String),
}

/// Lookup for contest definitions and their live state.
#[async_trait]
pub trait ContestDirectory: Send + Sync {
    async fn contest(&self, contest_id: &ContestId) -> Result<Contest, DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("contest not found")]
    UnknownContest,
    #[error("contest directory unavailable: {0}")]
    Unavailable(String),
}
