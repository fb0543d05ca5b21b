use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for contest entrants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntrantId(pub String);

impl fmt::Display for EntrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for submitted content items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentItemId(pub String);

impl fmt::Display for ContentItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated engagement counters for one piece of content or an aggregate.
///
/// Counts are absolute readings, not increments. A refresh replaces the
/// stored values wholesale, so a platform-side correction that lowers a
/// count is absorbed without special handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl EngagementMetrics {
    /// Total likes, comments, and shares.
    pub fn interactions(&self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.shares)
    }

    /// Interactions per view; zero when the content has no views yet.
    pub fn engagement_rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        self.interactions() as f64 / self.views as f64
    }

    pub fn absorb(&mut self, other: &EngagementMetrics) {
        self.views = self.views.saturating_add(other.views);
        self.likes = self.likes.saturating_add(other.likes);
        self.comments = self.comments.saturating_add(other.comments);
        self.shares = self.shares.saturating_add(other.shares);
    }
}

/// Raw metric reading as reported over the wire, prior to validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Error raised when a metric reading fails validation at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be a non-negative count, got {value}")]
pub struct InvalidMetricError {
    pub field: &'static str,
    pub value: i64,
}

impl TryFrom<MetricSample> for EngagementMetrics {
    type Error = InvalidMetricError;

    fn try_from(sample: MetricSample) -> Result<Self, Self::Error> {
        fn counted(field: &'static str, value: i64) -> Result<u64, InvalidMetricError> {
            u64::try_from(value).map_err(|_| InvalidMetricError { field, value })
        }

        Ok(Self {
            views: counted("views", sample.views)?,
            likes: counted("likes", sample.likes)?,
            comments: counted("comments", sample.comments)?,
            shares: counted("shares", sample.shares)?,
        })
    }
}

/// One submitted piece of content tracked for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentItemId,
    pub entrant_id: EntrantId,
    pub submitted_at: DateTime<Utc>,
    /// Length of the content in seconds when the platform can resolve it.
    pub duration_secs: Option<u32>,
    pub metrics: EngagementMetrics,
}

/// Display identity for one contest participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    pub display_name: String,
    pub handle: String,
}

/// Intake payload for a new or previewed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub item_id: ContentItemId,
    pub entrant_id: EntrantId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    pub metrics: MetricSample,
}

impl SubmissionPayload {
    /// Validate the raw metrics and produce the tracked content item.
    pub fn into_item(self, now: DateTime<Utc>) -> Result<ContentItem, InvalidMetricError> {
        let metrics = EngagementMetrics::try_from(self.metrics)?;
        Ok(ContentItem {
            id: self.item_id,
            entrant_id: self.entrant_id,
            submitted_at: self.submitted_at.unwrap_or(now),
            duration_secs: self.duration_secs,
            metrics,
        })
    }

    /// Entrant identity derived from the payload, falling back to the id
    /// when the display fields are absent.
    pub fn entrant(&self) -> Entrant {
        Entrant {
            id: self.entrant_id.clone(),
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| self.entrant_id.0.clone()),
            handle: self
                .handle
                .clone()
                .unwrap_or_else(|| format!("@{}", self.entrant_id.0)),
        }
    }
}
