use chrono::{DateTime, Utc};

use super::domain::{ContentItem, EngagementMetrics, EntrantId};

/// Aggregated signals for one entrant across every submission in a contest.
///
/// Totals are derived values. Nothing here is stored between refresh cycles;
/// the aggregator re-folds the item list every time so metric corrections
/// flow through without reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantAggregate {
    pub entrant_id: EntrantId,
    pub totals: EngagementMetrics,
    pub item_count: u32,
    pub latest_submission: Option<DateTime<Utc>>,
    pub items: Vec<ContentItem>,
}

impl EntrantAggregate {
    pub fn engagement_rate(&self) -> f64 {
        self.totals.engagement_rate()
    }
}

/// Fold an entrant's submissions into aggregate totals.
///
/// An empty item list is a valid input: the entrant still flows through
/// scoring and ranking with zeroed totals.
pub fn aggregate_items(entrant_id: EntrantId, items: Vec<ContentItem>) -> EntrantAggregate {
    let mut totals = EngagementMetrics::default();
    let mut latest_submission: Option<DateTime<Utc>> = None;

    for item in &items {
        totals.absorb(&item.metrics);
        latest_submission = Some(
            latest_submission.map_or(item.submitted_at, |current| current.max(item.submitted_at)),
        );
    }

    EntrantAggregate {
        entrant_id,
        totals,
        item_count: items.len() as u32,
        latest_submission,
        items,
    }
}
