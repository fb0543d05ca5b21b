mod parser;

use crate::contests::leaderboard::{
    domain::{ContentItemId, EntrantId, InvalidMetricError, MetricSample, SubmissionPayload},
    SubmissionStore, SubmissionStoreError,
};
use crate::contests::ContestId;
use chrono::Utc;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use parser::RosterRecord;

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Metric(InvalidMetricError),
    Store(SubmissionStoreError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Metric(err) => write!(f, "roster row failed validation: {}", err),
            RosterImportError::Store(err) => write!(f, "could not record roster row: {}", err),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Metric(err) => Some(err),
            RosterImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<InvalidMetricError> for RosterImportError {
    fn from(err: InvalidMetricError) -> Self {
        Self::Metric(err)
    }
}

impl From<SubmissionStoreError> for RosterImportError {
    fn from(err: SubmissionStoreError) -> Self {
        Self::Store(err)
    }
}

/// Counts reported after a roster import completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterSummary {
    pub entrants: usize,
    pub items: usize,
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P, S>(
        path: P,
        store: &S,
        contest_id: &ContestId,
    ) -> Result<RosterSummary, RosterImportError>
    where
        P: AsRef<Path>,
        S: SubmissionStore,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, store, contest_id)
    }

    pub fn from_reader<R, S>(
        reader: R,
        store: &S,
        contest_id: &ContestId,
    ) -> Result<RosterSummary, RosterImportError>
    where
        R: Read,
        S: SubmissionStore,
    {
        let now = Utc::now();
        let mut seen_entrants: HashSet<EntrantId> = HashSet::new();
        let mut seen_items: HashSet<ContentItemId> = HashSet::new();
        let mut summary = RosterSummary { entrants: 0, items: 0 };

        for record in parser::parse_records(reader)? {
            let payload = submission_for(record);
            if !seen_items.insert(payload.item_id.clone()) {
                continue;
            }

            if seen_entrants.insert(payload.entrant_id.clone()) {
                store.upsert_entrant(contest_id, payload.entrant())?;
                summary.entrants += 1;
            }

            let item = payload.into_item(now)?;
            store.record_item(contest_id, item)?;
            summary.items += 1;
        }

        Ok(summary)
    }
}

fn submission_for(record: RosterRecord) -> SubmissionPayload {
    SubmissionPayload {
        item_id: ContentItemId(record.item_id),
        entrant_id: EntrantId(record.entrant_id),
        display_name: record.display_name,
        handle: record.handle,
        submitted_at: record.submitted_at,
        duration_secs: record.duration_secs,
        metrics: MetricSample {
            views: record.views,
            likes: record.likes,
            comments: record.comments,
            shares: record.shares,
        },
    }
}
