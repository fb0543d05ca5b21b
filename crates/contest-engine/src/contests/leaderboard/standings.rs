//! Snapshot retention and paged read models.
//!
//! The store keeps exactly two generations per contest: the current snapshot
//! and the one immediately before it. Publishing rotates the pair; anything
//! older is dropped. Growth pulses replace the current snapshot in place
//! without rotating, since they adjust raw counters rather than recompute
//! standings.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contests::leaderboard::domain::{EngagementMetrics, EntrantId};
use crate::contests::leaderboard::ranking::{SortSpec, StandingEntry, StandingsSnapshot};
use crate::contests::ContestId;

/// Largest page a single standings read will return.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_PAGE_SIZE: u32 = 25;

/// A 1-based page selector for standings reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        let page = self.page.max(1) as usize;
        (page - 1).saturating_mul(self.limit())
    }

    pub fn limit(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE) as usize
    }
}

/// Outcome record of the most recent refresh cycles for one contest.
///
/// `last_failure` describes the latest cycle only: it is set when a cycle
/// fails and cleared again by the next successful publish, while the
/// timestamps accumulate as history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshHealth {
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

impl RefreshHealth {
    pub fn is_degraded(&self) -> bool {
        self.last_failure.is_some()
    }
}

/// Additive counter adjustments for one entrant between full recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrantDelta {
    pub entrant_id: EntrantId,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl EntrantDelta {
    fn as_metrics(&self) -> EngagementMetrics {
        EngagementMetrics {
            views: self.views,
            likes: self.likes,
            comments: self.comments,
            shares: self.shares,
        }
    }
}

/// One page of standings plus the context a caller needs to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsPage {
    pub contest_id: ContestId,
    pub computed_at: DateTime<Utc>,
    pub sort: SortSpec,
    pub page: u32,
    pub page_size: u32,
    pub total_entrants: u32,
    pub entries: Vec<StandingEntry>,
    pub winners: Vec<EntrantId>,
    pub refresh: RefreshHealth,
}

impl StandingsPage {
    pub fn from_snapshot(
        snapshot: &StandingsSnapshot,
        request: PageRequest,
        refresh: RefreshHealth,
    ) -> Self {
        let entries = snapshot
            .page_entries(request.offset(), request.limit())
            .to_vec();
        Self {
            contest_id: snapshot.contest_id.clone(),
            computed_at: snapshot.computed_at,
            sort: snapshot.sort,
            page: request.page.max(1),
            page_size: request.limit() as u32,
            total_entrants: snapshot.total_entrants() as u32,
            entries,
            winners: snapshot.winners.clone(),
            refresh,
        }
    }
}

#[derive(Debug, Default)]
struct ContestStandings {
    current: Option<Arc<StandingsSnapshot>>,
    previous: Option<Arc<StandingsSnapshot>>,
    health: RefreshHealth,
}

/// Shared two-generation snapshot store keyed by contest.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<HashMap<ContestId, ContestStandings>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, contest_id: &ContestId) -> Option<Arc<StandingsSnapshot>> {
        let inner = self.inner.read().expect("snapshot store lock poisoned");
        inner.get(contest_id).and_then(|slot| slot.current.clone())
    }

    /// Current and immediately-previous snapshots together, read atomically.
    pub fn pair(
        &self,
        contest_id: &ContestId,
    ) -> Option<(Arc<StandingsSnapshot>, Option<Arc<StandingsSnapshot>>)> {
        let inner = self.inner.read().expect("snapshot store lock poisoned");
        let slot = inner.get(contest_id)?;
        slot.current
            .clone()
            .map(|current| (current, slot.previous.clone()))
    }

    pub fn health(&self, contest_id: &ContestId) -> RefreshHealth {
        let inner = self.inner.read().expect("snapshot store lock poisoned");
        inner
            .get(contest_id)
            .map(|slot| slot.health.clone())
            .unwrap_or_default()
    }

    /// Installs a freshly computed snapshot, rotating the old current into
    /// the previous slot.
    pub fn publish(&self, snapshot: StandingsSnapshot) -> Arc<StandingsSnapshot> {
        let published = Arc::new(snapshot);
        let mut inner = self.inner.write().expect("snapshot store lock poisoned");
        let slot = inner.entry(published.contest_id.clone()).or_default();
        slot.previous = slot.current.take();
        slot.current = Some(Arc::clone(&published));
        slot.health.last_success_at = Some(published.computed_at);
        slot.health.last_failure = None;
        published
    }

    /// Applies growth deltas to the current snapshot's raw counters.
    ///
    /// Ranks, scores, movement, and winners are left exactly as the last
    /// full recompute produced them, and the previous snapshot is not
    /// rotated. Returns `None` when the contest has no snapshot yet.
    pub fn apply_deltas(
        &self,
        contest_id: &ContestId,
        deltas: &[EntrantDelta],
    ) -> Option<Arc<StandingsSnapshot>> {
        if deltas.is_empty() {
            return self.current(contest_id);
        }

        let mut inner = self.inner.write().expect("snapshot store lock poisoned");
        let slot = inner.get_mut(contest_id)?;
        let current = slot.current.as_ref()?;

        let mut adjusted = StandingsSnapshot::clone(current);
        for delta in deltas {
            if let Some(entry) = adjusted
                .entries
                .iter_mut()
                .find(|entry| entry.entrant.id == delta.entrant_id)
            {
                entry.totals.absorb(&delta.as_metrics());
            }
        }

        let updated = Arc::new(adjusted);
        slot.current = Some(Arc::clone(&updated));
        Some(updated)
    }

    /// Records a failed refresh cycle without disturbing retained snapshots.
    pub fn record_failure(&self, contest_id: &ContestId, reason: &str, at: DateTime<Utc>) {
        let mut inner = self.inner.write().expect("snapshot store lock poisoned");
        let slot = inner.entry(contest_id.clone()).or_default();
        slot.health.last_failure_at = Some(at);
        slot.health.last_failure = Some(reason.to_string());
    }
}
