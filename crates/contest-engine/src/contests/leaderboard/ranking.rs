//! Ordering, dense ranks, movement, and prize tiers for standings.
//!
//! Snapshots are computed under one sort specification and can be re-sorted
//! into derived views without touching the stored metrics. Ties on the sort
//! value keep the previous snapshot's order so equal entrants do not swap
//! places between refreshes; entrants absent from the previous snapshot fall
//! back to id order.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contests::leaderboard::domain::{EngagementMetrics, Entrant, EntrantId};
use crate::contests::leaderboard::scoring::{ProfileId, ScoreSet};
use crate::contests::Contest;

/// Which raw figure orders the standings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    FinalScore,
    RawViews,
    RawLikes,
    RawComments,
    RawShares,
}

impl SortKey {
    pub const fn label(&self) -> &'static str {
        match self {
            SortKey::FinalScore => "final_score",
            SortKey::RawViews => "raw_views",
            SortKey::RawLikes => "raw_likes",
            SortKey::RawComments => "raw_comments",
            SortKey::RawShares => "raw_shares",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// A complete ordering instruction for one standings view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

/// Where an entrant moved relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankChange {
    Up(u32),
    Down(u32),
    Same,
    New,
}

/// A scored entrant waiting to be ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntrant {
    pub entrant: Entrant,
    pub scores: ScoreSet,
    pub totals: EngagementMetrics,
    pub submissions: u32,
}

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: u32,
    pub previous_rank: Option<u32>,
    pub entrant: Entrant,
    pub scores: ScoreSet,
    pub totals: EngagementMetrics,
    pub submissions: u32,
    pub change: RankChange,
    pub is_winner: bool,
    pub prize_tier: Option<u8>,
}

/// The full ranked state of one contest at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsSnapshot {
    pub contest_id: crate::contests::ContestId,
    pub computed_at: DateTime<Utc>,
    pub sort: SortSpec,
    pub profile: ProfileId,
    pub entries: Vec<StandingEntry>,
    pub winners: Vec<EntrantId>,
}

impl StandingsSnapshot {
    /// Page slice with globally correct ranks. An offset past the end is an
    /// empty page, not an error.
    pub fn page_entries(&self, offset: usize, limit: usize) -> &[StandingEntry] {
        let start = offset.min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        &self.entries[start..end]
    }

    pub fn total_entrants(&self) -> usize {
        self.entries.len()
    }
}

/// Turns scored entrants into ranked snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingEngine;

impl RankingEngine {
    /// Ranks `scored` under `sort`, diffing movement against `previous`.
    ///
    /// Ranks are dense and purely positional: 1..N with no gaps, one per
    /// row. Entrants tied on the sort value keep the previous snapshot's
    /// relative order (id order without history) instead of sharing a rank
    /// number. Prize tiers cover every entrant whose rank falls within the
    /// contest's tier count.
    pub fn build_snapshot(
        &self,
        contest: &Contest,
        mut scored: Vec<ScoredEntrant>,
        previous: Option<&StandingsSnapshot>,
        sort: SortSpec,
        computed_at: DateTime<Utc>,
    ) -> StandingsSnapshot {
        let previous_positions: HashMap<&EntrantId, (usize, u32)> = previous
            .map(|snapshot| {
                snapshot
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| (&entry.entrant.id, (index, entry.rank)))
                    .collect()
            })
            .unwrap_or_default();

        scored.sort_by(|a, b| {
            compare_values(sort_value(a, sort.key), sort_value(b, sort.key), sort.direction)
                .then_with(|| {
                    tie_order(a, &previous_positions).cmp(&tie_order(b, &previous_positions))
                })
        });

        let mut entries = Vec::with_capacity(scored.len());
        for (position, candidate) in scored.into_iter().enumerate() {
            let rank = position as u32 + 1;
            let previous_rank = previous_positions
                .get(&candidate.entrant.id)
                .map(|(_, earlier)| *earlier);
            let change = match previous_rank {
                None => RankChange::New,
                Some(earlier) => match earlier.cmp(&rank) {
                    Ordering::Greater => RankChange::Up(earlier - rank),
                    Ordering::Less => RankChange::Down(rank - earlier),
                    Ordering::Equal => RankChange::Same,
                },
            };
            let prize_tier = (rank <= u32::from(contest.prize_tiers)).then_some(rank as u8);
            entries.push(StandingEntry {
                rank,
                previous_rank,
                entrant: candidate.entrant,
                scores: candidate.scores,
                totals: candidate.totals,
                submissions: candidate.submissions,
                change,
                is_winner: prize_tier.is_some(),
                prize_tier,
            });
        }

        let winners = entries
            .iter()
            .filter(|entry| entry.prize_tier.is_some())
            .map(|entry| entry.entrant.id.clone())
            .collect();

        StandingsSnapshot {
            contest_id: contest.id.clone(),
            computed_at,
            sort,
            profile: ProfileId::Leaderboard,
            entries,
            winners,
        }
    }

    /// Derives a differently-sorted view of an existing snapshot.
    ///
    /// Metrics and scores are untouched, so the view keeps the source
    /// snapshot's `computed_at`. Movement is diffed against the previous
    /// snapshot re-ranked under the same sort, and winners are re-evaluated
    /// for the new order.
    pub fn resort(
        &self,
        contest: &Contest,
        snapshot: &StandingsSnapshot,
        previous: Option<&StandingsSnapshot>,
        sort: SortSpec,
    ) -> StandingsSnapshot {
        let previous_view = previous.map(|earlier| {
            self.build_snapshot(contest, rescore_input(earlier), None, sort, earlier.computed_at)
        });
        self.build_snapshot(
            contest,
            rescore_input(snapshot),
            previous_view.as_ref(),
            sort,
            snapshot.computed_at,
        )
    }
}

fn rescore_input(snapshot: &StandingsSnapshot) -> Vec<ScoredEntrant> {
    snapshot
        .entries
        .iter()
        .map(|entry| ScoredEntrant {
            entrant: entry.entrant.clone(),
            scores: entry.scores.clone(),
            totals: entry.totals,
            submissions: entry.submissions,
        })
        .collect()
}

fn sort_value(scored: &ScoredEntrant, key: SortKey) -> u64 {
    match key {
        SortKey::FinalScore => u64::from(scored.scores.final_score),
        SortKey::RawViews => scored.totals.views,
        SortKey::RawLikes => scored.totals.likes,
        SortKey::RawComments => scored.totals.comments,
        SortKey::RawShares => scored.totals.shares,
    }
}

fn compare_values(a: u64, b: u64, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => a.cmp(&b),
        SortDirection::Descending => b.cmp(&a),
    }
}

fn tie_order<'a>(
    scored: &'a ScoredEntrant,
    previous_positions: &HashMap<&EntrantId, (usize, u32)>,
) -> (usize, &'a str) {
    let earlier = previous_positions
        .get(&scored.entrant.id)
        .map(|(index, _)| *index)
        .unwrap_or(usize::MAX);
    (earlier, scored.entrant.id.0.as_str())
}
