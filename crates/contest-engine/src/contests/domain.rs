use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for contests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContestId(pub String);

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scheduled start and end of a contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ContestWindow {
    pub fn contains(&self, when: DateTime<Utc>) -> bool {
        when >= self.starts_at && when < self.ends_at
    }
}

/// High level lifecycle state reported by the contest directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContestStatus {
    Draft,
    Live,
    Ended,
}

impl ContestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContestStatus::Draft => "draft",
            ContestStatus::Live => "live",
            ContestStatus::Ended => "ended",
        }
    }
}

/// Directory record describing one contest and how many prize tiers it awards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    pub id: ContestId,
    pub name: String,
    pub window: ContestWindow,
    pub status: ContestStatus,
    pub prize_tiers: u8,
}

impl Contest {
    pub fn is_live(&self) -> bool {
        self.status == ContestStatus::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_contains_is_half_open() {
        let starts_at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let ends_at = Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap();
        let window = ContestWindow { starts_at, ends_at };

        assert!(window.contains(starts_at));
        assert!(window.contains(ends_at - chrono::Duration::seconds(1)));
        assert!(!window.contains(ends_at));
        assert!(!window.contains(starts_at - chrono::Duration::seconds(1)));
    }

    #[test]
    fn status_labels_are_stable() {
        assert_eq!(ContestStatus::Draft.label(), "draft");
        assert_eq!(ContestStatus::Live.label(), "live");
        assert_eq!(ContestStatus::Ended.label(), "ended");
    }
}
