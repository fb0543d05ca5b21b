use serde::{Deserialize, Serialize};

/// Names the two scoring weight profiles the engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileId {
    /// Immediate per-submission feedback shown right after intake.
    Submission,
    /// Aggregate profile driving the live leaderboard.
    Leaderboard,
}

impl ProfileId {
    pub const fn label(self) -> &'static str {
        match self {
            ProfileId::Submission => "submission",
            ProfileId::Leaderboard => "leaderboard",
        }
    }
}

/// Raw factor scores prior to weighting, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub engagement: f64,
    pub quality: f64,
    pub virality: f64,
    pub recency: f64,
    pub consistency: f64,
    pub interaction: f64,
}

/// Weighting applied to each factor when composing a final score.
///
/// Weights of a profile sum to 1.0; the per-submission profile leaves the
/// aggregate-only bonus factors at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub engagement: f64,
    pub quality: f64,
    pub virality: f64,
    pub recency: f64,
    pub consistency: f64,
    pub interaction: f64,
}

impl WeightProfile {
    pub const fn submission() -> Self {
        Self {
            engagement: 0.60,
            quality: 0.20,
            virality: 0.20,
            recency: 0.0,
            consistency: 0.0,
            interaction: 0.0,
        }
    }

    pub const fn leaderboard() -> Self {
        Self {
            engagement: 0.35,
            quality: 0.15,
            virality: 0.25,
            recency: 0.10,
            consistency: 0.10,
            interaction: 0.05,
        }
    }

    pub fn for_profile(profile: ProfileId) -> Self {
        match profile {
            ProfileId::Submission => Self::submission(),
            ProfileId::Leaderboard => Self::leaderboard(),
        }
    }

    pub fn total(&self) -> f64 {
        self.engagement
            + self.quality
            + self.virality
            + self.recency
            + self.consistency
            + self.interaction
    }

    pub fn weighted_total(&self, scores: &FactorScores) -> f64 {
        scores.engagement * self.engagement
            + scores.quality * self.quality
            + scores.virality * self.virality
            + scores.recency * self.recency
            + scores.consistency * self.consistency
            + scores.interaction * self.interaction
    }

    /// Integer final score: the weighted combination rounded half-up and
    /// clamped to [0, 100].
    pub fn final_score(&self, scores: &FactorScores) -> u8 {
        self.weighted_total(scores).round().clamp(0.0, 100.0) as u8
    }
}

/// Tunable calibration for the scoring formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Multiplier turning the weighted interaction ratio into score points.
    pub engagement_calibration: f64,
    /// Views corresponding to ten virality points.
    pub views_normalization: f64,
    /// Quality score every scorable unit starts from.
    pub quality_baseline: f64,
    /// Inclusive duration band rewarded by the quality bonus.
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    pub duration_bonus: f64,
    /// Submissions newer than this earn the freshness bonus.
    pub freshness_window_hours: i64,
    pub freshness_bonus: f64,
    /// Cap on the engagement residual folded into quality.
    pub quality_residual_cap: f64,
    /// Hours over which the recency factor decays from 100 to 0.
    pub recency_window_hours: i64,
    /// Submissions needed for a full consistency score.
    pub consistency_target: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engagement_calibration: 1_000.0,
            views_normalization: 10_000.0,
            quality_baseline: 50.0,
            min_duration_secs: 30,
            max_duration_secs: 180,
            duration_bonus: 15.0,
            freshness_window_hours: 48,
            freshness_bonus: 20.0,
            quality_residual_cap: 15.0,
            recency_window_hours: 72,
            consistency_target: 5,
        }
    }
}

impl ScoringConfig {
    pub fn duration_in_band(&self, duration_secs: u32) -> bool {
        duration_secs >= self.min_duration_secs && duration_secs <= self.max_duration_secs
    }

    pub fn weights(&self, profile: ProfileId) -> WeightProfile {
        WeightProfile::for_profile(profile)
    }
}
