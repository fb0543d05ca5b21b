//! Score calculation for contest entries.
//!
//! Three primary factors (engagement, quality, virality) plus three
//! leaderboard-only factors (recency, consistency, interaction) are blended
//! into a 0-100 final score by a [`WeightProfile`]. Every score carries its
//! component breakdown so standings can explain themselves.

pub mod config;
mod formula;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contests::leaderboard::aggregate::EntrantAggregate;
use crate::contests::leaderboard::domain::ContentItem;
use formula::ScoreInput;

pub use config::{FactorScores, ProfileId, ScoringConfig, WeightProfile};

/// The individual factors that can contribute to a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Engagement,
    Quality,
    Virality,
    Recency,
    Consistency,
    Interaction,
}

impl ScoreFactor {
    pub const fn label(&self) -> &'static str {
        match self {
            ScoreFactor::Engagement => "engagement",
            ScoreFactor::Quality => "quality",
            ScoreFactor::Virality => "virality",
            ScoreFactor::Recency => "recency",
            ScoreFactor::Consistency => "consistency",
            ScoreFactor::Interaction => "interaction",
        }
    }
}

/// One weighted factor in a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub value: f64,
    pub weight: f64,
    pub weighted: f64,
    pub notes: String,
}

/// A complete scoring result for one item or one entrant aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub profile: ProfileId,
    pub engagement_score: f64,
    pub quality_score: f64,
    pub virality_score: f64,
    pub final_score: u8,
    pub components: Vec<ScoreComponent>,
}

/// Applies the scoring formulas under a fixed [`ScoringConfig`].
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl ScoreCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores a single submission under the submission profile.
    pub fn score_item(&self, item: &ContentItem, now: DateTime<Utc>) -> ScoreSet {
        let input = formula::input_from_item(item, &self.config);
        self.score_input(&input, ProfileId::Submission, now)
    }

    /// Scores an entrant's aggregated body of work under the leaderboard
    /// profile.
    pub fn score_aggregate(&self, aggregate: &EntrantAggregate, now: DateTime<Utc>) -> ScoreSet {
        let input = formula::input_from_aggregate(aggregate, &self.config);
        self.score_input(&input, ProfileId::Leaderboard, now)
    }

    fn score_input(&self, input: &ScoreInput, profile: ProfileId, now: DateTime<Utc>) -> ScoreSet {
        let factors = formula::factor_scores(input, &self.config, now);
        let weights = self.config.weights(profile);
        let components = build_components(input, &factors, &weights);

        ScoreSet {
            profile,
            engagement_score: factors.engagement,
            quality_score: factors.quality,
            virality_score: factors.virality,
            final_score: weights.final_score(&factors),
            components,
        }
    }
}

fn build_components(
    input: &ScoreInput,
    factors: &FactorScores,
    weights: &WeightProfile,
) -> Vec<ScoreComponent> {
    let pairs = [
        (ScoreFactor::Engagement, factors.engagement, weights.engagement),
        (ScoreFactor::Quality, factors.quality, weights.quality),
        (ScoreFactor::Virality, factors.virality, weights.virality),
        (ScoreFactor::Recency, factors.recency, weights.recency),
        (ScoreFactor::Consistency, factors.consistency, weights.consistency),
        (ScoreFactor::Interaction, factors.interaction, weights.interaction),
    ];

    pairs
        .into_iter()
        .filter(|(_, _, weight)| *weight > 0.0)
        .map(|(factor, value, weight)| ScoreComponent {
            factor,
            value,
            weight,
            weighted: value * weight,
            notes: factor_notes(factor, input),
        })
        .collect()
}

fn factor_notes(factor: ScoreFactor, input: &ScoreInput) -> String {
    let metrics = &input.metrics;
    match factor {
        ScoreFactor::Engagement => format!(
            "{} likes, {} comments, {} shares over {} views",
            metrics.likes, metrics.comments, metrics.shares, metrics.views
        ),
        ScoreFactor::Quality => format!(
            "{} of {} items with known duration in the preferred band",
            input.duration_in_band, input.duration_known
        ),
        ScoreFactor::Virality => format!("{} views", metrics.views),
        ScoreFactor::Recency => match input.latest_submission {
            Some(latest) => format!("latest submission at {}", latest.to_rfc3339()),
            None => "no submissions yet".to_string(),
        },
        ScoreFactor::Consistency => format!("{} submissions counted", input.item_count),
        ScoreFactor::Interaction => format!(
            "{} comments and {} shares of {} interactions",
            metrics.comments,
            metrics.shares,
            metrics.interactions()
        ),
    }
}
