use chrono::{DateTime, Utc};

use super::config::{FactorScores, ScoringConfig};
use crate::contests::leaderboard::aggregate::EntrantAggregate;
use crate::contests::leaderboard::domain::{ContentItem, EngagementMetrics};

/// Signals extracted from a scorable unit before the formulas run.
///
/// A single item and an entrant aggregate reduce to the same shape so the
/// formulas stay symmetric across both profiles.
pub(crate) struct ScoreInput {
    pub metrics: EngagementMetrics,
    pub latest_submission: Option<DateTime<Utc>>,
    pub item_count: u32,
    pub duration_known: u32,
    pub duration_in_band: u32,
}

pub(crate) fn input_from_item(item: &ContentItem, config: &ScoringConfig) -> ScoreInput {
    let duration_known = u32::from(item.duration_secs.is_some());
    let duration_in_band = u32::from(
        item.duration_secs
            .map(|secs| config.duration_in_band(secs))
            .unwrap_or(false),
    );

    ScoreInput {
        metrics: item.metrics,
        latest_submission: Some(item.submitted_at),
        item_count: 1,
        duration_known,
        duration_in_band,
    }
}

pub(crate) fn input_from_aggregate(
    aggregate: &EntrantAggregate,
    config: &ScoringConfig,
) -> ScoreInput {
    let mut duration_known = 0;
    let mut duration_in_band = 0;
    for item in &aggregate.items {
        if let Some(secs) = item.duration_secs {
            duration_known += 1;
            if config.duration_in_band(secs) {
                duration_in_band += 1;
            }
        }
    }

    ScoreInput {
        metrics: aggregate.totals,
        latest_submission: aggregate.latest_submission,
        item_count: aggregate.item_count,
        duration_known,
        duration_in_band,
    }
}

/// All six factor scores for one scorable unit.
pub(crate) fn factor_scores(
    input: &ScoreInput,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> FactorScores {
    FactorScores {
        engagement: engagement_score(&input.metrics, config),
        quality: quality_score(input, config, now),
        virality: virality_score(&input.metrics, config),
        recency: recency_score(input, config, now),
        consistency: consistency_score(input, config),
        interaction: interaction_score(&input.metrics),
    }
}

/// Weighted interactions per view, calibrated and capped at 100.
///
/// Comments count double and shares triple: they demand more of the viewer
/// than a like does. The denominator floors at one view so fresh content
/// cannot divide by zero.
pub(crate) fn engagement_score(metrics: &EngagementMetrics, config: &ScoringConfig) -> f64 {
    let weighted =
        metrics.likes as f64 + metrics.comments as f64 * 2.0 + metrics.shares as f64 * 3.0;
    let per_view = weighted / metrics.views.max(1) as f64;
    (per_view * config.engagement_calibration).min(100.0)
}

/// Baseline plus duration, freshness, and engagement-residual bonuses,
/// clamped to [0, 100].
pub(crate) fn quality_score(
    input: &ScoreInput,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = config.quality_baseline;

    if input.duration_known > 0 {
        let compliance = input.duration_in_band as f64 / input.duration_known as f64;
        score += config.duration_bonus * compliance;
    }

    if let Some(latest) = input.latest_submission {
        if hours_since(latest, now) <= config.freshness_window_hours as f64 {
            score += config.freshness_bonus;
        }
    }

    let residual = (input.metrics.engagement_rate() * 100.0).min(config.quality_residual_cap);
    (score + residual).clamp(0.0, 100.0)
}

/// Reach-only factor: ten points per normalization unit of views, capped.
pub(crate) fn virality_score(metrics: &EngagementMetrics, config: &ScoringConfig) -> f64 {
    if config.views_normalization <= 0.0 {
        return 0.0;
    }
    (metrics.views as f64 / config.views_normalization * 10.0).min(100.0)
}

/// Linear decay from 100 to 0 over the recency window. Units that have
/// never submitted score zero.
pub(crate) fn recency_score(
    input: &ScoreInput,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> f64 {
    let Some(latest) = input.latest_submission else {
        return 0.0;
    };
    let window = config.recency_window_hours as f64;
    if window <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - hours_since(latest, now) / window)).clamp(0.0, 100.0)
}

/// Fraction of the consistency target met, as score points.
pub(crate) fn consistency_score(input: &ScoreInput, config: &ScoringConfig) -> f64 {
    let target = config.consistency_target.max(1) as f64;
    (input.item_count as f64 / target).min(1.0) * 100.0
}

/// Share of interactions that required more effort than a like.
pub(crate) fn interaction_score(metrics: &EngagementMetrics) -> f64 {
    let engaged = metrics.comments.saturating_add(metrics.shares);
    engaged as f64 / metrics.interactions().max(1) as f64 * 100.0
}

fn hours_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - earlier).num_minutes() as f64 / 60.0
}
