//! Weighted keyword scoring over an [`EmotionLexicon`].
//!
//! For every emotion, every phrase that occurs as a substring of the
//! lower-cased message adds its tier weight. The highest total wins; ties go
//! to the emotion listed first. Confidence is a saturating function of the
//! winning score, not a calibrated probability.
//!
//! Only presence is detected. "I am not sad" scores as sadness, and sarcasm
//! reads literally.

use crate::config::ScoringConfig;
use crate::lexicon::{EmotionLexicon, PhraseTier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-emotion evidence for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEmotion {
    pub label: String,
    /// Sum of tier weights over matched phrases, saturating at `u32::MAX`.
    pub raw_score: u32,
    /// Number of distinct phrases matched.
    pub signal_count: u32,
}

/// Bucketed strength of the winning score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityTier {
    Weak,
    Medium,
    Strong,
}

impl IntensityTier {
    /// Bucket a raw score using the configured thresholds.
    pub fn from_score(raw_score: u32, config: &ScoringConfig) -> Self {
        if raw_score < config.medium_threshold {
            Self::Weak
        } else if raw_score < config.strong_threshold {
            Self::Medium
        } else {
            Self::Strong
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// An emotion with a score normalized by the configured divisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryEmotion {
    pub label: String,
    pub score: f64,
}

/// Outcome of scoring a message that matched at least one phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub primary: ScoredEmotion,
    pub confidence: f64,
    pub tier: IntensityTier,
    /// Matched emotions, strongest first, at most `max_secondary` long.
    pub all_emotions: Vec<SecondaryEmotion>,
}

/// Score every emotion in lexicon order, including zero scores.
pub fn score_emotions(
    text: &str,
    lexicon: &EmotionLexicon,
    config: &ScoringConfig,
) -> Vec<ScoredEmotion> {
    score_lowered(&text.to_lowercase(), lexicon, config)
}

pub(crate) fn score_lowered(
    lower: &str,
    lexicon: &EmotionLexicon,
    config: &ScoringConfig,
) -> Vec<ScoredEmotion> {
    lexicon
        .iter()
        .map(|entry| {
            let mut raw_score: u32 = 0;
            let mut matched: HashSet<&str> = HashSet::new();
            for (tier, phrases) in entry.tiers() {
                let weight = tier_weight(tier, config);
                for phrase in phrases {
                    if lower.contains(phrase.as_str()) {
                        raw_score = raw_score.saturating_add(weight);
                        matched.insert(phrase.as_str());
                    }
                }
            }
            ScoredEmotion {
                label: entry.name.clone(),
                raw_score,
                signal_count: matched.len() as u32,
            }
        })
        .collect()
}

/// The first emotion holding the maximum score, or `None` if nothing scored.
pub fn primary(scores: &[ScoredEmotion]) -> Option<&ScoredEmotion> {
    let mut best: Option<&ScoredEmotion> = None;
    for scored in scores {
        if scored.raw_score > best.map_or(0, |b| b.raw_score) {
            best = Some(scored);
        }
    }
    best
}

/// Confidence for a winning score.
///
/// `min(base_offset + raw * score_gain, cap)` plus a capped bonus for each
/// corroborating phrase beyond the first, re-capped at `confidence_cap`.
pub fn confidence(raw_score: u32, signal_count: u32, config: &ScoringConfig) -> f64 {
    let base = (config.base_offset + f64::from(raw_score) * config.score_gain)
        .min(config.confidence_cap);
    let bonus = (f64::from(signal_count.saturating_sub(1)) * config.signal_bonus)
        .min(config.signal_bonus_cap);
    (base + bonus).min(config.confidence_cap).clamp(0.0, 1.0)
}

/// Matched emotions, strongest first, normalized and truncated.
///
/// Sorting is stable, so equal scores keep lexicon order.
pub fn rank_secondary(scores: &[ScoredEmotion], config: &ScoringConfig) -> Vec<SecondaryEmotion> {
    let mut matched: Vec<&ScoredEmotion> = scores.iter().filter(|s| s.raw_score > 0).collect();
    matched.sort_by(|a, b| b.raw_score.cmp(&a.raw_score));
    matched
        .into_iter()
        .take(config.max_secondary)
        .map(|s| SecondaryEmotion {
            label: s.label.clone(),
            score: f64::from(s.raw_score) / config.normalization_divisor,
        })
        .collect()
}

/// Score a lower-cased message and derive the primary detection.
///
/// Returns `None` when no phrase matched.
pub(crate) fn detect_lowered(
    lower: &str,
    lexicon: &EmotionLexicon,
    config: &ScoringConfig,
) -> Option<Detection> {
    let scores = score_lowered(lower, lexicon, config);
    let primary = primary(&scores)?.clone();
    Some(Detection {
        confidence: confidence(primary.raw_score, primary.signal_count, config),
        tier: IntensityTier::from_score(primary.raw_score, config),
        all_emotions: rank_secondary(&scores, config),
        primary,
    })
}

/// Score a message and derive the primary detection.
pub fn detect(text: &str, lexicon: &EmotionLexicon, config: &ScoringConfig) -> Option<Detection> {
    detect_lowered(&text.to_lowercase(), lexicon, config)
}

fn tier_weight(tier: PhraseTier, config: &ScoringConfig) -> u32 {
    match tier {
        PhraseTier::Strong => config.strong_weight,
        PhraseTier::Medium => config.medium_weight,
        PhraseTier::Weak => config.weak_weight,
        PhraseTier::Context => config.context_weight,
    }
}
