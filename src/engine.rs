//! The emotion response engine.
//!
//! Three pure stages run in order: crisis check, emotion scoring, reply and
//! coping selection. The engine holds only immutable configuration, so one
//! instance can serve every request concurrently without locking.

use crate::config::{EngineConfig, ResponseConfig, ScoringConfig};
use crate::context::{HistoryProvider, UserContext};
use crate::crisis;
use crate::error::Result;
use crate::lexicon::{CRISIS_LABEL, Catalog, NEUTRAL_LABEL};
use crate::responses::Selector;
use crate::scoring::{self, IntensityTier, SecondaryEmotion};
use crate::variant::{FirstVariant, VariantPicker, picker_from_config};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence reported when nothing in the lexicon matched.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Confidence reported for the crisis override.
pub const CRISIS_CONFIDENCE: f64 = 1.0;

/// Where the reply text came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    /// Template tables.
    #[default]
    Lexicon,
    /// An external generator (hosted model).
    External,
}

/// Structured outcome of analyzing one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub emotion: String,
    /// In `0.0..=1.0`.
    pub confidence: f64,
    /// Raw score of the primary emotion (0 for neutral and crisis results).
    pub intensity: u32,
    /// Bucketed intensity; absent for neutral and crisis results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<IntensityTier>,
    /// Up to three matched emotions, strongest first.
    pub all_emotions: Vec<SecondaryEmotion>,
    pub response: String,
    pub coping_strategy: Option<String>,
    pub needs_escalation: bool,
    #[serde(default)]
    pub reply_source: ReplySource,
}

impl AnalysisResult {
    pub fn is_crisis(&self) -> bool {
        self.needs_escalation && self.emotion == CRISIS_LABEL
    }

    pub fn is_neutral(&self) -> bool {
        self.emotion == NEUTRAL_LABEL
    }
}

/// Capability shared by the lexicon engine and any decorator around it.
#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    /// Stable identifier for logs.
    fn name(&self) -> &str;

    /// Analyze a message. Never fails; degraded paths still produce a result.
    async fn analyze(&self, message: &str, context: Option<&UserContext>) -> AnalysisResult;
}

/// Lexicon-backed engine. The fallback of last resort: it has no external
/// dependency and cannot fail.
#[derive(Clone)]
pub struct EmotionResponseEngine {
    catalog: Arc<Catalog>,
    scoring: ScoringConfig,
    responses: ResponseConfig,
    picker: Arc<dyn VariantPicker>,
}

impl std::fmt::Debug for EmotionResponseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionResponseEngine")
            .field("emotions", &self.catalog.lexicon.len())
            .field("crisis_phrases", &self.catalog.crisis.phrases().len())
            .field("scoring", &self.scoring)
            .field("responses", &self.responses)
            .finish()
    }
}

impl EmotionResponseEngine {
    /// Create an engine over `catalog` using the scoring and response
    /// sections of `config`. Variants are picked deterministically (first).
    pub fn new(catalog: Arc<Catalog>, config: &EngineConfig) -> Self {
        Self {
            catalog,
            scoring: config.scoring.clone(),
            responses: config.responses.clone(),
            picker: Arc::new(FirstVariant),
        }
    }

    /// Engine over the built-in catalog with default tuning.
    pub fn builtin() -> Self {
        Self::new(Arc::new(Catalog::builtin()), &EngineConfig::default())
    }

    /// Build everything `config` describes: catalog (file or built-in),
    /// tuning and variant picker.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the catalog cannot be loaded.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin(),
        };
        Ok(Self::new(Arc::new(catalog), config).with_picker(picker_from_config(&config.picker)))
    }

    /// Replace the variant picker.
    pub fn with_picker(mut self, picker: Arc<dyn VariantPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Classify `message` and select a reply.
    pub fn analyze(&self, message: &str, context: Option<&UserContext>) -> AnalysisResult {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return self.neutral_result();
        }

        let lower = trimmed.to_lowercase();
        if crisis::is_crisis_lowered(&lower, &self.catalog.crisis) {
            warn!(
                message_len = trimmed.len(),
                "crisis language detected, escalating"
            );
            return self.crisis_result();
        }

        let Some(detection) =
            scoring::detect_lowered(&lower, &self.catalog.lexicon, &self.scoring)
        else {
            debug!(message_len = trimmed.len(), "no lexicon match");
            return self.neutral_result();
        };

        let selection = Selector {
            responses: &self.catalog.responses,
            coping: &self.catalog.coping,
            config: &self.responses,
            picker: self.picker.as_ref(),
        }
        .select(
            &detection.primary.label,
            detection.tier,
            detection.primary.raw_score,
            context,
            &lower,
        );

        debug!(
            emotion = detection.primary.label.as_str(),
            score = detection.primary.raw_score,
            signals = detection.primary.signal_count,
            tier = detection.tier.as_str(),
            confidence = detection.confidence,
            "message classified"
        );

        AnalysisResult {
            emotion: detection.primary.label,
            confidence: detection.confidence,
            intensity: detection.primary.raw_score,
            tier: Some(detection.tier),
            all_emotions: detection.all_emotions,
            response: selection.response,
            coping_strategy: selection.coping_strategy,
            needs_escalation: false,
            reply_source: ReplySource::Lexicon,
        }
    }

    /// The fixed result for crisis language.
    pub fn crisis_result(&self) -> AnalysisResult {
        AnalysisResult {
            emotion: CRISIS_LABEL.to_owned(),
            confidence: CRISIS_CONFIDENCE,
            intensity: 0,
            tier: None,
            all_emotions: Vec::new(),
            response: self.catalog.crisis.reply().to_owned(),
            coping_strategy: None,
            needs_escalation: true,
            reply_source: ReplySource::Lexicon,
        }
    }

    /// The fixed result for empty or unmatched input.
    pub fn neutral_result(&self) -> AnalysisResult {
        AnalysisResult {
            emotion: NEUTRAL_LABEL.to_owned(),
            confidence: NEUTRAL_CONFIDENCE,
            intensity: 0,
            tier: None,
            all_emotions: Vec::new(),
            response: self.catalog.responses.neutral().to_owned(),
            coping_strategy: None,
            needs_escalation: false,
            reply_source: ReplySource::Lexicon,
        }
    }
}

#[async_trait]
impl EmotionAnalyzer for EmotionResponseEngine {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn analyze(&self, message: &str, context: Option<&UserContext>) -> AnalysisResult {
        EmotionResponseEngine::analyze(self, message, context)
    }
}

/// Fetch the user's context and analyze `message` with it.
///
/// A failing history provider is logged and analysis continues without
/// context.
pub async fn analyze_for_user<A, H>(
    analyzer: &A,
    history: &H,
    user_id: i64,
    message: &str,
) -> AnalysisResult
where
    A: EmotionAnalyzer + ?Sized,
    H: HistoryProvider + ?Sized,
{
    let context = match history.recent_context(user_id).await {
        Ok(context) => context,
        Err(e) => {
            warn!(user_id, error = %e, "history lookup failed, analyzing without context");
            None
        }
    };
    analyzer.analyze(message, context.as_ref()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::context::{HistoryMessage, InMemoryHistory};
    use crate::error::MeloError;

    struct BrokenHistory;

    #[async_trait]
    impl HistoryProvider for BrokenHistory {
        async fn recent_context(&self, _user_id: i64) -> Result<Option<UserContext>> {
            Err(MeloError::History("database unavailable".to_owned()))
        }
    }

    #[test]
    fn whitespace_only_is_neutral() {
        let result = EmotionResponseEngine::builtin().analyze("   \n\t", None);
        assert!(result.is_neutral());
        assert_eq!(result.confidence, NEUTRAL_CONFIDENCE);
        assert!(result.all_emotions.is_empty());
    }

    #[test]
    fn crisis_beats_strong_emotion() {
        let result = EmotionResponseEngine::builtin()
            .analyze("I'm so happy and amazing today but I want to die", None);
        assert!(result.is_crisis());
        assert_eq!(result.confidence, CRISIS_CONFIDENCE);
        assert!(result.coping_strategy.is_none());
        assert!(result.all_emotions.is_empty());
    }

    #[test]
    fn detection_fills_tier_and_intensity() {
        let result = EmotionResponseEngine::builtin().analyze("I feel so anxious", None);
        assert_eq!(result.emotion, "Anxiety");
        assert_eq!(result.intensity, 2);
        assert_eq!(result.tier, Some(IntensityTier::Medium));
        assert!(!result.needs_escalation);
        assert_eq!(result.reply_source, ReplySource::Lexicon);
    }

    #[test]
    fn emotion_without_templates_still_replies() {
        let result = EmotionResponseEngine::builtin().analyze("I adore my grandmother", None);
        assert_eq!(result.emotion, "Love");
        assert_eq!(result.response, "I'm here for you.");
        assert!(result.coping_strategy.is_none());
    }

    #[test]
    fn debug_lists_sizes_not_tables() {
        let debug = format!("{:?}", EmotionResponseEngine::builtin());
        assert!(debug.contains("emotions: 9"));
    }

    #[tokio::test]
    async fn trait_and_inherent_paths_agree() {
        let engine = EmotionResponseEngine::builtin();
        let direct = engine.analyze("I'm so frustrated", None);
        let via_trait = EmotionAnalyzer::analyze(&engine, "I'm so frustrated", None).await;
        assert_eq!(direct, via_trait);
    }

    #[tokio::test]
    async fn history_enables_recurring_reply() {
        let engine = EmotionResponseEngine::builtin();
        let history = InMemoryHistory::default();
        for _ in 0..12 {
            history.record(1, HistoryMessage::user("sad again"));
        }
        let result = analyze_for_user(&engine, &history, 1, "I am so sad").await;
        assert_eq!(
            result.response,
            "I know sadness visits you often. You're stronger than you think."
        );
    }

    #[tokio::test]
    async fn history_failure_degrades_to_no_context() {
        let engine = EmotionResponseEngine::builtin();
        let result = analyze_for_user(&engine, &BrokenHistory, 1, "I am so sad").await;
        assert_eq!(result.emotion, "Sadness");
        assert!(result.response.starts_with("I can feel your sadness"));
    }
}
