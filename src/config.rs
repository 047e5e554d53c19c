//! Configuration types for the emotion engine.

use crate::error::{MeloError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest accepted per-tier phrase weight.
pub const MAX_PHRASE_WEIGHT: u32 = 1_000;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Optional catalog file replacing the built-in lexicon and tables.
    pub catalog_path: Option<PathBuf>,
    /// Scoring weights, confidence curve and tier thresholds.
    pub scoring: ScoringConfig,
    /// Response and coping selection thresholds.
    pub responses: ResponseConfig,
    /// How a [`UserContext`](crate::context::UserContext) is derived from history.
    pub context: ContextConfig,
    /// Template variant selection.
    pub picker: PickerConfig,
    /// Optional hosted-model reply source.
    pub source: SourceConfig,
}

/// Scoring configuration.
///
/// Defaults reproduce the classic tuning: `0.5 + score * 0.08`, capped at
/// `0.98`, with no signal-count bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of a matched `strong` phrase.
    pub strong_weight: u32,
    /// Weight of a matched `medium` phrase.
    pub medium_weight: u32,
    /// Weight of a matched `weak` phrase.
    pub weak_weight: u32,
    /// Weight of a matched `context` phrase.
    pub context_weight: u32,
    /// Confidence floor for any non-zero score.
    pub base_offset: f64,
    /// Confidence gained per raw score point.
    pub score_gain: f64,
    /// Upper bound on confidence for lexicon detections.
    pub confidence_cap: f64,
    /// Bonus per distinct matched phrase beyond the first.
    ///
    /// Set to 0.0 to disable corroboration bonuses.
    pub signal_bonus: f64,
    /// Upper bound on the total signal bonus.
    pub signal_bonus_cap: f64,
    /// Divisor used to normalize secondary-emotion scores.
    pub normalization_divisor: f64,
    /// Maximum number of entries in `all_emotions`.
    pub max_secondary: usize,
    /// Raw scores below this are `weak`.
    pub medium_threshold: u32,
    /// Raw scores at or above this are `strong`.
    pub strong_threshold: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strong_weight: 3,
            medium_weight: 2,
            weak_weight: 1,
            context_weight: 2,
            base_offset: 0.5,
            score_gain: 0.08,
            confidence_cap: 0.98,
            signal_bonus: 0.0,
            signal_bonus_cap: 0.1,
            normalization_divisor: 10.0,
            max_secondary: 3,
            medium_threshold: 2,
            strong_threshold: 5,
        }
    }
}

/// Response selection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Prior message count above which a `recurring` template is preferred.
    pub recurring_message_threshold: usize,
    /// Raw scores below this never receive a coping suggestion.
    pub coping_min_score: u32,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            recurring_message_threshold: 10,
            coping_min_score: 2,
        }
    }
}

/// History-to-context derivation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of most recent messages inspected.
    pub history_window: usize,
    /// A user "has history" when more messages than this are available.
    pub min_history_messages: usize,
    /// Maximum number of recent themes carried in the context.
    pub max_themes: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: 50,
            min_history_messages: 5,
            max_themes: 10,
        }
    }
}

/// Strategy used to choose among equally valid template variants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickerMode {
    /// Always the first variant.
    #[default]
    First,
    /// Reproducible pseudo-random choice derived from `seed` and the slot.
    Seeded,
    /// Thread-local randomness.
    Random,
}

/// Template variant picker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub mode: PickerMode,
    /// Seed for [`PickerMode::Seeded`].
    pub seed: u64,
}

/// Hosted-model reply source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Whether the hosted source decorates the lexicon engine.
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible server.
    pub api_url: String,
    /// Model name to request.
    pub api_model: String,
    /// Environment variable holding the API key (empty = no auth header).
    pub api_key_env: String,
    /// Hard bound on a single generation, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum tokens to generate per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// System prompt sent with every request.
    pub system_prompt: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.openai.com".to_owned(),
            api_model: "gpt-4o-mini".to_owned(),
            api_key_env: "MELO_API_KEY".to_owned(),
            timeout_ms: 8_000,
            max_tokens: 200,
            temperature: 0.7,
            system_prompt: "You are Melo, a warm and supportive listener. Reply in two or three \
                            short sentences. Acknowledge the feeling before anything else. Never \
                            diagnose and never give medical advice."
                .to_owned(),
        }
    }
}

impl SourceConfig {
    /// Resolve the API key from the configured environment variable.
    ///
    /// Returns an empty string when no variable is configured or it is unset.
    pub fn resolve_api_key(&self) -> String {
        if self.api_key_env.trim().is_empty() {
            return String::new();
        }
        std::env::var(&self.api_key_env).unwrap_or_default()
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| MeloError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MeloError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/melo/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("melo").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("melo")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/melo-config/config.toml")
        }
    }

    /// Check numeric invariants the scorer relies on.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Config`] describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.normalization_divisor.is_nan() || s.normalization_divisor <= 0.0 {
            return Err(MeloError::Config(
                "scoring.normalization_divisor must be positive".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&s.confidence_cap) {
            return Err(MeloError::Config(
                "scoring.confidence_cap must be within 0.0..=1.0".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&s.base_offset) {
            return Err(MeloError::Config(
                "scoring.base_offset must be within 0.0..=1.0".to_owned(),
            ));
        }
        if s.score_gain < 0.0 || s.signal_bonus < 0.0 || s.signal_bonus_cap < 0.0 {
            return Err(MeloError::Config(
                "scoring gains and bonuses must not be negative".to_owned(),
            ));
        }
        let weights = [
            ("strong_weight", s.strong_weight),
            ("medium_weight", s.medium_weight),
            ("weak_weight", s.weak_weight),
            ("context_weight", s.context_weight),
        ];
        for (name, weight) in weights {
            if weight > MAX_PHRASE_WEIGHT {
                return Err(MeloError::Config(format!(
                    "scoring.{name} ({weight}) exceeds {MAX_PHRASE_WEIGHT}"
                )));
            }
        }
        if s.medium_threshold > s.strong_threshold {
            return Err(MeloError::Config(format!(
                "scoring.medium_threshold ({}) exceeds strong_threshold ({})",
                s.medium_threshold, s.strong_threshold
            )));
        }
        if self.source.enabled && self.source.timeout_ms == 0 {
            return Err(MeloError::Config(
                "source.timeout_ms must be non-zero when the source is enabled".to_owned(),
            ));
        }
        Ok(())
    }
}
