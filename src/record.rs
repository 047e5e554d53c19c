//! Persistence and wire shapes derived from an [`AnalysisResult`].
//!
//! These are what a chat service stores next to a bot message and returns to
//! its client. They copy engine output without reinterpreting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::AnalysisResult;
use crate::scoring::SecondaryEmotion;

/// Kind of a stored bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    /// The reply carries a coping suggestion.
    Suggestion,
}

impl MessageType {
    pub fn for_result(result: &AnalysisResult) -> Self {
        if result.coping_strategy.is_some() {
            Self::Suggestion
        } else {
            Self::Text
        }
    }
}

/// Row stored alongside the user's message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysisRecord {
    pub detected_emotion: String,
    pub confidence_score: f64,
    /// `all_emotions` as a JSON array of `{label, score}`.
    pub secondary_emotions: String,
    pub analysis_timestamp: DateTime<Utc>,
}

impl EmotionAnalysisRecord {
    /// Build a record stamped with the given time.
    ///
    /// # Errors
    ///
    /// Returns an error if the secondary emotions cannot be encoded.
    pub fn from_result_at(
        result: &AnalysisResult,
        at: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            detected_emotion: result.emotion.clone(),
            confidence_score: result.confidence,
            secondary_emotions: serde_json::to_string(&result.all_emotions)?,
            analysis_timestamp: at,
        })
    }

    /// Build a record stamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the secondary emotions cannot be encoded.
    pub fn from_result(result: &AnalysisResult) -> serde_json::Result<Self> {
        Self::from_result_at(result, Utc::now())
    }

    /// Decode the stored secondary emotions.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored text is not a valid JSON array.
    pub fn secondary(&self) -> serde_json::Result<Vec<SecondaryEmotion>> {
        serde_json::from_str(&self.secondary_emotions)
    }
}

/// Body returned to the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub emotion: String,
    /// Rounded to four decimal places.
    pub confidence: f64,
    pub coping_strategy: Option<String>,
    pub needs_escalation: bool,
    pub message_type: MessageType,
}

impl From<&AnalysisResult> for ChatReply {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            reply: result.response.clone(),
            emotion: result.emotion.clone(),
            confidence: round4(result.confidence),
            coping_strategy: result.coping_strategy.clone(),
            needs_escalation: result.needs_escalation,
            message_type: MessageType::for_result(result),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
