//! Caller-supplied user context and how it is derived from chat history.
//!
//! The engine only ever reads a [`UserContext`]. Fetching history is the
//! job of a [`HistoryProvider`], which lives outside the engine and may fail
//! without affecting analysis.

use crate::config::ContextConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Summary of a user's recent history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub has_history: bool,
    pub message_count: usize,
    /// Distinct recent topic words, most recent first.
    pub recent_themes: Vec<String>,
}

/// Shortest word kept as a theme.
const MIN_THEME_LEN: usize = 3;

/// Filler words that are never themes.
const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "but",
    "can", "could", "did", "does", "even", "for", "from", "get", "got", "had", "has", "have",
    "her", "him", "his", "how", "into", "just", "like", "more", "much", "not", "now", "off",
    "one", "only", "our", "out", "really", "she", "some", "than", "that", "the", "their", "them",
    "then", "there", "they", "this", "too", "very", "was", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

fn theme_word(raw: &str) -> Option<String> {
    let word = raw
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    let keep = word.chars().count() >= MIN_THEME_LEN
        && word.chars().all(char::is_alphanumeric)
        && !STOP_WORDS.contains(&word.as_str());
    keep.then_some(word)
}

/// Who sent a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Bot,
}

/// One stored chat message as seen by a history provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub sender: SenderType,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: SenderType::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: SenderType::Bot,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

impl UserContext {
    /// Derive a context from history ordered newest first.
    ///
    /// At most `history_window` messages are considered. Themes are the
    /// first distinct words of user messages in recency order, skipping
    /// short words, contractions and filler. Returns `None` for an empty
    /// history.
    pub fn from_history(messages: &[HistoryMessage], config: &ContextConfig) -> Option<Self> {
        let window = &messages[..messages.len().min(config.history_window)];
        if window.is_empty() {
            return None;
        }

        let mut recent_themes: Vec<String> = Vec::new();
        let words = window
            .iter()
            .filter(|m| m.sender == SenderType::User)
            .flat_map(|m| m.text.split_whitespace())
            .filter_map(theme_word);
        for word in words {
            if recent_themes.len() >= config.max_themes {
                break;
            }
            if !recent_themes.contains(&word) {
                recent_themes.push(word);
            }
        }

        Some(Self {
            has_history: window.len() > config.min_history_messages,
            message_count: window.len(),
            recent_themes,
        })
    }
}

/// Source of per-user history context.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Context for `user_id`, or `None` when the user has no history.
    async fn recent_context(&self, user_id: i64) -> Result<Option<UserContext>>;
}

/// Process-local history store.
///
/// Useful for embedding the engine without a database and for tests.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    config: ContextConfig,
    messages: RwLock<HashMap<i64, Vec<HistoryMessage>>>,
}

impl InMemoryHistory {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Append a message to the user's history.
    pub fn record(&self, user_id: i64, message: HistoryMessage) {
        let mut guard = match self.messages.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.entry(user_id).or_default().push(message);
    }
}

#[async_trait]
impl HistoryProvider for InMemoryHistory {
    async fn recent_context(&self, user_id: i64) -> Result<Option<UserContext>> {
        let guard = match self.messages.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(stored) = guard.get(&user_id) else {
            return Ok(None);
        };
        let newest_first: Vec<HistoryMessage> = stored.iter().rev().cloned().collect();
        Ok(UserContext::from_history(&newest_first, &self.config))
    }
}
