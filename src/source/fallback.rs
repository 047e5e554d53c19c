//! Decorator that lets an alternate source write the reply.
//!
//! The inner analyzer always runs first and decides the emotion, intensity,
//! coping suggestion and escalation. Crisis and empty-input results are final
//! and never reach the source. Otherwise the source gets one attempt under a
//! hard timeout; if it fails the lexicon reply stands.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ResponseSource, SourceError};
use crate::context::UserContext;
use crate::engine::{AnalysisResult, EmotionAnalyzer, ReplySource};

/// An analyzer whose replies come from a [`ResponseSource`] when it answers
/// in time, and from the inner analyzer otherwise.
pub struct FallbackAnalyzer<A, S> {
    inner: A,
    source: S,
    timeout: Duration,
    /// Count of fallback activations (for observability).
    fallback_count: AtomicU32,
}

impl<A, S> FallbackAnalyzer<A, S>
where
    A: EmotionAnalyzer,
    S: ResponseSource,
{
    /// Wrap `inner`, consulting `source` with the given time bound.
    pub fn new(inner: A, source: S, timeout: Duration) -> Self {
        Self {
            inner,
            source,
            timeout,
            fallback_count: AtomicU32::new(0),
        }
    }

    /// Number of times the source failed and the lexicon reply was kept.
    pub fn fallback_count(&self) -> u32 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn generate_bounded(&self, message: &str) -> Result<String, SourceError> {
        let reply = tokio::time::timeout(self.timeout, self.source.generate(message))
            .await
            .map_err(|_| {
                SourceError::Timeout(format!(
                    "no reply within {} ms",
                    self.timeout.as_millis()
                ))
            })??;
        if reply.trim().is_empty() {
            return Err(SourceError::Malformed("empty reply".to_owned()));
        }
        Ok(reply)
    }
}

impl<A, S> std::fmt::Debug for FallbackAnalyzer<A, S>
where
    A: EmotionAnalyzer,
    S: ResponseSource,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackAnalyzer")
            .field("inner", &self.inner.name())
            .field("source", &self.source.name())
            .field("timeout", &self.timeout)
            .field("fallback_count", &self.fallback_count())
            .finish()
    }
}

#[async_trait]
impl<A, S> EmotionAnalyzer for FallbackAnalyzer<A, S>
where
    A: EmotionAnalyzer,
    S: ResponseSource,
{
    fn name(&self) -> &str {
        "fallback"
    }

    async fn analyze(&self, message: &str, context: Option<&UserContext>) -> AnalysisResult {
        let mut result = self.inner.analyze(message, context).await;
        if result.needs_escalation || message.trim().is_empty() {
            return result;
        }

        match self.generate_bounded(message).await {
            Ok(reply) => {
                result.response = reply;
                result.reply_source = ReplySource::External;
            }
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    source = self.source.name(),
                    code = e.code(),
                    error = %e,
                    "response source failed, keeping lexicon reply"
                );
            }
        }
        result
    }
}
