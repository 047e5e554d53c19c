//! Pluggable alternate response sources.
//!
//! A [`ResponseSource`] produces free-form reply text for a message, usually
//! by calling a hosted language model. Sources are best-effort: the lexicon
//! engine stays authoritative for classification, crisis handling and
//! coping suggestions, and [`FallbackAnalyzer`] keeps the lexicon reply
//! whenever a source fails or runs late.

pub mod fallback;
pub mod openai;

pub use fallback::FallbackAnalyzer;
pub use openai::OpenAiSource;

use async_trait::async_trait;

/// Stable error codes for source failures.
///
/// Codes are part of the public API and will not change.
pub mod error_codes {
    /// The source did not answer within its time bound.
    pub const SOURCE_TIMEOUT: &str = "SOURCE_TIMEOUT";

    /// The remote service failed (network, auth, rate limit, 5xx).
    pub const SOURCE_SERVICE: &str = "SOURCE_SERVICE";

    /// The service answered but the reply was unusable.
    pub const SOURCE_MALFORMED: &str = "SOURCE_MALFORMED";

    /// The source is misconfigured.
    pub const SOURCE_CONFIG: &str = "SOURCE_CONFIG";
}

/// Errors produced by a response source.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request exceeded its time bound.
    #[error("[{}] {}", error_codes::SOURCE_TIMEOUT, .0)]
    Timeout(String),

    /// Network failure or an error status from the remote service.
    #[error("[{}] {}", error_codes::SOURCE_SERVICE, .0)]
    Service(String),

    /// The response body could not be parsed or held no usable reply.
    #[error("[{}] {}", error_codes::SOURCE_MALFORMED, .0)]
    Malformed(String),

    /// Invalid source settings, such as a blank model name.
    #[error("[{}] {}", error_codes::SOURCE_CONFIG, .0)]
    Config(String),
}

impl SourceError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => error_codes::SOURCE_TIMEOUT,
            Self::Service(_) => error_codes::SOURCE_SERVICE,
            Self::Malformed(_) => error_codes::SOURCE_MALFORMED,
            Self::Config(_) => error_codes::SOURCE_CONFIG,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Timeout(m) | Self::Service(m) | Self::Malformed(m) | Self::Config(m) => m,
        }
    }
}

/// Something that can write a reply for a message.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    /// Stable identifier for logs.
    fn name(&self) -> &str;

    /// Generate a reply for `message`.
    async fn generate(&self, message: &str) -> Result<String, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(SourceError::Timeout("x".into()).code(), "SOURCE_TIMEOUT");
        assert_eq!(SourceError::Service("x".into()).code(), "SOURCE_SERVICE");
        assert_eq!(SourceError::Malformed("x".into()).code(), "SOURCE_MALFORMED");
        assert_eq!(SourceError::Config("x".into()).code(), "SOURCE_CONFIG");
    }

    #[test]
    fn display_includes_code_prefix() {
        let err = SourceError::Timeout("8000 ms elapsed".into());
        let display = err.to_string();
        assert!(display.starts_with("[SOURCE_TIMEOUT]"));
        assert!(display.ends_with("8000 ms elapsed"));
        assert_eq!(err.message(), "8000 ms elapsed");
    }
}
