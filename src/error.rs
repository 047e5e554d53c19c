//! Error types for the melo engine.

/// Top-level error type.
///
/// Analysis itself never fails; these errors come from loading configuration
/// and catalogs, or from collaborators such as the history provider.
#[derive(Debug, thiserror::Error)]
pub enum MeloError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Lexicon / response catalog error.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// History lookup error.
    #[error("history error: {0}")]
    History(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MeloError>;
