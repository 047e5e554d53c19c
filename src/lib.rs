//! Melo: emotion analysis and empathetic reply selection for chat backends.
//!
//! Every user message passes through a fixed pipeline:
//! crisis check → weighted lexicon scoring → tiered reply and coping selection.
//!
//! # Architecture
//!
//! - **Catalog**: emotion lexicon, crisis phrases, reply and coping tables,
//!   built in or loaded from TOML and shared read-only
//! - **Crisis**: literal phrase scan that overrides everything else
//! - **Scoring**: per-emotion weighted phrase counts, confidence and tiers
//! - **Responses**: reply and coping lookup, with an injectable variant picker
//! - **Engine**: [`EmotionResponseEngine`], a pure function of message,
//!   optional [`UserContext`] and static configuration
//! - **Source**: optional hosted-model replies behind [`FallbackAnalyzer`],
//!   which always degrades to the lexicon reply
//!
//! # Example
//!
//! ```
//! use melo::EmotionResponseEngine;
//!
//! let engine = EmotionResponseEngine::builtin();
//! let result = engine.analyze("I'm furious and livid", None);
//! assert_eq!(result.emotion, "Anger");
//! assert!(result.coping_strategy.is_some());
//! ```

pub mod config;
pub mod context;
pub mod crisis;
pub mod engine;
pub mod error;
pub mod host;
pub mod lexicon;
pub mod record;
pub mod responses;
pub mod scoring;
pub mod source;
pub mod variant;

pub use config::EngineConfig;
pub use context::{HistoryProvider, InMemoryHistory, UserContext};
pub use engine::{
    AnalysisResult, EmotionAnalyzer, EmotionResponseEngine, ReplySource, analyze_for_user,
};
pub use error::{MeloError, Result};
pub use lexicon::Catalog;
pub use record::{ChatReply, EmotionAnalysisRecord, MessageType};
pub use scoring::IntensityTier;
pub use source::{FallbackAnalyzer, OpenAiSource, ResponseSource, SourceError};
