//! Emotion and crisis lexicons, and the catalog that bundles them with the
//! response tables.
//!
//! Lexicons are plain data: an ordered list of emotions, each with weighted
//! phrase tiers. Order matters because the scorer breaks ties in favour of
//! the earliest emotion, so the lexicon is a `Vec`, never a map.
//!
//! A [`Catalog`] is loaded once at start-up (built-in or from TOML) and then
//! shared immutably across every analysis.

use crate::error::{MeloError, Result};
use crate::responses::{CopingEntry, CopingTable, FallbackTexts, ResponseEntry, ResponseTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Label reserved for messages with no lexicon match.
pub const NEUTRAL_LABEL: &str = "Neutral";

/// Label reserved for the crisis override.
pub const CRISIS_LABEL: &str = "Crisis";

/// Weight class of a lexicon phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseTier {
    Strong,
    Medium,
    Weak,
    /// Multi-word situational phrases.
    Context,
}

/// One emotion and its weighted phrase sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionEntry {
    pub name: String,
    #[serde(default)]
    pub strong: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub weak: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl EmotionEntry {
    /// The phrase sets of this emotion, paired with their tier.
    pub fn tiers(&self) -> [(PhraseTier, &[String]); 4] {
        [
            (PhraseTier::Strong, self.strong.as_slice()),
            (PhraseTier::Medium, self.medium.as_slice()),
            (PhraseTier::Weak, self.weak.as_slice()),
            (PhraseTier::Context, self.context.as_slice()),
        ]
    }

    fn normalize(&mut self) -> Result<()> {
        self.name = self.name.trim().to_owned();
        for list in [
            &mut self.strong,
            &mut self.medium,
            &mut self.weak,
            &mut self.context,
        ] {
            normalize_phrases(list, &self.name)?;
        }
        Ok(())
    }
}

/// Ordered emotion lexicon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmotionLexicon {
    emotions: Vec<EmotionEntry>,
}

impl EmotionLexicon {
    /// Build a lexicon, lower-casing and trimming every phrase.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] if a name is empty, duplicated or
    /// reserved, or if any phrase is empty.
    pub fn new(mut emotions: Vec<EmotionEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &mut emotions {
            entry.normalize()?;
            if entry.name.is_empty() {
                return Err(MeloError::Catalog("emotion with empty name".to_owned()));
            }
            if entry.name.eq_ignore_ascii_case(NEUTRAL_LABEL)
                || entry.name.eq_ignore_ascii_case(CRISIS_LABEL)
            {
                return Err(MeloError::Catalog(format!(
                    "emotion name '{}' is reserved",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(MeloError::Catalog(format!(
                    "duplicate emotion '{}'",
                    entry.name
                )));
            }
        }
        Ok(Self { emotions })
    }

    /// The built-in nine-emotion lexicon.
    pub fn builtin() -> Self {
        let emotions = BUILTIN_EMOTIONS
            .iter()
            .map(|&(name, strong, medium, weak, context)| EmotionEntry {
                name: name.to_owned(),
                strong: to_owned_all(strong),
                medium: to_owned_all(medium),
                weak: to_owned_all(weak),
                context: to_owned_all(context),
            })
            .collect();
        Self { emotions }
    }

    /// Emotions in lexicon order.
    pub fn iter(&self) -> impl Iterator<Item = &EmotionEntry> {
        self.emotions.iter()
    }

    /// Look up an emotion by exact name.
    pub fn get(&self, name: &str) -> Option<&EmotionEntry> {
        self.emotions.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.emotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emotions.is_empty()
    }
}

/// Phrases whose presence overrides all other processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrisisLexicon {
    phrases: Vec<String>,
    /// Fixed resource-listing reply returned on a crisis match.
    reply: String,
}

impl CrisisLexicon {
    /// Build a crisis lexicon.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] if there are no phrases, any phrase is
    /// empty, or the reply is blank.
    pub fn new(mut phrases: Vec<String>, reply: impl Into<String>) -> Result<Self> {
        normalize_phrases(&mut phrases, CRISIS_LABEL)?;
        if phrases.is_empty() {
            return Err(MeloError::Catalog(
                "crisis lexicon must contain at least one phrase".to_owned(),
            ));
        }
        let reply = reply.into();
        if reply.trim().is_empty() {
            return Err(MeloError::Catalog("crisis reply is empty".to_owned()));
        }
        Ok(Self { phrases, reply })
    }

    /// The built-in crisis phrases and hotline reply.
    pub fn builtin() -> Self {
        Self {
            phrases: to_owned_all(BUILTIN_CRISIS_PHRASES),
            reply: BUILTIN_CRISIS_REPLY.to_owned(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }
}

/// Everything the engine reads: lexicons plus reply and coping tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub lexicon: EmotionLexicon,
    pub crisis: CrisisLexicon,
    pub responses: ResponseTable,
    pub coping: CopingTable,
}

/// On-disk catalog schema.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    emotions: Vec<EmotionEntry>,
    crisis: CrisisSection,
    #[serde(default)]
    responses: Vec<ResponseEntry>,
    #[serde(default)]
    coping: Vec<CopingEntry>,
    #[serde(default)]
    fallback: FallbackTexts,
}

#[derive(Debug, Serialize, Deserialize)]
struct CrisisSection {
    phrases: Vec<String>,
    #[serde(default = "default_crisis_reply")]
    reply: String,
}

fn default_crisis_reply() -> String {
    BUILTIN_CRISIS_REPLY.to_owned()
}

impl Catalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self {
            lexicon: EmotionLexicon::builtin(),
            crisis: CrisisLexicon::builtin(),
            responses: ResponseTable::builtin(),
            coping: CopingTable::builtin(),
        }
    }

    /// Parse and validate a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] on parse or validation failure.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| MeloError::Catalog(format!("invalid catalog: {e}")))?;
        let lexicon = EmotionLexicon::new(file.emotions)?;
        let responses = ResponseTable::new(file.responses, file.fallback)?;
        let coping = CopingTable::new(file.coping)?;

        let referenced = responses
            .entries()
            .iter()
            .map(|e| ("responses", e.emotion.as_str()))
            .chain(coping.entries().iter().map(|e| ("coping", e.emotion.as_str())));
        for (table, emotion) in referenced {
            if lexicon.get(emotion).is_none() {
                return Err(MeloError::Catalog(format!(
                    "{table} entry for unknown emotion '{emotion}'"
                )));
            }
        }

        Ok(Self {
            lexicon,
            crisis: CrisisLexicon::new(file.crisis.phrases, file.crisis.reply)?,
            responses,
            coping,
        })
    }

    /// Load a catalog from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid catalog.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MeloError::Catalog(format!("failed to read catalog ({}): {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Serialize to the on-disk TOML schema.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            emotions: self.lexicon.emotions.clone(),
            crisis: CrisisSection {
                phrases: self.crisis.phrases.clone(),
                reply: self.crisis.reply.clone(),
            },
            responses: self.responses.entries().to_vec(),
            coping: self.coping.entries().to_vec(),
            fallback: self.responses.fallback().clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| MeloError::Catalog(e.to_string()))
    }
}

fn normalize_phrases(list: &mut Vec<String>, owner: &str) -> Result<()> {
    for phrase in list.iter_mut() {
        let normalized = phrase.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MeloError::Catalog(format!("empty phrase in '{owner}'")));
        }
        *phrase = normalized;
    }
    Ok(())
}

fn to_owned_all(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// ── Built-in data ───────────────────────────────────────────────────────

/// (name, strong, medium, weak, context)
type EmotionRow = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

const BUILTIN_EMOTIONS: &[EmotionRow] = &[
    (
        "Happiness",
        &[
            "love it",
            "amazing",
            "incredible",
            "fantastic",
            "wonderful",
            "excellent",
            "perfect",
            "best day",
        ],
        &[
            "happy", "good", "great", "awesome", "nice", "excited", "cheerful",
        ],
        &["okay", "fine", "alright", "decent", "pleasant"],
        &["got the job", "passed my exam"],
    ),
    (
        "Sadness",
        &[
            "devastated",
            "heartbroken",
            "destroyed",
            "shattered",
            "cant take it",
            "overwhelmed by sadness",
        ],
        &[
            "sad",
            "depressed",
            "unhappy",
            "miserable",
            "down",
            "hurt",
            "crying",
        ],
        &["disappointed", "let down", "discouraged", "blue"],
        &["lost someone", "miss them so much"],
    ),
    (
        "Anger",
        &[
            "furious",
            "enraged",
            "livid",
            "seething",
            "absolutely furious",
            "cant control it",
        ],
        &[
            "angry",
            "mad",
            "frustrated",
            "irritated",
            "annoyed",
            "fed up",
        ],
        &["bothered", "bugged", "mildly upset", "somewhat annoyed"],
        &["not fair", "sick of being"],
    ),
    (
        "Anxiety",
        &[
            "terrified",
            "panicked",
            "horrified",
            "petrified",
            "cant breathe",
            "panic attack",
        ],
        &["anxious", "worried", "nervous", "scared", "afraid", "uneasy"],
        &["nervous", "apprehensive", "concerned", "slightly worried"],
        &["cant sleep", "what if something"],
    ),
    (
        "Love",
        &[
            "love deeply",
            "adore",
            "cherish",
            "devoted",
            "unconditional love",
        ],
        &["love", "care", "appreciate", "grateful", "affection"],
        &["like", "fond", "attached"],
        &[],
    ),
    (
        "Loneliness",
        &[
            "utterly alone",
            "isolated",
            "abandoned",
            "rejected",
            "no one understands me",
        ],
        &["lonely", "disconnected", "forgotten", "missing people"],
        &["solitary", "by myself", "wishing i had company"],
        &["nobody to talk to", "no one to talk to"],
    ),
    (
        "Confusion",
        &[
            "completely lost",
            "dont understand anything",
            "confused",
            "bewildered",
        ],
        &["confused", "unsure", "unclear", "mixed up"],
        &["a bit confused", "not quite sure"],
        &[],
    ),
    (
        "Hope",
        &[
            "finally see light",
            "things will change",
            "breakthrough",
            "optimistic",
        ],
        &["hopeful", "positive", "better soon", "improving"],
        &["slight hope", "maybe better"],
        &[],
    ),
    (
        "Overwhelm",
        &[
            "completely overwhelmed",
            "drowning",
            "cant handle this",
            "too much",
        ],
        &["overwhelmed", "stressed", "swamped", "overburdened"],
        &["a bit much", "somewhat busy"],
        &["so much to do", "no time for myself"],
    ),
];

const BUILTIN_CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end it all",
    "do not want to live",
    "harm myself",
    "hurt myself",
    "self harm",
    "want to die",
    "not worth living",
    "goodbye forever",
    "final goodbye",
];

const BUILTIN_CRISIS_REPLY: &str = "I'm very concerned about your safety. Please reach out to \
crisis support NOW:\n\n\u{1F198} 988 - Suicide & Crisis Lifeline (US)\n\u{1F198} Text HOME to \
741741 - Crisis Text Line\n\u{1F198} findahelpline.com - International\n\nYou matter. Call now.";
