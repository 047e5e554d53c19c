//! Reply and coping-strategy tables, and the selector that reads them.
//!
//! Both tables are pure lookups keyed by emotion label. Where a slot holds
//! more than one template the injected [`VariantPicker`] chooses, so output
//! is exact under test and varied in production.

use crate::config::ResponseConfig;
use crate::context::UserContext;
use crate::error::{MeloError, Result};
use crate::scoring::IntensityTier;
use crate::variant::VariantPicker;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Placeholder replaced with one of the caller's recent themes.
pub const THEME_PLACEHOLDER: &str = "{theme}";

/// Substituted for [`THEME_PLACEHOLDER`] when the context carries no themes.
const THEME_FALLBACK: &str = "these moments";

/// Reply templates for one emotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub emotion: String,
    #[serde(default)]
    pub weak: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub strong: Vec<String>,
    /// Used instead of the tier slot for users with a long history.
    #[serde(default)]
    pub recurring: Vec<String>,
}

impl ResponseEntry {
    fn slot(&self, tier: IntensityTier) -> &[String] {
        match tier {
            IntensityTier::Weak => &self.weak,
            IntensityTier::Medium => &self.medium,
            IntensityTier::Strong => &self.strong,
        }
    }
}

/// Coping suggestions for one emotion. Weak detections never get one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopingEntry {
    pub emotion: String,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub strong: Vec<String>,
}

/// Replies that do not depend on a detected emotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTexts {
    /// Reply when nothing in the lexicon matched (or the input was empty).
    pub neutral: String,
    /// Reply for a detected emotion that has no template.
    pub default: String,
}

impl Default for FallbackTexts {
    fn default() -> Self {
        Self {
            neutral: "I'm here to listen. Tell me what's really going on. How are you truly \
                      feeling?"
                .to_owned(),
            default: "I'm here for you.".to_owned(),
        }
    }
}

/// Emotion → tier → reply templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTable {
    entries: Vec<ResponseEntry>,
    fallback: FallbackTexts,
}

impl ResponseTable {
    /// Build a response table.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] on duplicate emotions or blank templates.
    pub fn new(mut entries: Vec<ResponseEntry>, fallback: FallbackTexts) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &mut entries {
            entry.emotion = normalize_name(&entry.emotion, "response")?;
            if !seen.insert(entry.emotion.clone()) {
                return Err(MeloError::Catalog(format!(
                    "duplicate response entry for '{}'",
                    entry.emotion
                )));
            }
            for list in [&entry.weak, &entry.medium, &entry.strong, &entry.recurring] {
                reject_blank(list, &entry.emotion)?;
            }
        }
        if fallback.neutral.trim().is_empty() || fallback.default.trim().is_empty() {
            return Err(MeloError::Catalog("fallback replies must not be blank".to_owned()));
        }
        Ok(Self { entries, fallback })
    }

    /// The built-in reply templates.
    pub fn builtin() -> Self {
        let entries = BUILTIN_RESPONSES
            .iter()
            .map(|&(emotion, weak, medium, strong, recurring)| ResponseEntry {
                emotion: emotion.to_owned(),
                weak: owned(weak),
                medium: owned(medium),
                strong: owned(strong),
                recurring: owned(recurring),
            })
            .collect();
        Self {
            entries,
            fallback: FallbackTexts::default(),
        }
    }

    pub fn get(&self, emotion: &str) -> Option<&ResponseEntry> {
        self.entries.iter().find(|e| e.emotion == emotion)
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    pub fn fallback(&self) -> &FallbackTexts {
        &self.fallback
    }

    pub fn neutral(&self) -> &str {
        &self.fallback.neutral
    }
}

/// Emotion → tier → coping suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopingTable {
    entries: Vec<CopingEntry>,
}

impl CopingTable {
    /// Build a coping table.
    ///
    /// # Errors
    ///
    /// Returns [`MeloError::Catalog`] on duplicate emotions or blank suggestions.
    pub fn new(mut entries: Vec<CopingEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &mut entries {
            entry.emotion = normalize_name(&entry.emotion, "coping")?;
            if !seen.insert(entry.emotion.clone()) {
                return Err(MeloError::Catalog(format!(
                    "duplicate coping entry for '{}'",
                    entry.emotion
                )));
            }
            reject_blank(&entry.medium, &entry.emotion)?;
            reject_blank(&entry.strong, &entry.emotion)?;
        }
        Ok(Self { entries })
    }

    /// The built-in coping suggestions.
    pub fn builtin() -> Self {
        let entries = BUILTIN_COPING
            .iter()
            .map(|&(emotion, medium, strong)| CopingEntry {
                emotion: emotion.to_owned(),
                medium: owned(medium),
                strong: owned(strong),
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, emotion: &str) -> Option<&CopingEntry> {
        self.entries.iter().find(|e| e.emotion == emotion)
    }

    pub fn entries(&self) -> &[CopingEntry] {
        &self.entries
    }
}

/// Reply text and optional coping suggestion for one detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub response: String,
    pub coping_strategy: Option<String>,
}

/// Read-only view over the tables used to pick a reply.
pub struct Selector<'a> {
    pub responses: &'a ResponseTable,
    pub coping: &'a CopingTable,
    pub config: &'a ResponseConfig,
    pub picker: &'a dyn VariantPicker,
}

impl Selector<'_> {
    /// Choose a reply and coping suggestion.
    ///
    /// `salt` is mixed into variant keys so seeded pickers vary per message.
    pub fn select(
        &self,
        emotion: &str,
        tier: IntensityTier,
        raw_score: u32,
        context: Option<&UserContext>,
        salt: &str,
    ) -> Selection {
        Selection {
            response: self.response(emotion, tier, context, salt),
            coping_strategy: self.coping_strategy(emotion, tier, raw_score, salt),
        }
    }

    fn response(
        &self,
        emotion: &str,
        tier: IntensityTier,
        context: Option<&UserContext>,
        salt: &str,
    ) -> String {
        let Some(entry) = self.responses.get(emotion) else {
            return self.responses.fallback.default.clone();
        };

        let recurring = context.is_some_and(|c| {
            c.has_history && c.message_count > self.config.recurring_message_threshold
        });

        if recurring && !entry.recurring.is_empty() {
            let key = format!("{emotion}:recurring:{salt}");
            let template = self.pick(&entry.recurring, &key);
            return fill_theme(template, context, self.picker, &key);
        }

        let slot = entry.slot(tier);
        if slot.is_empty() {
            return self.responses.fallback.default.clone();
        }
        let key = format!("{emotion}:{}:{salt}", tier.as_str());
        self.pick(slot, &key).to_owned()
    }

    fn coping_strategy(
        &self,
        emotion: &str,
        tier: IntensityTier,
        raw_score: u32,
        salt: &str,
    ) -> Option<String> {
        if tier == IntensityTier::Weak || raw_score < self.config.coping_min_score {
            return None;
        }
        let entry = self.coping.get(emotion)?;
        let slot = match tier {
            IntensityTier::Strong => &entry.strong,
            _ => &entry.medium,
        };
        if slot.is_empty() {
            return None;
        }
        let key = format!("{emotion}:coping:{}:{salt}", tier.as_str());
        Some(self.pick(slot, &key).to_owned())
    }

    fn pick<'s>(&self, variants: &'s [String], key: &str) -> &'s str {
        let index = self.picker.pick(key, variants.len()).min(variants.len() - 1);
        &variants[index]
    }
}

fn fill_theme(
    template: &str,
    context: Option<&UserContext>,
    picker: &dyn VariantPicker,
    key: &str,
) -> String {
    if !template.contains(THEME_PLACEHOLDER) {
        return template.to_owned();
    }
    let themes = context
        .map(|c| c.recent_themes.as_slice())
        .unwrap_or_default();
    let theme = if themes.is_empty() {
        THEME_FALLBACK
    } else {
        let index = picker
            .pick(&format!("{key}:theme"), themes.len())
            .min(themes.len() - 1);
        themes[index].as_str()
    };
    template.replace(THEME_PLACEHOLDER, theme)
}

fn normalize_name(name: &str, table: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MeloError::Catalog(format!("{table} entry with empty emotion")));
    }
    Ok(name.to_owned())
}

fn reject_blank(list: &[String], owner: &str) -> Result<()> {
    if list.iter().any(|t| t.trim().is_empty()) {
        return Err(MeloError::Catalog(format!("blank template in '{owner}'")));
    }
    Ok(())
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// ── Built-in tables ─────────────────────────────────────────────────────

/// (emotion, weak, medium, strong, recurring)
type ResponseRow = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

const BUILTIN_RESPONSES: &[ResponseRow] = &[
    (
        "Happiness",
        &["That's nice. I'm glad you're having a good moment."],
        &[
            "That's wonderful! Your joy is contagious.",
            "I love hearing this. What made it so good?",
        ],
        &["That's absolutely amazing! I can feel your happiness!"],
        &["I've noticed you often find joy in {theme}. That's beautiful!"],
    ),
    (
        "Sadness",
        &["I sense some sadness. That's okay. Want to talk?"],
        &[
            "I can feel your sadness deeply. I'm here, and you're not alone.",
            "That sounds really hard. I'm right here with you.",
        ],
        &["You're carrying a heavy weight right now. Let's work through this together."],
        &["I know sadness visits you often. You're stronger than you think."],
    ),
    (
        "Anger",
        &["Something's bothering you. I'm listening."],
        &["Your anger is valid. Let's talk about what triggered it."],
        &["You're burning with anger, and that's okay. Let's channel this energy."],
        &[
            "I've noticed frustration comes up often for you. There's a pattern here we should \
             explore.",
        ],
    ),
    (
        "Anxiety",
        &["Something's on your mind. What's worrying you?"],
        &["I can feel your anxiety. You're safe here. Breathe with me."],
        &["You're in panic mode. That's scary. Let's ground you right now."],
        &["Anxiety seems to be a constant companion for you. Let's build resilience together."],
    ),
    (
        "Loneliness",
        &["It sounds like you're missing connection."],
        &["That loneliness must feel heavy. But you're not truly alone - I'm here."],
        &["You feel profoundly isolated. That pain is real, and I see you."],
        &["Loneliness keeps visiting you. Let's find ways to build meaningful connection."],
    ),
    (
        "Hope",
        &["I see a glimmer of hope in your words."],
        &["That's wonderful! Hold onto that hope."],
        &["Your hope is inspiring! Things are shifting for you!"],
        &["You're building momentum. This hope is well-earned."],
    ),
    (
        "Overwhelm",
        &["Things feel like a lot right now."],
        &["You're overwhelmed. Let's break this down into manageable pieces."],
        &["You feel like you're drowning. Let me help you surface."],
        &["Overwhelm seems to return frequently. Let's identify what's sustainable for you."],
    ),
];

/// (emotion, medium, strong)
type CopingRow = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
);

const BUILTIN_COPING: &[CopingRow] = &[
    (
        "Sadness",
        &[
            "5-4-3-2-1 Grounding: Name 5 things you see, 4 you touch, 3 you hear, 2 you smell, 1 \
             you taste.",
        ],
        &[
            "Deep breathing: In for 4, hold for 4, out for 6. This activates your parasympathetic \
             nervous system.",
        ],
    ),
    (
        "Anger",
        &["Physical release: 10 jumping jacks or a brisk walk to channel the adrenaline."],
        &["Write an angry letter you won't send. Get it ALL out, then burn it symbolically."],
    ),
    (
        "Anxiety",
        &[
            "Grounding game: Focus on 5 things you see, 4 you hear, 3 you feel, 2 you smell, 1 \
             you taste.",
            "Box breathing: 4 counts in, 4 hold, 4 out, 4 hold. Repeat 5 times.",
        ],
        &[
            "Go outside. Feel sun/wind/grass. Nature is grounding.",
            "Progressive muscle relaxation: Tense each muscle for 5 sec, release. Toes to head.",
        ],
    ),
    (
        "Loneliness",
        &["Reach out. Text one person. Even a meme counts as connection."],
        &["Join a community online or offline. You deserve to belong."],
    ),
    (
        "Overwhelm",
        &["Brain dump: Write down EVERYTHING bothering you. Then pick ONE to tackle."],
        &["Ask for help. Delegate. You don't have to carry everything alone."],
    ),
];

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::variant::FirstVariant;

    struct LastVariant;

    impl VariantPicker for LastVariant {
        fn pick(&self, _key: &str, len: usize) -> usize {
            len.saturating_sub(1)
        }
    }

    fn history(count: usize, themes: &[&str]) -> UserContext {
        UserContext {
            has_history: true,
            message_count: count,
            recent_themes: themes.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn select_with(
        picker: &dyn VariantPicker,
        emotion: &str,
        tier: IntensityTier,
        score: u32,
        context: Option<&UserContext>,
    ) -> Selection {
        let responses = ResponseTable::builtin();
        let coping = CopingTable::builtin();
        let config = ResponseConfig::default();
        Selector {
            responses: &responses,
            coping: &coping,
            config: &config,
            picker,
        }
        .select(emotion, tier, score, context, "salt")
    }

    #[test]
    fn tier_template_selected_without_context() {
        let s = select_with(&FirstVariant, "Anger", IntensityTier::Strong, 6, None);
        assert_eq!(
            s.response,
            "You're burning with anger, and that's okay. Let's channel this energy."
        );
        assert!(s.coping_strategy.unwrap().starts_with("Write an angry letter"));
    }

    #[test]
    fn weak_tier_gets_no_coping() {
        let s = select_with(&FirstVariant, "Sadness", IntensityTier::Weak, 1, None);
        assert_eq!(s.response, "I sense some sadness. That's okay. Want to talk?");
        assert!(s.coping_strategy.is_none());
    }

    #[test]
    fn low_score_gets_no_coping_even_if_tier_is_higher() {
        let responses = ResponseTable::builtin();
        let coping = CopingTable::builtin();
        let config = ResponseConfig {
            coping_min_score: 4,
            ..Default::default()
        };
        let s = Selector {
            responses: &responses,
            coping: &coping,
            config: &config,
            picker: &FirstVariant,
        }
        .select("Anxiety", IntensityTier::Medium, 3, None, "");
        assert!(s.coping_strategy.is_none());
    }

    #[test]
    fn recurring_template_needs_history_above_threshold() {
        let at_threshold = history(10, &[]);
        let s = select_with(
            &FirstVariant,
            "Sadness",
            IntensityTier::Medium,
            2,
            Some(&at_threshold),
        );
        assert!(s.response.starts_with("I can feel your sadness"));

        let above = history(11, &[]);
        let s = select_with(&FirstVariant, "Sadness", IntensityTier::Medium, 2, Some(&above));
        assert_eq!(
            s.response,
            "I know sadness visits you often. You're stronger than you think."
        );
    }

    #[test]
    fn recurring_ignored_when_has_history_false() {
        let ctx = UserContext {
            has_history: false,
            message_count: 40,
            recent_themes: Vec::new(),
        };
        let s = select_with(&FirstVariant, "Anger", IntensityTier::Weak, 1, Some(&ctx));
        assert_eq!(s.response, "Something's bothering you. I'm listening.");
    }

    #[test]
    fn theme_placeholder_is_filled_from_context() {
        let ctx = history(20, &["music", "painting"]);
        let s = select_with(&FirstVariant, "Happiness", IntensityTier::Medium, 2, Some(&ctx));
        // Most recent theme first.
        assert_eq!(
            s.response,
            "I've noticed you often find joy in music. That's beautiful!"
        );

        let s = select_with(&LastVariant, "Happiness", IntensityTier::Medium, 2, Some(&ctx));
        assert!(s.response.contains("painting"));
    }

    #[test]
    fn theme_placeholder_without_themes_uses_fallback_phrase() {
        let ctx = history(20, &[]);
        let s = select_with(&FirstVariant, "Happiness", IntensityTier::Strong, 5, Some(&ctx));
        assert!(s.response.contains(THEME_FALLBACK));
        assert!(!s.response.contains(THEME_PLACEHOLDER));
    }

    #[test]
    fn emotion_without_templates_uses_default() {
        let s = select_with(&FirstVariant, "Love", IntensityTier::Medium, 2, None);
        assert_eq!(s.response, "I'm here for you.");
        assert!(s.coping_strategy.is_none());
    }

    #[test]
    fn picker_chooses_among_variants() {
        let first = select_with(&FirstVariant, "Anxiety", IntensityTier::Strong, 6, None);
        let last = select_with(&LastVariant, "Anxiety", IntensityTier::Strong, 6, None);
        assert_ne!(first.coping_strategy, last.coping_strategy);
        assert!(last.coping_strategy.unwrap().starts_with("Progressive muscle"));
    }

    #[test]
    fn duplicate_entries_rejected() {
        let entry = ResponseEntry {
            emotion: "Anger".to_owned(),
            weak: vec!["hm".to_owned()],
            ..Default::default()
        };
        let result = ResponseTable::new(vec![entry.clone(), entry], FallbackTexts::default());
        assert!(result.is_err());

        let coping = CopingEntry {
            emotion: "Anger".to_owned(),
            ..Default::default()
        };
        assert!(CopingTable::new(vec![coping.clone(), coping]).is_err());
    }

    #[test]
    fn blank_templates_rejected() {
        let entry = ResponseEntry {
            emotion: "Anger".to_owned(),
            medium: vec![" ".to_owned()],
            ..Default::default()
        };
        assert!(ResponseTable::new(vec![entry], FallbackTexts::default()).is_err());
    }

    #[test]
    fn entry_names_are_trimmed() {
        let entry = ResponseEntry {
            emotion: " Anger ".to_owned(),
            weak: vec!["Easy now.".to_owned()],
            ..Default::default()
        };
        let table = ResponseTable::new(vec![entry], FallbackTexts::default()).unwrap();
        assert_eq!(table.get("Anger").unwrap().weak, ["Easy now."]);

        let coping = CopingEntry {
            emotion: "Anger\t".to_owned(),
            ..Default::default()
        };
        let table = CopingTable::new(vec![coping]).unwrap();
        assert!(table.get("Anger").is_some());

        let blank = CopingEntry {
            emotion: "  ".to_owned(),
            ..Default::default()
        };
        assert!(CopingTable::new(vec![blank]).is_err());
    }

    #[test]
    fn names_equal_after_trim_are_duplicates() {
        let entry = |name: &str| ResponseEntry {
            emotion: name.to_owned(),
            ..Default::default()
        };
        let result = ResponseTable::new(
            vec![entry("Anger"), entry(" Anger")],
            FallbackTexts::default(),
        );
        assert!(result.is_err());
    }
}
