//! Config and catalog persistence round-trips.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use melo::config::{EngineConfig, PickerMode};
use melo::lexicon::Catalog;
use melo::{EmotionResponseEngine, MeloError};

const CUSTOM_CATALOG: &str = r#"
[[emotions]]
name = "Calm"
strong = ["serene"]
medium = ["Relaxed"]
weak = ["fine"]

[[emotions]]
name = "Stress"
strong = ["burnt out"]
medium = ["stressed"]
context = ["deadline tomorrow"]

[crisis]
phrases = ["give up on everything"]
reply = "Please call someone you trust right now."

[[responses]]
emotion = "Stress"
medium = ["That sounds like a lot."]
strong = ["You sound exhausted."]
recurring = ["{theme} keeps coming up for you."]

[[coping]]
emotion = "Stress"
medium = ["Take a five minute walk."]
strong = ["Write down the one thing that matters today."]

[fallback]
neutral = "Tell me more."
default = "I hear you."
"#;

#[test]
fn config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = EngineConfig::default();
    config.scoring.signal_bonus = 0.05;
    config.picker.mode = PickerMode::Seeded;
    config.picker.seed = 9;
    config.catalog_path = Some(dir.path().join("catalog.toml"));
    config.save_to_file(&path).unwrap();

    let loaded = EngineConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[scoring]\nnormalization_divisor = 0.0\n").unwrap();
    assert!(matches!(
        EngineConfig::from_file(&path),
        Err(MeloError::Config(_))
    ));
}

#[test]
fn builtin_catalog_round_trips_through_toml() {
    let builtin = Catalog::builtin();
    let text = builtin.to_toml_string().unwrap();
    let reparsed = Catalog::from_toml_str(&text).unwrap();
    assert_eq!(reparsed, builtin);
}

#[test]
fn custom_catalog_replaces_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.toml");
    std::fs::write(&catalog_path, CUSTOM_CATALOG).unwrap();

    let config = EngineConfig {
        catalog_path: Some(catalog_path),
        ..Default::default()
    };
    let engine = EmotionResponseEngine::from_config(&config).unwrap();

    let result = engine.analyze("I'm stressed, deadline tomorrow", None);
    assert_eq!(result.emotion, "Stress");
    assert_eq!(result.intensity, 4);
    assert_eq!(result.response, "That sounds like a lot.");
    assert_eq!(
        result.coping_strategy.as_deref(),
        Some("Take a five minute walk.")
    );

    // Phrases are lower-cased at load.
    let calm = engine.analyze("feeling RELAXED", None);
    assert_eq!(calm.emotion, "Calm");
    assert_eq!(calm.response, "I hear you.");

    let crisis = engine.analyze("I want to give up on everything", None);
    assert!(crisis.needs_escalation);
    assert_eq!(crisis.response, "Please call someone you trust right now.");

    // Built-in phrases are gone.
    let neutral = engine.analyze("I am furious", None);
    assert_eq!(neutral.emotion, "Neutral");
    assert_eq!(neutral.response, "Tell me more.");
}

#[test]
fn catalog_file_errors_surface_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.toml");
    std::fs::write(
        &catalog_path,
        "[[emotions]]\nname = \"Neutral\"\nstrong = [\"meh\"]\n\n[crisis]\nphrases = [\"x\"]\n",
    )
    .unwrap();

    let config = EngineConfig {
        catalog_path: Some(catalog_path),
        ..Default::default()
    };
    assert!(matches!(
        EmotionResponseEngine::from_config(&config),
        Err(MeloError::Catalog(_))
    ));
}

#[test]
fn missing_catalog_file_is_an_error() {
    let config = EngineConfig {
        catalog_path: Some("/nonexistent/melo/catalog.toml".into()),
        ..Default::default()
    };
    assert!(EmotionResponseEngine::from_config(&config).is_err());
}

#[test]
fn catalog_without_crisis_phrases_is_rejected() {
    let raw = "[[emotions]]\nname = \"Calm\"\nstrong = [\"serene\"]\n\n[crisis]\nphrases = []\n";
    assert!(Catalog::from_toml_str(raw).is_err());
}
