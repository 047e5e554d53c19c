//! Headless analysis host for stdin/stdout JSON communication.
//!
//! Reads `{"message": "...", "context": {...}}` requests as newline-delimited
//! JSON from stdin and writes one analysis result per line to stdout.
//!
//! Usage: `melo-host [CONFIG_PATH]`. Without an argument the default config
//! path is used when it exists, otherwise built-in defaults.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::time::Duration;

use melo::config::EngineConfig;
use melo::host::run_stdio;
use melo::source::openai::{OpenAiSource, OpenAiSourceConfig};
use melo::{EmotionAnalyzer, EmotionResponseEngine, FallbackAnalyzer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("melo=info")),
        )
        .init();

    let config = load_config()?;
    let engine = EmotionResponseEngine::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))?;

    let analyzer: Box<dyn EmotionAnalyzer> = if config.source.enabled {
        let source = OpenAiSource::new(OpenAiSourceConfig::from_source_config(&config.source))
            .map_err(|e| anyhow::anyhow!("failed to build response source: {e}"))?;
        tracing::info!(model = %config.source.api_model, "hosted reply source enabled");
        Box::new(FallbackAnalyzer::new(
            engine,
            source,
            Duration::from_millis(config.source.timeout_ms),
        ))
    } else {
        Box::new(engine)
    };

    tracing::info!(analyzer = analyzer.name(), "melo-host starting");

    run_stdio(analyzer.as_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "melo-host exited with error");
        anyhow::anyhow!("melo-host failed: {e}")
    })?;

    tracing::info!("melo-host shut down cleanly");
    Ok(())
}

fn load_config() -> anyhow::Result<EngineConfig> {
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let path = match explicit {
        Some(path) => path,
        None => {
            let default = EngineConfig::default_config_path();
            if !default.exists() {
                tracing::info!("no config file, using built-in defaults");
                return Ok(EngineConfig::default());
            }
            default
        }
    };
    tracing::info!(path = %path.display(), "loading config");
    EngineConfig::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", path.display()))
}
