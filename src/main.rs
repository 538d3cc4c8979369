//! Conflict Engine driver
//!
//! Reads local/remote snapshot pairs from a JSON file, detects conflicts,
//! auto-resolves what policy allows and optionally resolves the rest with a
//! given strategy. Prints a JSON report to stdout.
//!
//! The input is either an array of pairs or an object
//! `{"config": {...}, "pairs": [...]}` whose config replaces the one read
//! from the environment.
//!
//! Usage: `conflict-engine <pairs.json> [strategy]`

use std::env;
use std::fs;

use anyhow::{Context, Result};
use conflict_engine::{
    ConflictEngine, ConflictInfo, EngineConfig, ResolutionResult, VersionedData,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct SnapshotPair {
    local: VersionedData,
    remote: VersionedData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Input {
    Pairs(Vec<SnapshotPair>),
    Batch {
        config: Option<EngineConfig>,
        pairs: Vec<SnapshotPair>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    detected: Vec<ConflictInfo>,
    auto_resolved: Vec<ResolutionResult>,
    resolved: Vec<ResolutionResult>,
    pending: Vec<ConflictInfo>,
}

fn main() -> Result<()> {
    // Initialize tracing on stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "conflict_engine=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        EngineConfig::default()
    });

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .context("usage: conflict-engine <pairs.json> [strategy]")?;
    let strategy = args.next();

    let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let input: Input =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path))?;

    let (config, pairs) = match input {
        Input::Pairs(pairs) => (config, pairs),
        Input::Batch { config: Some(file_config), pairs } => {
            tracing::info!("Using config from {}", path);
            (file_config, pairs)
        }
        Input::Batch { config: None, pairs } => (config, pairs),
    };

    tracing::info!("Loaded {} snapshot pairs from {}", pairs.len(), path);

    let engine = ConflictEngine::new(config)?;

    let mut detected = Vec::new();
    for pair in &pairs {
        match engine.compare_versions(&pair.local, &pair.remote) {
            Ok(Some(conflict)) => detected.push(conflict),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping pair: {}", e),
        }
    }

    let auto_resolved = engine.auto_resolve_conflicts();

    let resolved = match strategy {
        Some(token) => engine
            .registry()
            .get_pending_conflicts()
            .iter()
            .map(|conflict| engine.resolve_conflict_token(&conflict.id, &token, None))
            .collect(),
        None => Vec::new(),
    };

    let report = Report {
        detected,
        auto_resolved,
        resolved,
        pending: engine.registry().get_pending_conflicts(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    engine.shutdown();
    Ok(())
}
