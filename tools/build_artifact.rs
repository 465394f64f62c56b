//! Model Artifact Builder
//!
//! Reads historical transaction records (one JSON object per line), builds
//! cohort statistics and writes the versioned model artifact the service
//! loads at startup.
//!
//! Usage: build-artifact <records.jsonl> [artifact path] [config path]

use anyhow::{bail, Context, Result};
use spending_recommender::{
    build_statistics, save_artifact, AppConfig, TransactionRecord,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("build_artifact=info".parse()?)
                .add_directive("spending_recommender=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(records_path) = args.get(1) else {
        bail!("usage: build-artifact <records.jsonl> [artifact path] [config path]");
    };

    let config = match args.get(3) {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let artifact_path = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| config.artifact.path.clone());

    info!(
        records = %records_path,
        artifact = %artifact_path,
        "Building model artifact"
    );

    let file = File::open(records_path)
        .with_context(|| format!("Failed to open records file {}", records_path))?;

    let mut records = Vec::new();
    let mut rejected = 0u64;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match TransactionRecord::from_json(line.as_bytes()) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                warn!(line = line_no + 1, error = %e, "Skipping record");
            }
        }
    }

    info!(accepted = records.len(), rejected = rejected, "Records loaded");

    let statistics = build_statistics(&records)?;
    save_artifact(&statistics, &config.engine, &artifact_path)
        .with_context(|| format!("Failed to write artifact {}", artifact_path))?;

    info!(
        cohorts = statistics.cohort_count(),
        records = statistics.record_count,
        artifact = %artifact_path,
        "Artifact written"
    );

    Ok(())
}
