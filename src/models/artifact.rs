//! Versioned model artifact: cohort statistics plus detector thresholds

use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::error::ArtifactError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Newest artifact format this build can read.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// On-disk artifact layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Crate version that wrote the artifact
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub statistics: CohortStatistics,
    pub config: EngineConfig,
}

impl ModelArtifact {
    pub fn new(statistics: CohortStatistics, config: EngineConfig) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            statistics,
            config,
        }
    }
}

/// Write statistics and thresholds to `path` as one artifact.
///
/// The file is written next to the destination and renamed into place.
pub fn save_artifact<P: AsRef<Path>>(
    statistics: &CohortStatistics,
    config: &EngineConfig,
    path: P,
) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    // JSON has no encoding for inf/NaN; serde_json would write null.
    if !statistics.is_finite() {
        return Err(ArtifactError::Serialize(
            "statistics contain non-finite values".to_string(),
        ));
    }

    let artifact = ModelArtifact::new(statistics.clone(), config.clone());
    let payload =
        serde_json::to_vec_pretty(&artifact).map_err(|e| ArtifactError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, &payload)?;
    fs::rename(&tmp_path, path)?;

    info!(
        path = %path.display(),
        format_version = ARTIFACT_FORMAT_VERSION,
        cohorts = statistics.cohort_count(),
        bytes = payload.len(),
        "Model artifact saved"
    );

    Ok(())
}

/// Read an artifact written by [`save_artifact`].
pub fn load_artifact<P: AsRef<Path>>(
    path: P,
) -> Result<(CohortStatistics, EngineConfig), ArtifactError> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading model artifact");

    let bytes = fs::read(path)?;
    let artifact = parse_artifact(&bytes)?;

    info!(
        path = %path.display(),
        format_version = artifact.format_version,
        engine_version = %artifact.engine_version,
        created_at = %artifact.created_at,
        cohorts = artifact.statistics.cohort_count(),
        "Model artifact loaded"
    );

    Ok((artifact.statistics, artifact.config))
}

/// Decode artifact bytes, checking the format version before the body.
pub fn parse_artifact(bytes: &[u8]) -> Result<ModelArtifact, ArtifactError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ArtifactError::Corrupt(format!("invalid JSON: {}", e)))?;

    let found = value
        .get("format_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| ArtifactError::Corrupt("missing field `format_version`".to_string()))?;

    if found > u64::from(ARTIFACT_FORMAT_VERSION) {
        return Err(ArtifactError::Version {
            found: u32::try_from(found).unwrap_or(u32::MAX),
            supported: ARTIFACT_FORMAT_VERSION,
        });
    }

    serde_json::from_value(value).map_err(|e| ArtifactError::Corrupt(e.to_string()))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
