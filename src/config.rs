//! Configuration management for the recommendation engine

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::recommendation::PriorityThresholds;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifact: ArtifactConfig,
    pub engine: EngineConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transaction records
    pub transaction_subject: String,
    /// Subject for outgoing recommendations
    pub recommendation_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            transaction_subject: "spending.transactions".to_string(),
            recommendation_subject: "spending.recommendations".to_string(),
        }
    }
}

/// Model artifact location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub path: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: "artifacts/model.json".to_string(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of records evaluated concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    pub report_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            report_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Detector thresholds and policy constants.
///
/// Stored alongside the cohort statistics in the model artifact, so every
/// field must round-trip through serde unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub anomaly: AnomalyConfig,
    pub cost_saving: CostSavingConfig,
    pub vendor_consolidation: VendorConsolidationConfig,
    pub budget: BudgetConfig,
    pub policy: PolicyConfig,
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// |z| above which a transaction is anomalous
    pub z_threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self { z_threshold: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSavingConfig {
    /// Multiple of the cohort median above which a purchase is costly
    pub factor: f64,
}

impl Default for CostSavingConfig {
    fn default() -> Self {
        Self { factor: 1.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConsolidationConfig {
    /// Distinct vendors per cohort above which consolidation is suggested
    pub max_vendors: usize,
}

impl Default for VendorConsolidationConfig {
    fn default() -> Self {
        Self { max_vendors: 3 }
    }
}

/// Budget ceiling for one (department, category) cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub department: String,
    pub category: String,
    pub ceiling: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Share of the ceiling at which spend starts being flagged
    pub alert_fraction: f64,
    pub allocations: Vec<BudgetAllocation>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            alert_fraction: 0.9,
            allocations: Vec::new(),
        }
    }
}

impl BudgetConfig {
    /// Ceiling configured for a cohort, if any.
    pub fn ceiling_for(&self, department: &str, category: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.department == department && a.category == category)
            .map(|a| a.ceiling)
    }
}

/// Per-category single-transaction ceiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCeiling {
    pub category: String,
    pub ceiling: f64,
}

/// Purchases in `category` of at least `amount_threshold` need
/// `min_vendors` competing vendors in the cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiddingRule {
    pub category: String,
    pub min_vendors: usize,
    pub amount_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Global single-transaction ceiling
    pub single_transaction_ceiling: Option<f64>,
    /// Category ceilings, overriding the global one
    pub category_ceilings: Vec<CategoryCeiling>,
    pub competitive_bidding: Vec<BiddingRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            single_transaction_ceiling: Some(50_000.0),
            category_ceilings: Vec::new(),
            competitive_bidding: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Effective single-transaction ceiling for a category.
    pub fn ceiling_for(&self, category: &str) -> Option<f64> {
        self.category_ceilings
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.ceiling)
            .or(self.single_transaction_ceiling)
    }

    pub fn bidding_rule_for(&self, category: &str) -> Option<&BiddingRule> {
        self.competitive_bidding.iter().find(|r| r.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Maximum recommendations emitted per transaction
    pub max_per_transaction: usize,
    /// Candidates below this confidence are dropped
    pub min_confidence: f64,
    pub priority: PriorityThresholds,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_per_transaction: 5,
            min_confidence: 0.0,
            priority: PriorityThresholds::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/config.toml` and the environment
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/config").required(false))
            .add_source(Environment::with_prefix("RECOMMENDER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
