//! Spending Recommendation Engine
//!
//! Rule-based analysis of spending transactions against department/category
//! cohort statistics, producing confidence-scored, explainable
//! recommendations.

pub mod cohort;
pub mod config;
pub mod consumer;
pub mod detectors;
pub mod error;
pub mod explanation;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod store;
pub mod types;

pub use cohort::{build_statistics, CohortStatistics};
pub use config::{AppConfig, EngineConfig};
pub use consumer::TransactionConsumer;
pub use error::{ArtifactError, InsufficientDataError, ValidationError};
pub use models::{evaluate, load_artifact, save_artifact, RecommendationEngine};
pub use producer::RecommendationProducer;
pub use store::RecommendationStore;
pub use types::{recommendation::Recommendation, transaction::TransactionRecord};
