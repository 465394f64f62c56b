//! Recommendation engine components

pub mod aggregator;
pub mod artifact;
pub mod engine;

pub use aggregator::RecommendationAggregator;
pub use artifact::{load_artifact, save_artifact, ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use engine::{evaluate, RecommendationEngine, TransactionRecommendations};
