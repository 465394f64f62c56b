//! Type definitions for the recommendation engine

pub mod recommendation;
pub mod transaction;

pub use recommendation::{
    Priority, PriorityThresholds, Recommendation, RecommendationStatus, RecommendationType,
};
pub use transaction::TransactionRecord;
