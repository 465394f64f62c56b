//! Recommendation data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Namespace for deterministic recommendation ids.
const RECOMMENDATION_NAMESPACE: Uuid = Uuid::from_u128(0x6b0f_2a51_93c4_4e7d_9a1e_5c3d_8f20_b417);

/// Kind of recommendation, one per detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    SpendingAnomaly,
    CostSaving,
    VendorConsolidation,
    BudgetOptimization,
    PolicyViolation,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpendingAnomaly => "spending_anomaly",
            Self::CostSaving => "cost_saving",
            Self::VendorConsolidation => "vendor_consolidation",
            Self::BudgetOptimization => "budget_optimization",
            Self::PolicyViolation => "policy_violation",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority classification, ordered `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Derive priority from confidence and estimated savings.
    pub fn derive(
        confidence: f64,
        estimated_savings: f64,
        thresholds: &PriorityThresholds,
    ) -> Self {
        if confidence >= thresholds.high_confidence
            || estimated_savings >= thresholds.large_savings
        {
            Priority::High
        } else if confidence >= thresholds.medium_confidence {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configurable priority thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityThresholds {
    /// Confidence at or above which a recommendation is high priority
    pub high_confidence: f64,
    /// Confidence at or above which a recommendation is medium priority
    pub medium_confidence: f64,
    /// Estimated savings at or above which a recommendation is high priority
    pub large_savings: f64,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            high_confidence: 0.8,
            medium_confidence: 0.5,
            large_savings: 10_000.0,
        }
    }
}

/// Review status of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    #[default]
    Pending,
    Implemented,
    Rejected,
    Archived,
}

/// A ranked, explained recommendation for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommendation identifier, stable for a (transaction, type) pair
    pub id: Uuid,

    /// Transaction the recommendation refers to
    pub transaction_id: String,

    /// Department of the referenced transaction
    #[serde(default)]
    pub department: String,

    /// Category of the referenced transaction
    #[serde(default)]
    pub category: String,

    #[serde(rename = "type")]
    pub rec_type: RecommendationType,

    /// Short title
    pub title: String,

    /// Rule strength in [0, 1]
    pub confidence: f64,

    /// Estimated savings (USD), 0 when not applicable
    pub estimated_savings: f64,

    pub priority: Priority,

    #[serde(default)]
    pub status: RecommendationStatus,

    /// Human-readable justification
    pub explanation: String,

    /// What the reviewer should do about it
    pub suggested_action: String,

    /// Relative weight of each input feature in the decision
    pub feature_importance: BTreeMap<String, f64>,

    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Deterministic id for a (transaction, type) pair.
    pub fn make_id(transaction_id: &str, rec_type: RecommendationType) -> Uuid {
        let name = format!("{}:{}", transaction_id, rec_type.as_str());
        Uuid::new_v5(&RECOMMENDATION_NAMESPACE, name.as_bytes())
    }
}
