//! Rule-based detectors.
//!
//! Each detector inspects one transaction against the cohort statistics and
//! configured thresholds and yields at most one [`Candidate`]. The set of
//! detectors is closed: [`Detector`] enumerates them and [`DetectorRegistry`]
//! fixes the order they run in, which is also the aggregator's final
//! tie-break.

pub mod anomaly;
pub mod budget;
pub mod cost_saving;
pub mod policy;
pub mod vendor;

pub use anomaly::AnomalyDetector;
pub use budget::BudgetOptimizationDetector;
pub use cost_saving::CostSavingDetector;
pub use policy::PolicyViolationDetector;
pub use vendor::VendorConsolidationDetector;

use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

/// Statistics that caused a detector to fire
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    Anomaly {
        z_score: f64,
        mean: f64,
        std_dev: f64,
        threshold: f64,
    },
    CostSaving {
        median: f64,
        ratio: f64,
        factor: f64,
        cheapest_vendor: String,
    },
    VendorConsolidation {
        vendor_count: usize,
        max_vendors: usize,
        vendors: Vec<String>,
    },
    BudgetOptimization {
        cohort_total: f64,
        ceiling: f64,
        utilization: f64,
    },
    PolicyCeiling {
        ceiling: f64,
    },
    PolicyBidding {
        vendor_count: usize,
        min_vendors: usize,
        amount_threshold: f64,
    },
}

/// A detector's unranked output for one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub transaction_id: String,
    pub rec_type: RecommendationType,
    /// Always within [0, 1]
    pub confidence: f64,
    /// Always non-negative
    pub estimated_savings: f64,
    pub evidence: Evidence,
    /// Position of the producing detector in the registry
    pub registration_index: usize,
}

impl Candidate {
    pub fn new(
        record: &TransactionRecord,
        rec_type: RecommendationType,
        confidence: f64,
        estimated_savings: f64,
        evidence: Evidence,
    ) -> Self {
        Self {
            transaction_id: record.transaction_id.clone(),
            rec_type,
            confidence: clamp_unit(confidence),
            estimated_savings: if estimated_savings.is_finite() {
                estimated_savings.max(0.0)
            } else {
                0.0
            },
            evidence,
            registration_index: 0,
        }
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Shared detector capability
pub trait Detect {
    /// Kind of recommendation this detector produces.
    fn rec_type(&self) -> RecommendationType;

    /// Evaluate one record. Returns `None` when the rule does not fire or the
    /// record cannot be assessed (unknown cohort, degenerate statistics).
    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate>;
}

/// The closed set of detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    Anomaly(AnomalyDetector),
    CostSaving(CostSavingDetector),
    VendorConsolidation(VendorConsolidationDetector),
    BudgetOptimization(BudgetOptimizationDetector),
    PolicyViolation(PolicyViolationDetector),
}

impl Detector {
    pub fn name(&self) -> &'static str {
        self.rec_type().as_str()
    }
}

impl Detect for Detector {
    fn rec_type(&self) -> RecommendationType {
        match self {
            Detector::Anomaly(d) => d.rec_type(),
            Detector::CostSaving(d) => d.rec_type(),
            Detector::VendorConsolidation(d) => d.rec_type(),
            Detector::BudgetOptimization(d) => d.rec_type(),
            Detector::PolicyViolation(d) => d.rec_type(),
        }
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        match self {
            Detector::Anomaly(d) => d.evaluate(record, statistics, config),
            Detector::CostSaving(d) => d.evaluate(record, statistics, config),
            Detector::VendorConsolidation(d) => d.evaluate(record, statistics, config),
            Detector::BudgetOptimization(d) => d.evaluate(record, statistics, config),
            Detector::PolicyViolation(d) => d.evaluate(record, statistics, config),
        }
    }
}

/// Ordered list of detectors to run for every transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
}

impl DetectorRegistry {
    /// Registry with the given detectors, in registration order.
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self { detectors }
    }

    /// All five detectors in their standard order.
    pub fn standard() -> Self {
        Self::new(vec![
            Detector::Anomaly(AnomalyDetector),
            Detector::CostSaving(CostSavingDetector),
            Detector::VendorConsolidation(VendorConsolidationDetector),
            Detector::BudgetOptimization(BudgetOptimizationDetector),
            Detector::PolicyViolation(PolicyViolationDetector),
        ])
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(Detector::name).collect()
    }

    /// Run every detector and tag each candidate with its registration index.
    pub fn evaluate_all(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Vec<Candidate> {
        self.detectors
            .iter()
            .enumerate()
            .filter_map(|(index, detector)| {
                detector
                    .evaluate(record, statistics, config)
                    .map(|mut candidate| {
                        candidate.registration_index = index;
                        candidate
                    })
            })
            .collect()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cohort::{CohortStatistics, CohortSummary, VendorShare};
    use crate::types::transaction::TransactionRecord;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    pub fn record(
        department: &str,
        category: &str,
        vendor: &str,
        amount: f64,
    ) -> TransactionRecord {
        TransactionRecord::new(
            "tx_test",
            department,
            category,
            vendor,
            amount,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        )
    }

    /// Statistics holding a single hand-built cohort.
    pub fn statistics_with(
        department: &str,
        category: &str,
        mean: f64,
        std_dev: f64,
        median: f64,
        vendors: &[(&str, u64, f64)],
    ) -> CohortStatistics {
        let vendors: BTreeMap<String, VendorShare> = vendors
            .iter()
            .map(|(name, count, total)| {
                (
                    name.to_string(),
                    VendorShare {
                        count: *count,
                        total: *total,
                    },
                )
            })
            .collect();
        let count: u64 = vendors.values().map(|v| v.count).sum::<u64>().max(1);

        let summary = CohortSummary {
            count,
            total: mean * count as f64,
            mean,
            std_dev,
            median,
            min: 0.0,
            max: mean * 2.0,
            vendors,
        };

        let mut stats = CohortStatistics::default();
        stats
            .cohorts
            .entry(department.to_string())
            .or_default()
            .insert(category.to_string(), summary);
        stats.record_count = count;
        stats
    }
}
