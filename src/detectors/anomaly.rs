//! Z-score anomaly detection against the (department, category) cohort.

use super::{Candidate, Detect, Evidence};
use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

/// Flags amounts more than `z_threshold` standard deviations from the cohort mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnomalyDetector;

impl Detect for AnomalyDetector {
    fn rec_type(&self) -> RecommendationType {
        RecommendationType::SpendingAnomaly
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let cohort = statistics.cohort(&record.department, &record.category)?;
        if cohort.std_dev <= 0.0 {
            return None;
        }

        let threshold = config.anomaly.z_threshold;
        let z_score = (record.amount - cohort.mean) / cohort.std_dev;
        if !z_score.is_finite() || z_score.abs() <= threshold {
            return None;
        }

        let confidence = if threshold > 0.0 {
            (z_score.abs() / (2.0 * threshold)).min(1.0)
        } else {
            1.0
        };

        // Under-spending is flagged but never costed.
        let savings = if z_score > 0.0 {
            (record.amount - cohort.mean).max(0.0)
        } else {
            0.0
        };

        Some(Candidate::new(
            record,
            self.rec_type(),
            confidence,
            savings,
            Evidence::Anomaly {
                z_score,
                mean: cohort.mean,
                std_dev: cohort.std_dev,
                threshold,
            },
        ))
    }
}
