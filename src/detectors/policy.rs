//! Purchasing policy checks. Violations are binary, so confidence is 1.0.

use super::{Candidate, Detect, Evidence};
use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyViolationDetector;

impl PolicyViolationDetector {
    fn check_ceiling(
        &self,
        record: &TransactionRecord,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let ceiling = config.policy.ceiling_for(&record.category)?;
        if record.amount <= ceiling {
            return None;
        }

        Some(Candidate::new(
            record,
            self.rec_type(),
            1.0,
            record.amount - ceiling,
            Evidence::PolicyCeiling { ceiling },
        ))
    }

    fn check_bidding(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let rule = config.policy.bidding_rule_for(&record.category)?;
        if record.amount < rule.amount_threshold {
            return None;
        }

        let vendor_count = statistics
            .cohort(&record.department, &record.category)
            .map(|c| c.vendor_count())
            .unwrap_or(0);
        if vendor_count >= rule.min_vendors {
            return None;
        }

        Some(Candidate::new(
            record,
            self.rec_type(),
            1.0,
            0.0,
            Evidence::PolicyBidding {
                vendor_count,
                min_vendors: rule.min_vendors,
                amount_threshold: rule.amount_threshold,
            },
        ))
    }
}

impl Detect for PolicyViolationDetector {
    fn rec_type(&self) -> RecommendationType {
        RecommendationType::PolicyViolation
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        self.check_ceiling(record, config)
            .or_else(|| self.check_bidding(record, statistics, config))
    }
}
