//! Above-median purchases from a vendor other than the cohort's cheapest.

use super::{Candidate, Detect, Evidence};
use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostSavingDetector;

impl Detect for CostSavingDetector {
    fn rec_type(&self) -> RecommendationType {
        RecommendationType::CostSaving
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let cohort = statistics.cohort(&record.department, &record.category)?;
        let median = cohort.median;
        if median <= 0.0 {
            return None;
        }

        let factor = config.cost_saving.factor;
        if record.amount <= median * factor {
            return None;
        }

        let cheapest_vendor = cohort.cheapest_vendor()?;
        if cheapest_vendor == record.vendor {
            return None;
        }

        let ratio = record.amount / median;

        Some(Candidate::new(
            record,
            self.rec_type(),
            ratio - 1.0,
            record.amount - median,
            Evidence::CostSaving {
                median,
                ratio,
                factor,
                cheapest_vendor: cheapest_vendor.to_string(),
            },
        ))
    }
}
