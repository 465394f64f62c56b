//! Vendor sprawl within a (department, category) cohort.
//!
//! The rule is cohort-wide: every transaction in an over-sprawled cohort gets
//! the same candidate.

use super::{Candidate, Detect, Evidence};
use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VendorConsolidationDetector;

impl Detect for VendorConsolidationDetector {
    fn rec_type(&self) -> RecommendationType {
        RecommendationType::VendorConsolidation
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let cohort = statistics.cohort(&record.department, &record.category)?;
        let max_vendors = config.vendor_consolidation.max_vendors;
        let vendor_count = cohort.vendor_count();
        if vendor_count <= max_vendors {
            return None;
        }

        let confidence = if max_vendors == 0 {
            1.0
        } else {
            ((vendor_count - max_vendors) as f64 / max_vendors as f64).min(1.0)
        };

        Some(Candidate::new(
            record,
            self.rec_type(),
            confidence,
            0.0,
            Evidence::VendorConsolidation {
                vendor_count,
                max_vendors,
                vendors: cohort.vendors.keys().cloned().collect(),
            },
        ))
    }
}
