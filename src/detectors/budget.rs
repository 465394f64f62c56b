//! Cohort spend measured against its configured budget ceiling.

use super::{Candidate, Detect, Evidence};
use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::types::recommendation::RecommendationType;
use crate::types::transaction::TransactionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BudgetOptimizationDetector;

/// Confidence for a utilization ratio.
///
/// Ramps from 0 at `alert_fraction` to 0.5 at 100% of the ceiling, then to
/// 1.0 at 200%.
fn budget_confidence(utilization: f64, alert_fraction: f64) -> f64 {
    if utilization >= 1.0 {
        0.5 + 0.5 * (utilization - 1.0).min(1.0)
    } else if alert_fraction < 1.0 {
        0.5 * (utilization - alert_fraction) / (1.0 - alert_fraction)
    } else {
        0.0
    }
}

impl Detect for BudgetOptimizationDetector {
    fn rec_type(&self) -> RecommendationType {
        RecommendationType::BudgetOptimization
    }

    fn evaluate(
        &self,
        record: &TransactionRecord,
        statistics: &CohortStatistics,
        config: &EngineConfig,
    ) -> Option<Candidate> {
        let ceiling = config
            .budget
            .ceiling_for(&record.department, &record.category)?;
        if ceiling <= 0.0 {
            return None;
        }

        let cohort = statistics.cohort(&record.department, &record.category)?;
        let utilization = cohort.total / ceiling;
        let alert_fraction = config.budget.alert_fraction;
        if utilization <= 0.0 || utilization <= alert_fraction {
            return None;
        }

        let overage = (cohort.total - ceiling).max(0.0);

        Some(Candidate::new(
            record,
            self.rec_type(),
            budget_confidence(utilization, alert_fraction),
            record.amount.min(overage),
            Evidence::BudgetOptimization {
                cohort_total: cohort.total,
                ceiling,
                utilization,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudgetAllocation;
    use crate::detectors::test_support::{record, statistics_with};

    fn config_with_ceiling(ceiling: f64) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.budget.allocations.push(BudgetAllocation {
            department: "Sanitation".into(),
            category: "Services".into(),
            ceiling,
        });
        config
    }

    /// Cohort of 10 transactions totalling 10,000.
    fn stats() -> CohortStatistics {
        statistics_with(
            "Sanitation",
            "Services",
            1000.0,
            250.0,
            1000.0,
            &[("CityClean", 10, 10_000.0)],
        )
    }

    #[test]
    fn test_under_alert_fraction_is_quiet() {
        let result = BudgetOptimizationDetector.evaluate(
            &record("Sanitation", "Services", "CityClean", 1000.0),
            &stats(),
            &config_with_ceiling(20_000.0),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_exactly_at_alert_fraction_is_quiet() {
        // 900 of 1,000 is exactly the default 90% alert fraction
        let stats = statistics_with(
            "Sanitation",
            "Services",
            90.0,
            10.0,
            90.0,
            &[("CityClean", 10, 900.0)],
        );
        let result = BudgetOptimizationDetector.evaluate(
            &record("Sanitation", "Services", "CityClean", 90.0),
            &stats,
            &config_with_ceiling(1_000.0),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_warning_zone_has_low_confidence_and_no_savings() {
        // 10,000 / 10,500 ~ 95% of budget
        let candidate = BudgetOptimizationDetector
            .evaluate(
                &record("Sanitation", "Services", "CityClean", 1000.0),
                &stats(),
                &config_with_ceiling(10_500.0),
            )
            .unwrap();

        assert!(candidate.confidence > 0.0 && candidate.confidence < 0.5);
        assert_eq!(candidate.estimated_savings, 0.0);
    }

    #[test]
    fn test_overage_raises_confidence_toward_one() {
        let record = record("Sanitation", "Services", "CityClean", 1000.0);

        let at_125 = BudgetOptimizationDetector
            .evaluate(&record, &stats(), &config_with_ceiling(8_000.0))
            .unwrap();
        assert!((at_125.confidence - 0.625).abs() < 1e-12);
        // Overage is 2,000 but this record only accounts for 1,000 of it.
        assert_eq!(at_125.estimated_savings, 1000.0);

        let at_250 = BudgetOptimizationDetector
            .evaluate(&record, &stats(), &config_with_ceiling(4_000.0))
            .unwrap();
        assert_eq!(at_250.confidence, 1.0);
        assert!(at_250.confidence > at_125.confidence);
    }

    #[test]
    fn test_unbudgeted_cohort_is_quiet() {
        let result = BudgetOptimizationDetector.evaluate(
            &record("Sanitation", "Services", "CityClean", 1000.0),
            &stats(),
            &EngineConfig::default(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_confidence_curve_is_continuous_at_full_budget() {
        assert!((budget_confidence(0.9, 0.9)).abs() < 1e-12);
        assert!((budget_confidence(0.999_999, 0.9) - 0.5).abs() < 1e-5);
        assert_eq!(budget_confidence(1.0, 0.9), 0.5);
        assert_eq!(budget_confidence(3.0, 0.9), 1.0);
    }
}
