//! Recommendation engine: detectors -> aggregator -> explanations

use crate::cohort::CohortStatistics;
use crate::config::EngineConfig;
use crate::detectors::DetectorRegistry;
use crate::error::ArtifactError;
use crate::explanation::ExplanationBuilder;
use crate::models::aggregator::{RankedCandidate, RecommendationAggregator};
use crate::models::artifact;
use crate::types::recommendation::{Recommendation, RecommendationStatus};
use crate::types::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Recommendations produced for one transaction of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecommendations {
    pub transaction_id: String,
    pub recommendations: Vec<Recommendation>,
}

/// Evaluates transactions against shared, read-only cohort statistics.
///
/// The engine holds no mutable state, so one instance can be shared across
/// worker tasks behind an `Arc`.
pub struct RecommendationEngine {
    statistics: Arc<CohortStatistics>,
    config: Arc<EngineConfig>,
    registry: DetectorRegistry,
    aggregator: RecommendationAggregator,
    /// Timestamp stamped on every recommendation of this run
    run_at: DateTime<Utc>,
}

impl RecommendationEngine {
    /// Create an engine with the standard detector registry.
    pub fn new(statistics: CohortStatistics, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(statistics), Arc::new(config))
    }

    /// Create an engine over statistics and config that are already shared.
    pub fn from_shared(statistics: Arc<CohortStatistics>, config: Arc<EngineConfig>) -> Self {
        let aggregator = RecommendationAggregator::new(&config.aggregation);
        Self {
            statistics,
            config,
            registry: DetectorRegistry::standard(),
            aggregator,
            run_at: Utc::now(),
        }
    }

    /// Create an engine from a saved model artifact.
    pub fn from_artifact<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let (statistics, config) = artifact::load_artifact(path)?;
        let engine = Self::new(statistics, config);
        info!(
            cohorts = engine.statistics.cohort_count(),
            records = engine.statistics.record_count,
            detectors = ?engine.detector_names(),
            "Recommendation engine initialized from artifact"
        );
        Ok(engine)
    }

    /// Replace the detector registry.
    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fix the run timestamp, making output reproducible.
    pub fn with_run_timestamp(mut self, run_at: DateTime<Utc>) -> Self {
        self.run_at = run_at;
        self
    }

    pub fn statistics(&self) -> &CohortStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Evaluate one transaction.
    ///
    /// Returns recommendations in rank order; empty when nothing fires or the
    /// record is invalid.
    pub fn evaluate(&self, record: &TransactionRecord) -> Vec<Recommendation> {
        if let Err(e) = record.validate() {
            warn!(
                transaction_id = %record.transaction_id,
                error = %e,
                "Skipping invalid record"
            );
            return Vec::new();
        }
        self.recommend(record)
    }

    /// Evaluate a batch, preserving input order. Invalid records are skipped.
    pub fn evaluate_batch(
        &self,
        records: &[TransactionRecord],
    ) -> Vec<TransactionRecommendations> {
        let mut results = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for record in records {
            if let Err(e) = record.validate() {
                warn!(
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Skipping invalid record"
                );
                skipped += 1;
                continue;
            }
            results.push(TransactionRecommendations {
                transaction_id: record.transaction_id.clone(),
                recommendations: self.recommend(record),
            });
        }

        info!(
            records = records.len(),
            skipped = skipped,
            recommendations = results.iter().map(|r| r.recommendations.len()).sum::<usize>(),
            "Batch evaluated"
        );

        results
    }

    /// Run the pipeline on a record that has already passed validation.
    fn recommend(&self, record: &TransactionRecord) -> Vec<Recommendation> {
        recommend(
            record,
            &self.statistics,
            &self.config,
            &self.registry,
            &self.aggregator,
            self.run_at,
        )
    }
}

/// Detectors, aggregation and explanation over borrowed inputs.
fn recommend(
    record: &TransactionRecord,
    statistics: &CohortStatistics,
    config: &EngineConfig,
    registry: &DetectorRegistry,
    aggregator: &RecommendationAggregator,
    run_at: DateTime<Utc>,
) -> Vec<Recommendation> {
    let candidates = registry.evaluate_all(record, statistics, config);
    let recommendations: Vec<Recommendation> = aggregator
        .aggregate(candidates)
        .into_iter()
        .map(|ranked| build_recommendation(ranked, record, statistics, run_at))
        .collect();

    debug!(
        transaction_id = %record.transaction_id,
        count = recommendations.len(),
        "Transaction evaluated"
    );

    recommendations
}

fn build_recommendation(
    ranked: RankedCandidate,
    record: &TransactionRecord,
    statistics: &CohortStatistics,
    run_at: DateTime<Utc>,
) -> Recommendation {
    let RankedCandidate {
        candidate,
        priority,
    } = ranked;
    let explanation = ExplanationBuilder::new().explain(&candidate, record, statistics);

    Recommendation {
        id: Recommendation::make_id(&candidate.transaction_id, candidate.rec_type),
        transaction_id: candidate.transaction_id,
        department: record.department.clone(),
        category: record.category.clone(),
        rec_type: candidate.rec_type,
        title: explanation.title,
        confidence: candidate.confidence,
        estimated_savings: candidate.estimated_savings,
        priority,
        status: RecommendationStatus::Pending,
        explanation: explanation.text,
        suggested_action: explanation.suggested_action,
        feature_importance: explanation.feature_importance,
        created_at: run_at,
    }
}

/// Evaluate one transaction with the standard detectors.
///
/// Statistics and config are only borrowed. Output is fully determined by
/// the inputs and `run_at`.
pub fn evaluate(
    record: &TransactionRecord,
    statistics: &CohortStatistics,
    config: &EngineConfig,
    run_at: DateTime<Utc>,
) -> Vec<Recommendation> {
    if let Err(e) = record.validate() {
        warn!(
            transaction_id = %record.transaction_id,
            error = %e,
            "Skipping invalid record"
        );
        return Vec::new();
    }

    recommend(
        record,
        statistics,
        config,
        &DetectorRegistry::standard(),
        &RecommendationAggregator::new(&config.aggregation),
        run_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::build_statistics;
    use crate::config::{BudgetAllocation, CategoryCeiling};
    use crate::types::recommendation::{Priority, RecommendationType};
    use chrono::{NaiveDate, TimeZone};

    fn record(id: &str, category: &str, vendor: &str, amount: f64) -> TransactionRecord {
        TransactionRecord::new(
            id,
            "Parks",
            category,
            vendor,
            amount,
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        )
    }

    /// Parks/IT Equipment: 5 vendors, 20 routine purchases and one outlier.
    fn batch() -> Vec<TransactionRecord> {
        let vendors = ["Dell", "HP", "Lenovo", "CDW", "Insight"];
        let mut records: Vec<TransactionRecord> = (0..20)
            .map(|i| {
                record(
                    &format!("tx_{:03}", i),
                    "IT Equipment",
                    vendors[i % vendors.len()],
                    900.0 + (i % 4) as f64 * 50.0,
                )
            })
            .collect();
        records.push(record("tx_outlier", "IT Equipment", "Insight", 9_500.0));
        records.push(record("tx_training", "Training", "Learnly", 400.0));
        records
    }

    fn run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 3, 12, 0, 0).unwrap()
    }

    fn engine() -> RecommendationEngine {
        let stats = build_statistics(&batch()).unwrap();
        RecommendationEngine::new(stats, EngineConfig::default()).with_run_timestamp(run_at())
    }

    #[test]
    fn test_outlier_gets_ranked_recommendations() {
        let engine = engine();
        let recs = engine.evaluate(&record("tx_outlier", "IT Equipment", "Insight", 9_500.0));

        let types: Vec<_> = recs.iter().map(|r| r.rec_type).collect();
        assert!(types.contains(&RecommendationType::SpendingAnomaly));
        assert!(types.contains(&RecommendationType::CostSaving));
        assert!(types.contains(&RecommendationType::VendorConsolidation));

        assert_eq!(recs[0].rec_type, RecommendationType::SpendingAnomaly);
        assert_eq!(recs[0].priority, Priority::High);
        for rec in &recs {
            assert_eq!(rec.transaction_id, "tx_outlier");
            assert_eq!(rec.created_at, run_at());
            assert_eq!(rec.status, RecommendationStatus::Pending);
            assert!((0.0..=1.0).contains(&rec.confidence));
            assert!(rec.estimated_savings >= 0.0);
            assert!(!rec.explanation.is_empty());
        }
    }

    #[test]
    fn test_routine_purchase_only_gets_cohort_advice() {
        let recs = engine().evaluate(&record("tx_001", "IT Equipment", "HP", 950.0));
        let types: Vec<_> = recs.iter().map(|r| r.rec_type).collect();
        assert_eq!(types, vec![RecommendationType::VendorConsolidation]);
        assert!((recs[0].confidence - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(recs[0].priority, Priority::Medium);
    }

    #[test]
    fn test_quiet_transaction_returns_empty() {
        let recs = engine().evaluate(&record("tx_training", "Training", "Learnly", 400.0));
        assert!(recs.is_empty());
    }

    #[test]
    fn test_unknown_cohort_returns_empty() {
        let recs = engine().evaluate(&record("tx_new", "Furniture", "Ikea", 700.0));
        assert!(recs.is_empty());
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let stats = build_statistics(&batch()).unwrap();
        let config = EngineConfig::default();
        let target = record("tx_outlier", "IT Equipment", "Insight", 9_500.0);

        let first = serde_json::to_vec(&evaluate(&target, &stats, &config, run_at())).unwrap();
        let second = serde_json::to_vec(&evaluate(&target, &stats, &config, run_at())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cap_is_respected_when_every_detector_fires() {
        let mut config = EngineConfig::default();
        config.budget.allocations.push(BudgetAllocation {
            department: "Parks".into(),
            category: "IT Equipment".into(),
            ceiling: 10_000.0,
        });
        config.policy.category_ceilings.push(CategoryCeiling {
            category: "IT Equipment".into(),
            ceiling: 5_000.0,
        });

        let stats = build_statistics(&batch()).unwrap();
        let target = record("tx_outlier", "IT Equipment", "Insight", 9_500.0);

        let all = evaluate(&target, &stats, &config, run_at());
        assert_eq!(all.len(), 5);

        config.aggregation.max_per_transaction = 3;
        let capped = evaluate(&target, &stats, &config, run_at());
        assert_eq!(capped.len(), 3);
        assert_eq!(capped[..], all[..3]);
    }

    #[test]
    fn test_invalid_record_yields_nothing() {
        let recs = engine().evaluate(&record("tx_bad", "IT Equipment", "Dell", -10.0));
        assert!(recs.is_empty());
    }

    #[test]
    fn test_batch_preserves_order_and_skips_invalid() {
        let engine = engine();
        let records = vec![
            record("b", "IT Equipment", "HP", 950.0),
            record("bad", "", "HP", 950.0),
            record("a", "Training", "Learnly", 400.0),
            record("c", "IT Equipment", "Insight", 9_500.0),
        ];

        let results = engine.evaluate_batch(&records);
        let ids: Vec<_> = results.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(results[1].recommendations.is_empty());
        assert!(!results[2].recommendations.is_empty());
    }

    #[test]
    fn test_free_evaluate_matches_engine() {
        let stats = build_statistics(&batch()).unwrap();
        let config = EngineConfig::default();
        let engine = RecommendationEngine::new(stats.clone(), config.clone())
            .with_run_timestamp(run_at());

        for target in batch() {
            assert_eq!(
                evaluate(&target, &stats, &config, run_at()),
                engine.evaluate(&target)
            );
        }
        assert!(evaluate(&record("tx_bad", "", "HP", 1.0), &stats, &config, run_at()).is_empty());
    }

    #[test]
    fn test_recommendations_carry_cohort_keys() {
        let recs = engine().evaluate(&record("tx_outlier", "IT Equipment", "Insight", 9_500.0));
        assert!(!recs.is_empty());
        for rec in &recs {
            assert_eq!(rec.department, "Parks");
            assert_eq!(rec.category, "IT Equipment");
        }
    }
}
