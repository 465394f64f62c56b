//! Candidate aggregation: dedup, priority, ranking and truncation

use crate::config::AggregationConfig;
use crate::detectors::Candidate;
use crate::types::recommendation::{Priority, PriorityThresholds, RecommendationType};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// A candidate that survived aggregation, with its derived priority
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub priority: Priority,
}

/// Collects candidates for a transaction and decides which are emitted.
#[derive(Debug, Clone)]
pub struct RecommendationAggregator {
    /// Cap on emitted recommendations per transaction
    max_per_transaction: usize,
    /// Candidates below this confidence are dropped
    min_confidence: f64,
    priority: PriorityThresholds,
}

impl RecommendationAggregator {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            max_per_transaction: config.max_per_transaction,
            min_confidence: config.min_confidence,
            priority: config.priority.clone(),
        }
    }

    /// Derive priority for a candidate.
    pub fn priority_of(&self, candidate: &Candidate) -> Priority {
        Priority::derive(
            candidate.confidence,
            candidate.estimated_savings,
            &self.priority,
        )
    }

    /// Keep the highest-confidence candidate per (transaction, type).
    ///
    /// Ties keep the candidate from the earlier-registered detector.
    pub fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut best: BTreeMap<(String, RecommendationType), Candidate> = BTreeMap::new();

        for candidate in candidates {
            let key = (candidate.transaction_id.clone(), candidate.rec_type);
            match best.get(&key) {
                Some(existing) if !replaces(&candidate, existing) => {}
                _ => {
                    best.insert(key, candidate);
                }
            }
        }

        best.into_values().collect()
    }

    /// Dedup, filter, rank and truncate the candidates for one transaction.
    pub fn aggregate(&self, candidates: Vec<Candidate>) -> Vec<RankedCandidate> {
        let produced = candidates.len();

        let mut ranked: Vec<RankedCandidate> = Self::dedup(candidates)
            .into_iter()
            .filter(|c| c.confidence >= self.min_confidence)
            .map(|candidate| RankedCandidate {
                priority: self.priority_of(&candidate),
                candidate,
            })
            .collect();

        ranked.sort_by(rank_order);
        let kept_before_cap = ranked.len();
        ranked.truncate(self.max_per_transaction);

        debug!(
            produced = produced,
            after_dedup = kept_before_cap,
            emitted = ranked.len(),
            "Candidates aggregated"
        );

        ranked
    }

    pub fn max_per_transaction(&self) -> usize {
        self.max_per_transaction
    }
}

impl Default for RecommendationAggregator {
    fn default() -> Self {
        Self::new(&AggregationConfig::default())
    }
}

fn replaces(challenger: &Candidate, existing: &Candidate) -> bool {
    match challenger.confidence.total_cmp(&existing.confidence) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => challenger.registration_index < existing.registration_index,
    }
}

/// Priority desc, confidence desc, registration order asc.
fn rank_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.candidate.confidence.total_cmp(&a.candidate.confidence))
        .then_with(|| {
            a.candidate
                .registration_index
                .cmp(&b.candidate.registration_index)
        })
        .then_with(|| a.candidate.rec_type.cmp(&b.candidate.rec_type))
        .then_with(|| a.candidate.transaction_id.cmp(&b.candidate.transaction_id))
}
