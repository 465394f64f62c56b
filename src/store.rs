//! In-memory recommendation store for read-only list / lookup access.
//!
//! Lookups that miss return `None`; callers map that to a not-found response.

use crate::types::recommendation::{
    Priority, Recommendation, RecommendationStatus, RecommendationType,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Filters for listing recommendations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationQuery {
    pub status: Option<RecommendationStatus>,
    #[serde(rename = "type")]
    pub rec_type: Option<RecommendationType>,
    pub priority: Option<Priority>,
    pub transaction_id: Option<String>,
    /// Department of the referenced transaction
    pub department: Option<String>,
    /// Category of the referenced transaction
    pub category: Option<String>,
    pub min_confidence: Option<f64>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl RecommendationQuery {
    fn matches(&self, rec: &Recommendation) -> bool {
        fn text_matches(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        self.status.map_or(true, |s| rec.status == s)
            && self.rec_type.map_or(true, |t| rec.rec_type == t)
            && self.priority.map_or(true, |p| rec.priority == p)
            && text_matches(&self.transaction_id, &rec.transaction_id)
            && text_matches(&self.department, &rec.department)
            && text_matches(&self.category, &rec.category)
            && self.min_confidence.map_or(true, |c| rec.confidence >= c)
    }
}

/// Aggregate counts over the stored recommendations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSummary {
    pub total_recommendations: usize,
    pub total_potential_savings: f64,
    pub by_type: BTreeMap<RecommendationType, usize>,
    pub by_status: BTreeMap<RecommendationStatus, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
}

type RecommendationMap = HashMap<Uuid, Recommendation>;

/// Thread-safe store keyed by recommendation id
#[derive(Default)]
pub struct RecommendationStore {
    recommendations: RwLock<RecommendationMap>,
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer panicked while holding the lock; the map is unusable.
    fn read(&self) -> Option<RwLockReadGuard<'_, RecommendationMap>> {
        match self.recommendations.read() {
            Ok(map) => Some(map),
            Err(_) => {
                warn!("Recommendation store lock poisoned, read refused");
                None
            }
        }
    }

    fn write(&self) -> Option<RwLockWriteGuard<'_, RecommendationMap>> {
        match self.recommendations.write() {
            Ok(map) => Some(map),
            Err(_) => {
                warn!("Recommendation store lock poisoned, write refused");
                None
            }
        }
    }

    /// Insert or replace recommendations. Returns how many were stored.
    pub fn insert_batch(
        &self,
        recommendations: impl IntoIterator<Item = Recommendation>,
    ) -> usize {
        let Some(mut map) = self.write() else {
            return 0;
        };
        let mut stored = 0;
        for rec in recommendations {
            map.insert(rec.id, rec);
            stored += 1;
        }
        debug!(stored = stored, total = map.len(), "Recommendations stored");
        stored
    }

    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up one recommendation.
    pub fn get(&self, id: Uuid) -> Option<Recommendation> {
        self.read()?.get(&id).cloned()
    }

    /// Matching recommendations, highest confidence first.
    pub fn list(&self, query: &RecommendationQuery) -> Vec<Recommendation> {
        let Some(map) = self.read() else {
            return Vec::new();
        };

        let mut matching: Vec<Recommendation> =
            map.values().filter(|r| query.matches(r)).cloned().collect();
        matching.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
                .then_with(|| a.rec_type.cmp(&b.rec_type))
        });

        matching
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Change the review status. Returns the updated recommendation.
    pub fn update_status(
        &self,
        id: Uuid,
        status: RecommendationStatus,
    ) -> Option<Recommendation> {
        let mut map = self.write()?;
        let rec = map.get_mut(&id)?;
        rec.status = status;
        Some(rec.clone())
    }

    /// Delete a recommendation, returning it when it existed.
    pub fn remove(&self, id: Uuid) -> Option<Recommendation> {
        let removed = self.write()?.remove(&id);
        if let Some(rec) = &removed {
            debug!(
                recommendation_id = %rec.id,
                transaction_id = %rec.transaction_id,
                "Recommendation removed"
            );
        }
        removed
    }

    pub fn summary(&self) -> RecommendationSummary {
        let mut summary = RecommendationSummary {
            total_recommendations: 0,
            total_potential_savings: 0.0,
            by_type: BTreeMap::new(),
            by_status: BTreeMap::new(),
            by_priority: BTreeMap::new(),
        };

        if let Some(map) = self.read() {
            for rec in map.values() {
                summary.total_recommendations += 1;
                summary.total_potential_savings += rec.estimated_savings;
                *summary.by_type.entry(rec.rec_type).or_insert(0) += 1;
                *summary.by_status.entry(rec.status).or_insert(0) += 1;
                *summary.by_priority.entry(rec.priority).or_insert(0) += 1;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rec(
        transaction_id: &str,
        department: &str,
        rec_type: RecommendationType,
        confidence: f64,
        savings: f64,
    ) -> Recommendation {
        Recommendation {
            id: Recommendation::make_id(transaction_id, rec_type),
            transaction_id: transaction_id.into(),
            department: department.into(),
            category: "IT Equipment".into(),
            rec_type,
            title: "title".into(),
            confidence,
            estimated_savings: savings,
            priority: if confidence >= 0.8 { Priority::High } else { Priority::Low },
            status: RecommendationStatus::Pending,
            explanation: "explanation".into(),
            suggested_action: "action".into(),
            feature_importance: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn store() -> RecommendationStore {
        let store = RecommendationStore::new();
        store.insert_batch(vec![
            rec("tx_1", "Parks", RecommendationType::SpendingAnomaly, 1.0, 750.0),
            rec("tx_1", "Parks", RecommendationType::VendorConsolidation, 0.67, 0.0),
            rec("tx_2", "Sanitation", RecommendationType::CostSaving, 0.4, 120.0),
        ]);
        store
    }

    #[test]
    fn test_get_hit_and_miss() {
        let store = store();
        let id = Recommendation::make_id("tx_2", RecommendationType::CostSaving);

        assert_eq!(store.get(id).unwrap().transaction_id, "tx_2");
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let store = store();

        let all = store.list(&RecommendationQuery::default());
        let confidences: Vec<f64> = all.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![1.0, 0.67, 0.4]);

        let tx_1 = store.list(&RecommendationQuery {
            transaction_id: Some("tx_1".into()),
            ..Default::default()
        });
        assert_eq!(tx_1.len(), 2);

        let confident = store.list(&RecommendationQuery {
            min_confidence: Some(0.5),
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(confident.len(), 1);
        assert_eq!(confident[0].rec_type, RecommendationType::SpendingAnomaly);

        let page = store.list(&RecommendationQuery {
            offset: Some(2),
            ..Default::default()
        });
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].transaction_id, "tx_2");
    }

    #[test]
    fn test_update_status() {
        let store = store();
        let id = Recommendation::make_id("tx_1", RecommendationType::SpendingAnomaly);

        let updated = store.update_status(id, RecommendationStatus::Implemented).unwrap();
        assert_eq!(updated.status, RecommendationStatus::Implemented);
        assert!(store
            .update_status(Uuid::new_v4(), RecommendationStatus::Rejected)
            .is_none());

        let pending = store.list(&RecommendationQuery {
            status: Some(RecommendationStatus::Pending),
            ..Default::default()
        });
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_summary() {
        let summary = store().summary();

        assert_eq!(summary.total_recommendations, 3);
        assert!((summary.total_potential_savings - 870.0).abs() < 1e-9);
        assert_eq!(summary.by_type[&RecommendationType::CostSaving], 1);
        assert_eq!(summary.by_status[&RecommendationStatus::Pending], 3);
        assert_eq!(summary.by_priority[&Priority::High], 1);
        assert_eq!(summary.by_priority[&Priority::Low], 2);
    }

    #[test]
    fn test_list_filters_by_department_and_category() {
        let store = store();
        store.insert_batch(vec![{
            let mut other = rec("tx_3", "Parks", RecommendationType::CostSaving, 0.9, 40.0);
            other.category = "Training".into();
            other
        }]);

        let parks = store.list(&RecommendationQuery {
            department: Some("Parks".into()),
            ..Default::default()
        });
        assert_eq!(parks.len(), 3);
        assert!(parks.iter().all(|r| r.department == "Parks"));

        let parks_it = store.list(&RecommendationQuery {
            department: Some("Parks".into()),
            category: Some("IT Equipment".into()),
            ..Default::default()
        });
        let ids: Vec<_> = parks_it.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["tx_1", "tx_1"]);

        let training = store.list(&RecommendationQuery {
            category: Some("Training".into()),
            ..Default::default()
        });
        assert_eq!(training.len(), 1);
        assert_eq!(training[0].transaction_id, "tx_3");

        assert!(store
            .list(&RecommendationQuery {
                department: Some("Libraries".into()),
                ..Default::default()
            })
            .is_empty());
    }

    #[test]
    fn test_remove_hit_and_miss() {
        let store = store();
        let id = Recommendation::make_id("tx_2", RecommendationType::CostSaving);

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.transaction_id, "tx_2");
        assert_eq!(store.len(), 2);
        assert!(store.get(id).is_none());

        assert!(store.remove(id).is_none());
        assert!(store.remove(Uuid::new_v4()).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_poisoned_lock_reads_as_empty() {
        let store = std::sync::Arc::new(store());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.recommendations.write().unwrap();
            panic!("writer panicked");
        })
        .join();

        assert!(store.recommendations.is_poisoned());
        assert_eq!(store.len(), 0);
        assert!(store.list(&RecommendationQuery::default()).is_empty());
        assert_eq!(store.insert_batch(Vec::new()), 0);
        assert!(store
            .remove(Recommendation::make_id("tx_1", RecommendationType::SpendingAnomaly))
            .is_none());
    }
}
