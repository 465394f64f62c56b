//! Cohort statistics over a batch of transaction records.
//!
//! Records are grouped by (department, category) and by (department, vendor).
//! The resulting [`CohortStatistics`] is an immutable value shared by every
//! detector during evaluation.

use crate::error::InsufficientDataError;
use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Per-vendor share of a (department, category) cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorShare {
    pub count: u64,
    pub total: f64,
}

impl VendorShare {
    /// Mean amount per transaction with this vendor.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Descriptive statistics for one (department, category) cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub count: u64,
    pub total: f64,
    pub mean: f64,
    /// Population standard deviation, 0 for singleton cohorts
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub vendors: BTreeMap<String, VendorShare>,
}

impl CohortSummary {
    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    /// Vendor with the lowest mean amount; ties go to the first name.
    pub fn cheapest_vendor(&self) -> Option<&str> {
        let mut cheapest: Option<(&str, f64)> = None;
        for (name, share) in &self.vendors {
            let mean = share.mean();
            match cheapest {
                Some((_, best)) if mean >= best => {}
                _ => cheapest = Some((name.as_str(), mean)),
            }
        }
        cheapest.map(|(name, _)| name)
    }

    /// False when any amount-derived value overflowed.
    pub fn is_finite(&self) -> bool {
        [
            self.total,
            self.mean,
            self.std_dev,
            self.median,
            self.min,
            self.max,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.vendors.values().all(|v| v.total.is_finite())
    }
}

/// Descriptive statistics for one (department, vendor) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub count: u64,
    pub total: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl VendorSummary {
    pub fn is_finite(&self) -> bool {
        self.total.is_finite() && self.mean.is_finite() && self.std_dev.is_finite()
    }
}

/// Statistics for a whole batch, keyed department -> category / vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CohortStatistics {
    pub cohorts: BTreeMap<String, BTreeMap<String, CohortSummary>>,
    pub vendors: BTreeMap<String, BTreeMap<String, VendorSummary>>,
    /// Records that contributed to the statistics
    pub record_count: u64,
    /// Records skipped because they failed validation or fell in a cohort
    /// whose statistics overflowed
    pub skipped_count: u64,
}

impl CohortStatistics {
    /// Statistics for a (department, category) cohort.
    pub fn cohort(&self, department: &str, category: &str) -> Option<&CohortSummary> {
        self.cohorts.get(department)?.get(category)
    }

    /// Statistics for a (department, vendor) group.
    pub fn vendor(&self, department: &str, vendor: &str) -> Option<&VendorSummary> {
        self.vendors.get(department)?.get(vendor)
    }

    /// Number of (department, category) cohorts.
    pub fn cohort_count(&self) -> usize {
        self.cohorts.values().map(BTreeMap::len).sum()
    }

    /// True when every stored statistic is a finite number.
    pub fn is_finite(&self) -> bool {
        self.cohorts
            .values()
            .flat_map(BTreeMap::values)
            .all(CohortSummary::is_finite)
            && self
                .vendors
                .values()
                .flat_map(BTreeMap::values)
                .all(VendorSummary::is_finite)
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    amounts: Vec<f64>,
    vendors: BTreeMap<String, VendorShare>,
}

impl Accumulator {
    fn push(&mut self, amount: f64) {
        self.sum += amount;
        self.amounts.push(amount);
    }

    /// (count, mean, std_dev) over the collected amounts.
    fn moments(&self) -> (u64, f64, f64) {
        let count = self.amounts.len();
        let mean = self.sum / count as f64;
        if count < 2 {
            return (count as u64, mean, 0.0);
        }
        let variance =
            self.amounts.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        (count as u64, mean, variance.sqrt())
    }

    fn into_cohort_summary(mut self) -> CohortSummary {
        let (count, mean, std_dev) = self.moments();
        self.amounts.sort_by(f64::total_cmp);

        let mid = self.amounts.len() / 2;
        let median = if self.amounts.len() % 2 == 0 {
            (self.amounts[mid - 1] + self.amounts[mid]) / 2.0
        } else {
            self.amounts[mid]
        };

        CohortSummary {
            count,
            total: self.sum,
            mean,
            std_dev,
            median,
            min: self.amounts[0],
            max: self.amounts[self.amounts.len() - 1],
            vendors: self.vendors,
        }
    }

    fn into_vendor_summary(self) -> VendorSummary {
        let (count, mean, std_dev) = self.moments();
        VendorSummary {
            count,
            total: self.sum,
            mean,
            std_dev,
        }
    }
}

/// Build cohort statistics from a batch of records.
///
/// Invalid records are skipped and logged. Fails when the batch is empty or
/// no record survives validation.
pub fn build_statistics(
    records: &[TransactionRecord],
) -> Result<CohortStatistics, InsufficientDataError> {
    if records.is_empty() {
        return Err(InsufficientDataError::new(
            "cannot build statistics from an empty batch",
        ));
    }

    let mut by_category: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    let mut by_vendor: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    let mut record_count = 0u64;
    let mut skipped_count = 0u64;

    for record in records {
        if let Err(e) = record.validate() {
            warn!(
                transaction_id = %record.transaction_id,
                error = %e,
                "Skipping invalid record"
            );
            skipped_count += 1;
            continue;
        }
        record_count += 1;

        let cohort = by_category
            .entry((record.department.as_str(), record.category.as_str()))
            .or_default();
        cohort.push(record.amount);
        let share = cohort
            .vendors
            .entry(record.vendor.clone())
            .or_insert(VendorShare { count: 0, total: 0.0 });
        share.count += 1;
        share.total += record.amount;

        by_vendor
            .entry((record.department.as_str(), record.vendor.as_str()))
            .or_default()
            .push(record.amount);
    }

    if record_count == 0 {
        return Err(InsufficientDataError::new(format!(
            "all {} records failed validation",
            skipped_count
        )));
    }

    let mut statistics = CohortStatistics {
        record_count,
        skipped_count,
        ..Default::default()
    };

    for ((department, category), acc) in by_category {
        let summary = acc.into_cohort_summary();
        if !summary.is_finite() {
            warn!(
                department = %department,
                category = %category,
                count = summary.count,
                "Skipping cohort with non-finite statistics"
            );
            statistics.record_count -= summary.count;
            statistics.skipped_count += summary.count;
            continue;
        }
        debug!(
            department = %department,
            category = %category,
            count = summary.count,
            mean = summary.mean,
            std_dev = summary.std_dev,
            vendors = summary.vendor_count(),
            "Cohort built"
        );
        statistics
            .cohorts
            .entry(department.to_string())
            .or_default()
            .insert(category.to_string(), summary);
    }

    for ((department, vendor), acc) in by_vendor {
        let summary = acc.into_vendor_summary();
        if !summary.is_finite() {
            warn!(
                department = %department,
                vendor = %vendor,
                "Skipping vendor group with non-finite statistics"
            );
            continue;
        }
        statistics
            .vendors
            .entry(department.to_string())
            .or_default()
            .insert(vendor.to_string(), summary);
    }

    if statistics.cohorts.is_empty() {
        return Err(InsufficientDataError::new(
            "every cohort overflowed; amounts are too large to summarise",
        ));
    }

    info!(
        records = record_count,
        skipped = skipped_count,
        cohorts = statistics.cohort_count(),
        "Cohort statistics built"
    );

    Ok(statistics)
}
