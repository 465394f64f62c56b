//! Throughput and output statistics for the recommendation pipeline.

use crate::types::recommendation::{Priority, Recommendation, RecommendationType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Records evaluated
    pub records_processed: AtomicU64,
    /// Records rejected by validation
    pub records_rejected: AtomicU64,
    /// Recommendations emitted
    pub recommendations_emitted: AtomicU64,
    by_type: RwLock<BTreeMap<RecommendationType, u64>>,
    by_priority: RwLock<BTreeMap<Priority, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            records_processed: AtomicU64::new(0),
            records_rejected: AtomicU64::new(0),
            recommendations_emitted: AtomicU64::new(0),
            by_type: RwLock::new(BTreeMap::new()),
            by_priority: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one evaluated record and what it produced.
    pub fn record_evaluation(&self, processing_time: Duration, recommendations: &[Recommendation]) {
        self.records_processed.fetch_add(1, Ordering::Relaxed);
        self.recommendations_emitted
            .fetch_add(recommendations.len() as u64, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if recommendations.is_empty() {
            return;
        }

        if let Ok(mut by_type) = self.by_type.write() {
            for rec in recommendations {
                *by_type.entry(rec.rec_type).or_insert(0) += 1;
            }
        }
        if let Ok(mut by_priority) = self.by_priority.write() {
            for rec in recommendations {
                *by_priority.entry(rec.priority).or_insert(0) += 1;
            }
        }
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            for rec in recommendations {
                let bucket = (rec.confidence * 10.0).clamp(0.0, 9.0) as usize;
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a record that failed validation.
    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Records per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_by_type(&self) -> BTreeMap<RecommendationType, u64> {
        self.by_type.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn get_by_priority(&self) -> BTreeMap<Priority, u64> {
        self.by_priority.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log a summary of everything recorded so far
    pub fn print_summary(&self) {
        let processed = self.records_processed.load(Ordering::Relaxed);
        let rejected = self.records_rejected.load(Ordering::Relaxed);
        let emitted = self.recommendations_emitted.load(Ordering::Relaxed);
        let per_record = if processed > 0 {
            emitted as f64 / processed as f64
        } else {
            0.0
        };

        let processing = self.get_processing_stats();

        info!(
            processed = processed,
            rejected = rejected,
            recommendations = emitted,
            per_record = format!("{:.2}", per_record),
            throughput = format!("{:.1} rec/s", self.get_throughput()),
            "Pipeline metrics summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Evaluation latency"
        );

        for (rec_type, count) in self.get_by_type() {
            info!(rec_type = %rec_type, count = count, "Recommendations by type");
        }
        for (priority, count) in self.get_by_priority() {
            info!(priority = %priority, count = count, "Recommendations by priority");
        }

        let distribution = self.get_confidence_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = (count as f64 / total as f64) * 100.0;
            info!(
                "Confidence {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
