//! Spending Recommender - Main Entry Point
//!
//! Loads the model artifact, consumes transaction records from NATS,
//! evaluates them in parallel and publishes recommendations.

use anyhow::{Context, Result};
use futures::StreamExt;
use spending_recommender::{
    config::{AppConfig, LoggingConfig},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    producer::RecommendationProducer,
    store::RecommendationStore,
    RecommendationEngine,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("spending_recommender={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Spending Recommender");
    info!("Configuration loaded successfully");

    // Statistics and thresholds travel together in the artifact
    let engine = RecommendationEngine::from_artifact(&config.artifact.path)
        .with_context(|| format!("Failed to load model artifact {}", config.artifact.path))?;
    let engine = Arc::new(engine);
    info!(
        detectors = ?engine.detector_names(),
        z_threshold = engine.config().anomaly.z_threshold,
        max_per_transaction = engine.config().aggregation.max_per_transaction,
        "Engine ready"
    );

    let metrics = Arc::new(PipelineMetrics::new());
    let store = Arc::new(RecommendationStore::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(RecommendationProducer::new(
        client.clone(),
        &config.nats.recommendation_subject,
    ));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        transactions = %config.nats.transaction_subject,
        recommendations = %config.nats.recommendation_subject,
        "Starting evaluation loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let metrics_clone = metrics.clone();
    let report_interval = config.pipeline.report_interval_secs;
    tokio::spawn(async move {
        MetricsReporter::new(metrics_clone, report_interval)
            .start()
            .await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let engine = engine.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let store = store.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            match TransactionConsumer::decode(&message.payload) {
                Ok(record) => {
                    let recommendations = engine.evaluate(&record);
                    metrics.record_evaluation(start_time.elapsed(), &recommendations);

                    if recommendations.is_empty() {
                        debug!(
                            transaction_id = %record.transaction_id,
                            "No recommendations"
                        );
                    } else {
                        let published = producer.publish_batch(&recommendations).await;
                        store.insert_batch(recommendations.iter().cloned());
                        info!(
                            transaction_id = %record.transaction_id,
                            published = published,
                            top_type = %recommendations[0].rec_type,
                            top_priority = %recommendations[0].priority,
                            "Recommendations published"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} rec/s", metrics.get_throughput()),
                            avg_latency_us = stats.mean_us,
                            "Processing milestone"
                        );
                    }
                }
                Err(e) => {
                    metrics.record_rejected();
                    warn!(error = %e, "Skipping invalid transaction record");
                }
            }

            drop(permit);
        });
    }

    error!("Transaction subscription closed");
    info!("Pipeline shutting down...");
    metrics.print_summary();

    let summary = store.summary();
    info!(
        recommendations = summary.total_recommendations,
        potential_savings = summary.total_potential_savings,
        by_type = ?summary.by_type,
        by_priority = ?summary.by_priority,
        "Recommendation store summary"
    );

    Ok(())
}
