//! Sample Spending Producer
//!
//! Generates spending records and publishes them to NATS for pipeline
//! testing. Falls back to printing records when NATS is unreachable, and
//! can write a JSONL file suitable for `build-artifact`.
//!
//! Usage: sample-producer [nats url] [subject] [count] [outlier rate] [delay ms] [--jsonl <path>]

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use rand::Rng;
use spending_recommender::TransactionRecord;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

const DEPARTMENTS: &[&str] = &["Technology", "HR", "Finance", "Operations", "Public Works"];
const BOROUGHS: &[&str] = &["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"];
const VENDORS: &[&str] = &[
    "Acme Inc.",
    "Tech Solutions",
    "Office Supplies Co",
    "City Services",
    "Global Tech",
];

/// Categories with a typical amount range
const CATEGORIES: &[(&str, f64, f64)] = &[
    ("Software", 500.0, 5000.0),
    ("Hardware", 1000.0, 8000.0),
    ("Services", 2000.0, 15000.0),
    ("Office Supplies", 50.0, 800.0),
    ("Training", 300.0, 3000.0),
];

/// Spending record generator
struct SpendingGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
    today: NaiveDate,
}

impl SpendingGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
            today: Utc::now().date_naive(),
        }
    }

    /// Generate a record within the category's usual range
    fn generate_typical(&mut self) -> TransactionRecord {
        let (category, low, high) = CATEGORIES[self.rng.gen_range(0..CATEGORIES.len())];
        let amount = self.rng.gen_range(low..high);
        self.build(category, amount)
    }

    /// Generate a record far above the category's usual range
    fn generate_outlier(&mut self) -> TransactionRecord {
        let (category, _, high) = CATEGORIES[self.rng.gen_range(0..CATEGORIES.len())];
        let amount = self.rng.gen_range(high * 3.0..high * 10.0);
        self.build(category, amount)
    }

    fn build(&mut self, category: &str, amount: f64) -> TransactionRecord {
        self.counter += 1;
        let date = self.today - ChronoDuration::days(self.rng.gen_range(0..365));

        let mut record = TransactionRecord::new(
            format!("txn_{:08}", self.counter),
            self.random_choice(DEPARTMENTS),
            category,
            self.random_choice(VENDORS),
            (amount * 100.0).round() / 100.0,
            date,
        );
        record.user_id = format!("user_{}", self.rng.gen_range(1..200));
        record.borough = self.random_choice(BOROUGHS).to_string();
        if self.rng.gen_bool(0.3) {
            record.project_name = Some(format!("Project {}", self.rng.gen_range(1..20)));
        }
        record
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    fn next(&mut self, outlier_rate: f64) -> (TransactionRecord, bool) {
        if self.rng.gen_bool(outlier_rate) {
            (self.generate_outlier(), true)
        } else {
            (self.generate_typical(), false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_producer=info".parse()?),
        )
        .init();

    info!("Starting Sample Spending Producer");

    let mut args: Vec<String> = std::env::args().collect();
    let jsonl_path = match args.iter().position(|a| a == "--jsonl") {
        Some(idx) => {
            let path = args.get(idx + 1).cloned();
            args.drain(idx..(idx + 2).min(args.len()));
            path
        }
        None => None,
    };

    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("spending.transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let outlier_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.05)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    if let Some(path) = jsonl_path {
        return write_jsonl(&path, count, outlier_rate);
    }

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        outlier_rate = outlier_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, outlier_rate, delay_ms).await;
        }
    };

    let mut generator = SpendingGenerator::new();
    let mut typical_count = 0;
    let mut outlier_count = 0;

    info!("Starting to publish {} records...", count);

    for i in 0..count {
        let (record, outlier) = generator.next(outlier_rate);
        if outlier {
            outlier_count += 1;
        } else {
            typical_count += 1;
        }

        let payload = serde_json::to_vec(&record)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} records ({} typical, {} outliers)",
                i + 1,
                count,
                typical_count,
                outlier_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} records ({} typical, {} outliers)",
        count, typical_count, outlier_count
    );

    Ok(())
}

/// Write `count` records as JSON lines for artifact building
fn write_jsonl(path: &str, count: u64, outlier_rate: f64) -> anyhow::Result<()> {
    let mut generator = SpendingGenerator::new();
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);

    for _ in 0..count {
        let (record, _) = generator.next(outlier_rate);
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(path = %path, count = count, "Wrote sample records");
    Ok(())
}

async fn run_dry_mode(count: u64, outlier_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = SpendingGenerator::new();

    for i in 0..count {
        let (record, _) = generator.next(outlier_rate);
        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample record {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
