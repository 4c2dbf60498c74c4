//! Test Receipt Producer
//!
//! Generates synthetic receipt submissions and publishes them to NATS for
//! pipeline testing.

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use receipt_fraud_pipeline::types::{ReceiptField, ReceiptSubmission};
use std::time::Duration;
use tracing::{info, warn};

const EMPLOYEES: [&str; 4] = [
    "alex@example.com",
    "sam@example.com",
    "jordan@example.com",
    "casey@example.com",
];

const MANAGERS: [&str; 2] = ["manager-1", "manager-2"];

/// Receipt generator for testing
struct ReceiptGenerator {
    rng: rand::rngs::ThreadRng,
    receipt_counter: u64,
}

impl ReceiptGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            receipt_counter: 0,
        }
    }

    /// Ordinary business expense
    fn generate_legitimate(&mut self) -> ReceiptSubmission {
        let vendor = self.random_choice(&[
            "Office Depot",
            "City Cabs",
            "Corner Cafe",
            "Staples",
            "Grand Hotel",
        ]);
        let amount = self.rng.gen_range(5.0..450.0);
        let date = self.random_date();
        let payment = self.random_choice(&["Visa", "Amex", "Cash"]);

        self.submission(vec![
            ReceiptField::new("Vendor", vendor),
            ReceiptField::new("Date", date),
            ReceiptField::new("Total Amount", format!("${:.2}", amount)),
            ReceiptField::new("Payment Method", payment),
        ])
    }

    /// Receipt that trips one or more rules
    fn generate_suspicious(&mut self) -> ReceiptSubmission {
        let vendor = self.random_choice(&["Velvet Lounge", "Downtown Bar & Grill", "Club 21"]);
        let amount = self.rng.gen_range(520.0..4000.0);

        let mut fields = vec![
            ReceiptField::new("Vendor", vendor),
            ReceiptField::new("Total Amount", format!("${:.2}", amount)),
        ];
        // Sometimes the date is missing altogether
        if self.rng.gen_bool(0.5) {
            fields.push(ReceiptField::new("Date", "Date not found"));
        } else {
            fields.push(ReceiptField::new("Date", self.random_date()));
        }

        self.submission(fields)
    }

    fn submission(&mut self, fields: Vec<ReceiptField>) -> ReceiptSubmission {
        self.receipt_counter += 1;
        let file_name = format!("receipt_{:08}.jpg", self.receipt_counter);

        let mut submission = ReceiptSubmission::new(
            file_name.clone(),
            format!("receipts/{}", file_name),
            fields,
            self.random_choice(&EMPLOYEES),
        );
        submission.id = Some(uuid::Uuid::new_v4().to_string());
        submission.supervisor_id = Some(self.random_choice(&MANAGERS).to_string());
        submission
    }

    fn random_date(&mut self) -> String {
        let days_ago = self.rng.gen_range(0..60);
        (Utc::now() - ChronoDuration::days(days_ago))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Positional arguments: `[nats_url] [subject] [count] [fraud_rate] [delay_ms]`
#[derive(Debug, Clone, PartialEq)]
struct ProducerArgs {
    nats_url: String,
    subject: String,
    count: u64,
    /// Share of suspicious receipts, within [0, 1]
    fraud_rate: f64,
    delay: Duration,
}

impl ProducerArgs {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let arg = |i: usize| args.get(i).map(String::as_str);

        let count: u64 = match arg(2) {
            Some(raw) => raw.parse().with_context(|| format!("invalid count {raw:?}"))?,
            None => 100,
        };
        let fraud_rate: f64 = match arg(3) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid fraud rate {raw:?}"))?,
            None => 0.2,
        };
        anyhow::ensure!(
            (0.0..=1.0).contains(&fraud_rate),
            "fraud rate must be within [0, 1], got {fraud_rate}"
        );
        let delay_ms: u64 = match arg(4) {
            Some(raw) => raw.parse().with_context(|| format!("invalid delay {raw:?}"))?,
            None => 100,
        };

        Ok(Self {
            nats_url: arg(0).unwrap_or("nats://localhost:4222").to_string(),
            subject: arg(1).unwrap_or("receipts.submitted").to_string(),
            count,
            fraud_rate,
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = ProducerArgs::parse(&argv)?;
    info!(
        nats_url = %args.nats_url,
        subject = %args.subject,
        count = args.count,
        fraud_rate = args.fraud_rate,
        delay_ms = args.delay.as_millis(),
        "Starting test receipt producer"
    );

    // Without a server the receipts are only logged
    let client = match async_nats::connect(args.nats_url.as_str()).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "NATS unreachable, running in dry-run mode");
            None
        }
    };

    let mut generator = ReceiptGenerator::new();
    let mut rng = rand::thread_rng();
    let (mut legitimate, mut suspicious) = (0u64, 0u64);

    for i in 1..=args.count {
        let submission = if rng.gen_bool(args.fraud_rate) {
            suspicious += 1;
            generator.generate_suspicious()
        } else {
            legitimate += 1;
            generator.generate_legitimate()
        };

        match &client {
            Some(client) => {
                let payload = serde_json::to_vec(&submission)?;
                client.publish(args.subject.clone(), payload.into()).await?;
            }
            None if i == 1 || i % 10 == 0 => {
                info!("Sample receipt {}:\n{}", i, serde_json::to_string_pretty(&submission)?);
            }
            None => {}
        }

        if i % 10 == 0 {
            info!(sent = i, legitimate, suspicious, "Progress");
        }
        tokio::time::sleep(args.delay).await;
    }

    if let Some(client) = &client {
        client.flush().await?;
    }
    info!(legitimate, suspicious, dry_run = client.is_none(), "Done");

    Ok(())
}
