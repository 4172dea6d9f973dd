//! Throughput tests against a running server.
//!
//! Start the server first (`STORE=memory` is enough), then run
//! `cargo test --test load_test -- --ignored`.

use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

const BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sample {
    device_id: String,
    temperature: f64,
    smoke: f64,
}

impl Sample {
    fn random(device_id: String) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            device_id,
            temperature: rng.gen_range(15.0..35.0),
            smoke: rng.gen_range(0.0..5.0),
        }
    }
}

async fn send_burst(
    client: &reqwest::Client,
    start: usize,
    count: usize,
    devices: usize,
) -> (usize, usize) {
    let mut set = JoinSet::new();
    for i in start..start + count {
        let client = client.clone();
        let sample = Sample::random(format!("load-test-dev-{}", i % devices));
        set.spawn(async move {
            client
                .post(format!("{}/data", BASE_URL))
                .json(&sample)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false)
        });
    }

    let mut ok = 0;
    let mut failed = 0;
    while let Some(result) = set.join_next().await {
        match result {
            Ok(true) => ok += 1,
            _ => failed += 1,
        }
    }
    (ok, failed)
}

#[tokio::test]
#[ignore]
async fn test_500_readings_per_second() {
    println!("\nStarting load test: 500 readings/s for 10s");

    let target_rate = 500;
    let test_duration_secs = 10;
    let total = target_rate * test_duration_secs;
    let burst_size = 50;
    let delay_per_burst = Duration::from_micros((burst_size * 1_000_000 / target_rate) as u64);

    let client = reqwest::Client::new();
    let start = Instant::now();
    let mut sent = 0;
    let mut errors = 0;

    for batch_start in (0..total).step_by(burst_size) {
        let burst_start = Instant::now();
        let (ok, failed) = send_burst(&client, batch_start, burst_size, 10).await;
        sent += ok;
        errors += failed;

        let elapsed = burst_start.elapsed();
        if elapsed < delay_per_burst {
            tokio::time::sleep(delay_per_burst - elapsed).await;
        }
    }

    let duration = start.elapsed();
    let rate = sent as f64 / duration.as_secs_f64();
    println!("  Sent:     {}", sent);
    println!("  Errors:   {}", errors);
    println!("  Duration: {:.2}s", duration.as_secs_f64());
    println!("  Rate:     {:.2} readings/s", rate);

    assert!(rate >= 450.0, "Throughput too low: {:.2} readings/s", rate);
    assert_eq!(errors, 0, "Too many errors: {}", errors);
}

#[tokio::test]
#[ignore]
async fn test_history_query_under_load() {
    let client = reqwest::Client::new();
    let (ok, failed) = send_burst(&client, 0, 200, 5).await;
    assert_eq!(failed, 0);
    assert_eq!(ok, 200);

    let start = Instant::now();
    let readings: Vec<serde_json::Value> = client
        .get(format!("{}/data/load-test-dev-0", BASE_URL))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    println!(
        "Fetched {} readings in {:.3}s",
        readings.len(),
        start.elapsed().as_secs_f64()
    );
    assert!(readings.len() >= 40);
}
