mod telemetry;

use clap::Parser;
use rand::Rng;
use std::time::Duration;
use telemetry::Telemetry;
use tracing::{error, info, warn};

/// Posts synthetic smoke/temperature readings to a Firewatch server
#[derive(Debug, Parser)]
#[command(name = "simulator", version)]
struct Args {
    /// Base URL of the server
    #[arg(long, env = "FIREWATCH_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Readings per second across all devices
    #[arg(long, env = "RATE", default_value_t = 10)]
    rate: u64,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 5)]
    devices: usize,

    /// Probability that a reading carries a fire-like spike
    #[arg(long, env = "SPIKE_PROBABILITY", default_value_t = 0.02)]
    spike_probability: f64,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if args.rate == 0 || args.devices == 0 {
        error!("RATE and DEVICES must be greater than zero");
        std::process::exit(1);
    }

    info!("Starting device simulator");
    info!(
        "Target: {}, Rate: {} readings/s, Devices: {}",
        args.url, args.rate, args.devices
    );

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let endpoint = format!("{}/data", args.url.trim_end_matches('/'));
    let mut ticker = tokio::time::interval(Duration::from_micros((1_000_000 / args.rate).max(1)));
    let mut counter = 0u64;
    let mut failures = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping after {} readings ({} failed)", counter, failures);
                break;
            }
        }

        let device_id = format!("dev-{}", counter % args.devices as u64);
        let telemetry = generate_telemetry(&mut rand::thread_rng(), device_id, args.spike_probability);

        match client.post(&endpoint).json(&telemetry).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                failures += 1;
                warn!("Server rejected reading from {}: HTTP {}", telemetry.device_id, response.status());
            }
            Err(e) => {
                failures += 1;
                warn!("Failed to post reading: {}", e);
            }
        }
        counter += 1;

        // Log progress periodically
        if counter % 100 == 0 {
            info!("Posted {} readings ({} failed)", counter, failures);
        }
    }
}

fn generate_telemetry(rng: &mut impl Rng, device_id: String, spike_probability: f64) -> Telemetry {
    if rng.gen_bool(spike_probability.clamp(0.0, 1.0)) {
        // Fire-like spike
        return Telemetry {
            device_id,
            temperature: rng.gen_range(45.0..90.0),
            smoke: rng.gen_range(20.0..200.0),
        };
    }

    Telemetry {
        device_id,
        temperature: rng.gen_range(18.0..28.0),
        smoke: rng.gen_range(0.0..5.0),
    }
}
