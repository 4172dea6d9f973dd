use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_readings_total",
        "Total readings accepted on POST /data"
    ))
    .unwrap();
    pub static ref INVALID_READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_invalid_readings_total",
        "Total readings rejected by validation"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_store_failures_total",
        "Total failed database operations"
    ))
    .unwrap();
    pub static ref BROADCAST_DELIVERED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_broadcast_delivered_total",
        "Total readings queued to live viewers"
    ))
    .unwrap();
    pub static ref BROADCAST_SKIPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_broadcast_skipped_total",
        "Total deliveries skipped because the viewer was closed"
    ))
    .unwrap();
    pub static ref ALERTS_SENT_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_alerts_sent_total",
        "Total push alerts accepted by the provider"
    ))
    .unwrap();
    pub static ref ALERTS_FAILED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_alerts_failed_total",
        "Total push alerts that failed to send"
    ))
    .unwrap();
    pub static ref SWEEP_DELETED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "firewatch_sweep_deleted_total",
        "Total readings removed by the retention sweep"
    ))
    .unwrap();
    pub static ref VIEWER_CONNECTIONS: Gauge = Gauge::with_opts(Opts::new(
        "firewatch_viewer_connections",
        "Currently open viewer connections"
    ))
    .unwrap();
    pub static ref INGEST_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "firewatch_ingest_latency_seconds",
            "Time taken to store, broadcast and evaluate one reading"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(READINGS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(INVALID_READINGS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(BROADCAST_DELIVERED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(BROADCAST_SKIPPED_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(ALERTS_SENT_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(ALERTS_FAILED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SWEEP_DELETED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VIEWER_CONNECTIONS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(INGEST_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
