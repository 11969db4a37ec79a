// Prometheus metrics for quota enforcement
//
// Exposes metrics on the /metrics HTTP endpoint:
// - Quota decisions by action and outcome (counter)
// - Stored counter records (gauge)
// - Staleness sweeps and records removed (counters)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref QUOTA_DECISIONS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("quota_decisions_total", "Total number of quota checks by outcome"),
        &["action", "outcome"]
    ).expect("Failed to create quota decisions metric");

    pub static ref QUOTA_STORED_COUNTERS: IntGauge = IntGauge::new(
        "quota_stored_counters",
        "Counter records held in memory, including expired ones not yet swept"
    ).expect("Failed to create stored counters metric");

    pub static ref QUOTA_SWEEPS_TOTAL: IntCounter = IntCounter::new(
        "quota_sweeps_total",
        "Total number of expired-counter sweeps"
    ).expect("Failed to create sweeps metric");

    pub static ref QUOTA_SWEPT_RECORDS_TOTAL: IntCounter = IntCounter::new(
        "quota_swept_records_total",
        "Total number of expired counter records removed"
    ).expect("Failed to create swept records metric");
}

/// Initialize metrics registry - must be called once at startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(QUOTA_DECISIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_STORED_COUNTERS.clone()))?;
    REGISTRY.register(Box::new(QUOTA_SWEEPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_SWEPT_RECORDS_TOTAL.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
