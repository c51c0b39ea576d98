//! Telemetry counters for the audit engine.
//!
//! Process-wide counters and latency aggregates that the CLI can print after a run. Only
//! counts live here; analysis state (statistics, selection cache) is per run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static RULE_RUN_TOTAL: AtomicU64 = AtomicU64::new(0);
static RULE_RUN_LAT_NS: AtomicU64 = AtomicU64::new(0);
static RULE_RUN_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);

static CHECK_TOTAL: AtomicU64 = AtomicU64::new(0);

static SELECT_CACHE_HIT: AtomicU64 = AtomicU64::new(0);
static SELECT_CACHE_MISS: AtomicU64 = AtomicU64::new(0);

static LOCATOR_TOTAL: AtomicU64 = AtomicU64::new(0);
static STATISTICS_BUILDS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheMetric {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    pub rule_runs: MetricCounter,
    pub check_evaluations: u64,
    pub select_cache: CacheMetric,
    pub locator_requests: u64,
    pub statistics_builds: u64,
}

pub fn record_rule_run(duration: Duration) {
    RULE_RUN_TOTAL.fetch_add(1, Ordering::Relaxed);
    record_latency(&RULE_RUN_LAT_NS, &RULE_RUN_LAT_SAMPLES, duration);
}

pub fn record_check() {
    CHECK_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_select(cache_hit: bool) {
    if cache_hit {
        SELECT_CACHE_HIT.fetch_add(1, Ordering::Relaxed);
    } else {
        SELECT_CACHE_MISS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_locator() {
    LOCATOR_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_statistics_build() {
    STATISTICS_BUILDS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricSnapshot {
    MetricSnapshot {
        rule_runs: make_counter(
            RULE_RUN_TOTAL.load(Ordering::Relaxed),
            RULE_RUN_LAT_NS.load(Ordering::Relaxed),
            RULE_RUN_LAT_SAMPLES.load(Ordering::Relaxed),
        ),
        check_evaluations: CHECK_TOTAL.load(Ordering::Relaxed),
        select_cache: make_cache_metric(
            SELECT_CACHE_HIT.load(Ordering::Relaxed),
            SELECT_CACHE_MISS.load(Ordering::Relaxed),
        ),
        locator_requests: LOCATOR_TOTAL.load(Ordering::Relaxed),
        statistics_builds: STATISTICS_BUILDS.load(Ordering::Relaxed),
    }
}

fn make_counter(total: u64, nanos: u64, samples: u64) -> MetricCounter {
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (nanos as f64 / samples as f64) / 1_000_000.0
    };
    MetricCounter { total, avg_ms }
}

fn make_cache_metric(hits: u64, misses: u64) -> CacheMetric {
    let total = hits + misses;
    let hit_rate = if total == 0 {
        0.0
    } else {
        hits as f64 * 100.0 / total as f64
    };
    CacheMetric {
        hits,
        misses,
        hit_rate,
    }
}

fn record_latency(total_ns: &AtomicU64, samples: &AtomicU64, duration: Duration) {
    let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    total_ns.fetch_add(nanos, Ordering::Relaxed);
    samples.fetch_add(1, Ordering::Relaxed);
}
