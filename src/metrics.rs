//! Prometheus metrics collection for giveawayd.
//!
//! Exposed on the `/metrics` HTTP endpoint (see [`crate::http`]).
//!
//! - `giveaway_created_total` - Give-aways successfully created
//! - `giveaway_entries_total` - Successful entries
//! - `giveaway_closed_total{outcome}` - Closes by outcome
//! - `giveaway_rerolls_total` - Rerolls drawn
//! - `giveaway_active` - Live give-aways in the registry
//! - `giveaway_interaction_total{kind}` / `giveaway_interaction_duration_seconds{kind}`
//! - `giveaway_interaction_errors_total{kind,error}`

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{Once, OnceLock};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static GIVEAWAYS_CREATED: OnceLock<IntCounter> = OnceLock::new();

pub static ENTRIES: OnceLock<IntCounter> = OnceLock::new();

pub static LEAVES: OnceLock<IntCounter> = OnceLock::new();

/// Closes by outcome (`winners`, `no_participants`, `message_missing`).
pub static CLOSED: OnceLock<IntCounterVec> = OnceLock::new();

pub static REROLLS: OnceLock<IntCounter> = OnceLock::new();

/// Best-effort writes that failed, by store operation.
pub static STORE_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Gateway calls that failed, by call.
pub static RENDER_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

pub static ACTIVE_GIVEAWAYS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Interactions
// ========================================================================

pub static INTERACTION_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static INTERACTION_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Rejected interactions by kind and error code.
pub static INTERACTION_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize the Prometheus metrics registry.
///
/// Call at startup before any metrics are recorded; later calls are no-ops.
/// Recording before `init` is a silent no-op.
pub fn init() {
    INIT.call_once(register_all);
}

fn register_all() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(metric = stringify!($metric), error = %e, "Failed to register metric");
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(metric = stringify!($metric), error = %e, "Failed to create metric");
                }
            }
        };
    }

    register!(GIVEAWAYS_CREATED, IntCounter::new("giveaway_created_total", "Give-aways created"));
    register!(ENTRIES, IntCounter::new("giveaway_entries_total", "Successful give-away entries"));
    register!(LEAVES, IntCounter::new("giveaway_leaves_total", "Participants removed from give-aways"));
    register!(CLOSED, IntCounterVec::new(Opts::new("giveaway_closed_total", "Give-aways closed by outcome"), &["outcome"]));
    register!(REROLLS, IntCounter::new("giveaway_rerolls_total", "Reroll winners drawn"));
    register!(STORE_FAILURES, IntCounterVec::new(Opts::new("giveaway_store_failures_total", "Failed persistence writes"), &["operation"]));
    register!(RENDER_FAILURES, IntCounterVec::new(Opts::new("giveaway_render_failures_total", "Failed gateway calls"), &["call"]));
    register!(ACTIVE_GIVEAWAYS, IntGauge::new("giveaway_active", "Live give-aways"));

    register!(INTERACTION_COUNTER, IntCounterVec::new(Opts::new("giveaway_interaction_total", "Interactions handled by kind"), &["kind"]));
    register!(INTERACTION_LATENCY, HistogramVec::new(
        HistogramOpts::new("giveaway_interaction_duration_seconds", "Interaction latency by kind")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"]));
    register!(INTERACTION_ERRORS, IntCounterVec::new(Opts::new("giveaway_interaction_errors_total", "Rejected interactions by kind"), &["kind", "error"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
fn inc_labeled(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

#[inline]
pub fn record_created() {
    inc(&GIVEAWAYS_CREATED);
}

#[inline]
pub fn record_entry() {
    inc(&ENTRIES);
}

#[inline]
pub fn record_leave() {
    inc(&LEAVES);
}

#[inline]
pub fn record_close(outcome: &str) {
    inc_labeled(&CLOSED, &[outcome]);
}

#[inline]
pub fn record_reroll() {
    inc(&REROLLS);
}

#[inline]
pub fn record_store_failure(operation: &str) {
    inc_labeled(&STORE_FAILURES, &[operation]);
}

#[inline]
pub fn record_render_failure(call: &str) {
    inc_labeled(&RENDER_FAILURES, &[call]);
}

#[inline]
pub fn set_active_giveaways(count: usize) {
    if let Some(g) = ACTIVE_GIVEAWAYS.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Record a handled interaction with latency.
#[inline]
pub fn record_interaction(kind: &str, duration_secs: f64) {
    inc_labeled(&INTERACTION_COUNTER, &[kind]);
    if let Some(h) = INTERACTION_LATENCY.get() {
        h.with_label_values(&[kind]).observe(duration_secs);
    }
}

/// Record a rejected interaction.
#[inline]
pub fn record_interaction_error(kind: &str, error: &str) {
    inc_labeled(&INTERACTION_ERRORS, &[kind, error]);
}
