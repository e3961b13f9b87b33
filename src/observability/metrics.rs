//! Metrics collection using metrics-rs.

use crate::demand::Demand;
use metrics::{Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const STAGE_UPDATES: &str = "demandflow_stage_updates";
const PACKETS_SUPPLIED: &str = "demandflow_packets_supplied";
const BYTES_SUPPLIED: &str = "demandflow_bytes_supplied";
const DEMAND_CHANGES: &str = "demandflow_demand_changes";
const BACKLOG_DEPTH: &str = "demandflow_backlog_depth";
const DRAIN_TIME_NS: &str = "demandflow_drain_time_ns";
const POOL_AVAILABLE: &str = "demandflow_pool_available";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops). Every engine
/// calls it on construction.
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(STAGE_UPDATES, Unit::Count, "Stage updates run");
    metrics::describe_counter!(
        PACKETS_SUPPLIED,
        Unit::Count,
        "Packets moved from an output into its mate input"
    );
    metrics::describe_counter!(BYTES_SUPPLIED, Unit::Bytes, "Payload bytes supplied");
    metrics::describe_counter!(
        DEMAND_CHANGES,
        Unit::Count,
        "Demand values that changed on an output"
    );
    metrics::describe_gauge!(
        BACKLOG_DEPTH,
        Unit::Count,
        "Entries left in a backlog after a drain"
    );
    metrics::describe_histogram!(DRAIN_TIME_NS, Unit::Nanoseconds, "Wall time of one drain");
    metrics::describe_gauge!(POOL_AVAILABLE, Unit::Count, "Free buffers in a payload pool");
}

/// Record one stage update.
#[inline]
pub fn record_stage_update(engine: &str, stage: &str) {
    counter!(STAGE_UPDATES, "engine" => engine.to_string(), "stage" => stage.to_string())
        .increment(1);
}

/// Record a packet supplied by `stage`.
#[inline]
pub fn record_packet_supplied(engine: &str, stage: &str, bytes: usize) {
    counter!(PACKETS_SUPPLIED, "engine" => engine.to_string(), "stage" => stage.to_string())
        .increment(1);
    counter!(BYTES_SUPPLIED, "engine" => engine.to_string(), "stage" => stage.to_string())
        .increment(bytes as u64);
}

/// Record a demand change, labelled with the new value.
#[inline]
pub fn record_demand_change(engine: &str, demand: Demand) {
    counter!(DEMAND_CHANGES, "engine" => engine.to_string(), "demand" => demand.to_string())
        .increment(1);
}

/// Record a backlog's depth.
#[inline]
pub fn record_backlog_depth(engine: &str, backlog: &'static str, depth: usize) {
    gauge!(BACKLOG_DEPTH, "engine" => engine.to_string(), "backlog" => backlog)
        .set(depth as f64);
}

/// Record the duration of one drain.
#[inline]
pub fn record_drain_time(engine: &str, duration: Duration) {
    histogram!(DRAIN_TIME_NS, "engine" => engine.to_string()).record(duration.as_nanos() as f64);
}

/// Record free buffers in a payload pool.
#[inline]
pub fn record_pool_available(pool: &str, available: usize) {
    gauge!(POOL_AVAILABLE, "pool" => pool.to_string()).set(available as f64);
}
