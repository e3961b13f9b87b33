//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters, gauges, and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `demandflow_stage_updates` | Counter | Stage updates run |
//! | `demandflow_packets_supplied` | Counter | Packets moved between stages |
//! | `demandflow_bytes_supplied` | Counter | Payload bytes moved between stages |
//! | `demandflow_demand_changes` | Counter | Demand values that changed |
//! | `demandflow_backlog_depth` | Gauge | Entries left after a drain |
//! | `demandflow_drain_time_ns` | Histogram | Wall time of one drain |
//! | `demandflow_pool_available` | Gauge | Free buffers in a payload pool |
//!
//! Nothing is exported unless the application installs a `metrics` recorder.
//!
//! ## Tracing
//!
//! Engines emit a span per drain and, with
//! [`TracingConfig::stage_spans`], a span per stage update. Queueing is
//! logged at `trace`, graph edits at `debug`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use demandflow::engine::{Engine, EngineConfig};
//! use demandflow::observability::TracingConfig;
//!
//! let config = EngineConfig::named("render").with_tracing(TracingConfig::all());
//! let engine = Engine::with_config(config)?;
//! ```

mod metrics;
mod tracing_support;

pub use metrics::{
    init_metrics, record_backlog_depth, record_demand_change, record_drain_time,
    record_packet_supplied, record_pool_available, record_stage_update,
};
pub use tracing_support::{TracingConfig, span_drain, span_stage, trace_eos};
