//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Configuration for tracing behavior.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to create a span around each drain.
    pub drain_spans: bool,
    /// Whether to create a span around each stage update.
    pub stage_spans: bool,
    /// Level the drain and stage spans are created at.
    pub level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            drain_spans: true,
            stage_spans: false, // One per update, can be expensive
            level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing config with all spans enabled.
    pub fn all() -> Self {
        Self {
            drain_spans: true,
            stage_spans: true,
            level: Level::DEBUG,
        }
    }

    /// Disable all spans.
    pub fn none() -> Self {
        Self {
            drain_spans: false,
            stage_spans: false,
            level: Level::INFO,
        }
    }
}

// `span!` needs a constant level, so dispatch on the runtime one.
macro_rules! span_at {
    ($level:expr, $($rest:tt)+) => {{
        let level = $level;
        if level == Level::TRACE {
            span!(Level::TRACE, $($rest)+)
        } else if level == Level::DEBUG {
            span!(Level::DEBUG, $($rest)+)
        } else if level == Level::INFO {
            span!(Level::INFO, $($rest)+)
        } else if level == Level::WARN {
            span!(Level::WARN, $($rest)+)
        } else {
            span!(Level::ERROR, $($rest)+)
        }
    }};
}

/// Create a span for one drain of an engine.
///
/// # Example
///
/// ```rust,ignore
/// use demandflow::observability::span_drain;
/// use tracing::Level;
///
/// let span = span_drain("render", Level::INFO);
/// let _guard = span.enter();
/// // Updates here...
/// ```
#[inline]
pub fn span_drain(engine: &str, level: Level) -> Span {
    span_at!(level, "drain", engine = %engine)
}

/// Create a span for one stage update.
#[inline]
pub fn span_stage(engine: &str, stage: &str, level: Level) -> Span {
    span_at!(level, "stage_update", engine = %engine, stage = %stage)
}

/// Log a stage reaching end of stream.
#[inline]
pub fn trace_eos(engine: &str, stage: &str) {
    tracing::info!(engine = %engine, stage = %stage, "end of stream");
}
