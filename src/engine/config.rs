//! Engine configuration.

use crate::error::{Error, Result};
use crate::observability::TracingConfig;

/// Order in which the two backlogs are serviced during a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainOrder {
    /// Always pop from the supply backlog while it is non-empty, then from
    /// the demand backlog.
    ///
    /// Supply entries are what move packets downstream, so this minimizes
    /// latency. Demand is not starved in a convergent acyclic graph: every
    /// supply entry consumes a packet that was produced in answer to demand,
    /// so the supply backlog empties.
    #[default]
    SupplyFirst,

    /// Take turns between the two backlogs, falling back to whichever is
    /// non-empty.
    Alternate,
}

/// Configuration for an [`Engine`](super::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name used in logs, spans and metric labels.
    pub name: String,

    /// Backlog service order.
    pub drain_order: DrainOrder,

    /// Stop a drain after this many updates, leaving the rest queued.
    ///
    /// `None` drains to quiescence. A limit is useful on a real-time thread
    /// that must bound the time spent per callback.
    pub max_updates_per_drain: Option<usize>,

    /// Span configuration.
    pub tracing: TracingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "engine".to_string(),
            drain_order: DrainOrder::default(),
            max_updates_per_drain: None,
            tracing: TracingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the drain order.
    pub fn with_drain_order(mut self, order: DrainOrder) -> Self {
        self.drain_order = order;
        self
    }

    /// Bound the number of updates per drain.
    pub fn with_max_updates_per_drain(mut self, limit: usize) -> Self {
        self.max_updates_per_drain = Some(limit);
        self
    }

    /// Set the span configuration.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidConfig("engine name must not be empty".into()));
        }
        if self.max_updates_per_drain == Some(0) {
            return Err(Error::InvalidConfig(
                "max_updates_per_drain must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
