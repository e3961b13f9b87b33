//! Engine statistics.

use std::time::Duration;

/// Counters accumulated over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Completed drains.
    pub drains: u64,
    /// Drains stopped by the update limit before quiescence.
    pub saturated_drains: u64,
    /// Stage updates run from the supply backlog.
    pub supply_updates: u64,
    /// Stage updates run from the demand backlog.
    pub demand_updates: u64,
    /// Packets moved from an output into an input.
    pub packets_supplied: u64,
    /// Demand changes that reached an output.
    pub demand_changes: u64,
    /// Entries pushed into the supply backlog (after dedupe).
    pub supply_pushes: u64,
    /// Entries pushed into the demand backlog (after dedupe).
    pub demand_pushes: u64,
    /// Wall time of the most recent drain.
    pub last_drain_time: Duration,
}

impl EngineStats {
    /// Total stage updates.
    pub fn updates(&self) -> u64 {
        self.supply_updates + self.demand_updates
    }
}

/// Outcome of a single [`Engine::drain`](super::Engine::drain).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Updates run from the supply backlog.
    pub supply_updates: usize,
    /// Updates run from the demand backlog.
    pub demand_updates: usize,
    /// The update limit was hit; work remains queued.
    pub saturated: bool,
}

impl DrainReport {
    /// Total updates run.
    pub fn updates(&self) -> usize {
        self.supply_updates + self.demand_updates
    }
}
