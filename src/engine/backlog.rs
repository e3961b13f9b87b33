//! The supply and demand backlogs.
//!
//! Both backlogs deduplicate through flags on the stage node: a stage that is
//! already queued for a reason is not queued again for that reason. Popping
//! clears the flag, so a stage may re-queue itself (or be re-queued by a
//! neighbour) while its update runs.
//!
//! The supply backlog is FIFO so packets move downstream in the order they
//! were produced. The demand backlog is LIFO so a demand change propagates
//! depth-first up the chain that caused it before siblings are revisited.

use super::EngineStats;
use super::arena::Arena;
use super::config::DrainOrder;
use crate::observability;
use crate::stage::StageId;
use std::collections::VecDeque;

/// Which backlog an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogKind {
    /// An input of the stage received a packet.
    Supply,
    /// Demand on an output of the stage changed, or its downstream slot freed.
    Demand,
}

#[derive(Debug, Default)]
pub(crate) struct Backlogs {
    supply: VecDeque<StageId>,
    demand: Vec<StageId>,
    last: Option<BacklogKind>,
    pub(crate) stats: EngineStats,
}

impl Backlogs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the stage was not already queued for supply.
    pub(crate) fn push_supply(&mut self, arena: &mut Arena, id: StageId) -> bool {
        let node = arena.node_mut(id);
        if node.in_supply_backlog {
            return false;
        }
        node.in_supply_backlog = true;
        self.supply.push_back(id);
        self.stats.supply_pushes += 1;
        tracing::trace!("'{}' queued for supply", node.name);
        true
    }

    /// Returns `true` if the stage was not already queued for demand.
    pub(crate) fn push_demand(&mut self, arena: &mut Arena, id: StageId) -> bool {
        let node = arena.node_mut(id);
        if node.in_demand_backlog {
            return false;
        }
        node.in_demand_backlog = true;
        self.demand.push(id);
        self.stats.demand_pushes += 1;
        tracing::trace!("'{}' queued for demand", node.name);
        true
    }

    /// Pop the next entry according to `order`, clearing its flag.
    pub(crate) fn pop(
        &mut self,
        arena: &mut Arena,
        order: DrainOrder,
    ) -> Option<(StageId, BacklogKind)> {
        let supply_first = match order {
            DrainOrder::SupplyFirst => true,
            DrainOrder::Alternate => self.last != Some(BacklogKind::Supply),
        };

        let popped = if supply_first {
            self.pop_supply(arena).or_else(|| self.pop_demand(arena))
        } else {
            self.pop_demand(arena).or_else(|| self.pop_supply(arena))
        };

        if let Some((_, kind)) = popped {
            self.last = Some(kind);
        }
        popped
    }

    fn pop_supply(&mut self, arena: &mut Arena) -> Option<(StageId, BacklogKind)> {
        let id = self.supply.pop_front()?;
        if let Some(node) = arena.get_mut(id) {
            node.in_supply_backlog = false;
        }
        Some((id, BacklogKind::Supply))
    }

    fn pop_demand(&mut self, arena: &mut Arena) -> Option<(StageId, BacklogKind)> {
        let id = self.demand.pop()?;
        if let Some(node) = arena.get_mut(id) {
            node.in_demand_backlog = false;
        }
        Some((id, BacklogKind::Demand))
    }

    /// Drop every entry for `id`.
    pub(crate) fn purge(&mut self, id: StageId) {
        self.supply.retain(|&queued| queued != id);
        self.demand.retain(|&queued| queued != id);
    }

    pub(crate) fn supply_len(&self) -> usize {
        self.supply.len()
    }

    pub(crate) fn demand_len(&self) -> usize {
        self.demand.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.supply.is_empty() && self.demand.is_empty()
    }

    pub(crate) fn record_depth(&self, engine: &str) {
        observability::record_backlog_depth(engine, "supply", self.supply.len());
        observability::record_backlog_depth(engine, "demand", self.demand.len());
    }
}
