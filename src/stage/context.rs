//! Update context.
//!
//! The context is what a stage sees of the engine while its update runs: its
//! own ports, and the two operations that reach a neighbour (supplying a
//! packet downstream and setting demand upstream).

use super::{Input, InputRef, Output, OutputRef, StageId};
use crate::demand::Demand;
use crate::engine::arena::{Arena, StageNode};
use crate::engine::backlog::Backlogs;
use crate::engine::ops;
use crate::packet::Packet;

/// A stage's view of the engine during [`Stage::update`](super::Stage::update).
pub struct UpdateContext<'a> {
    id: StageId,
    engine: &'a str,
    arena: &'a mut Arena,
    backlogs: &'a mut Backlogs,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(
        id: StageId,
        engine: &'a str,
        arena: &'a mut Arena,
        backlogs: &'a mut Backlogs,
    ) -> Self {
        Self {
            id,
            engine,
            arena,
            backlogs,
        }
    }

    fn node(&self) -> &StageNode {
        self.arena.node(self.id)
    }

    /// Id of the stage being updated.
    pub fn stage_id(&self) -> StageId {
        self.id
    }

    /// Name of the engine running the update.
    pub fn engine_name(&self) -> &str {
        self.engine
    }

    /// Name the stage was added with.
    pub fn stage_name(&self) -> &str {
        &self.node().name
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.node().inputs.len()
    }

    /// Number of outputs.
    pub fn output_count(&self) -> usize {
        self.node().outputs.len()
    }

    /// Input `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn input(&self, index: usize) -> &Input {
        self.arena.input(self.id.input(index))
    }

    /// Output `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn output(&self, index: usize) -> &Output {
        self.arena.output(self.id.output(index))
    }

    /// All outputs.
    pub fn outputs(&self) -> &[Output] {
        &self.node().outputs
    }

    /// Check if input `index` holds a packet.
    pub fn has_packet(&self, index: usize) -> bool {
        self.input(index).has_packet()
    }

    /// Take the packet pending on input `index`.
    ///
    /// With `request_another` and a packet taken, the upstream stage is queued
    /// for demand so it can refill the slot.
    pub fn take_packet(&mut self, index: usize, request_another: bool) -> Option<Packet> {
        ops::take_packet(
            self.arena,
            self.backlogs,
            self.id.input(index),
            request_another,
        )
    }

    /// Set the demand on input `index`.
    ///
    /// If the value changed, the upstream stage is queued for demand.
    pub fn set_demand(&mut self, index: usize, demand: Demand) {
        ops::set_demand(
            self.arena,
            self.backlogs,
            self.engine,
            self.id.input(index),
            demand,
        );
    }

    /// Demand currently seen on output `index`.
    pub fn output_demand(&self, index: usize) -> Demand {
        self.output(index).demand()
    }

    /// Check if any output has positive demand.
    pub fn has_positive_demand(&self) -> bool {
        super::has_positive_demand(self.outputs())
    }

    /// Check if output `index` is connected and the downstream slot is empty.
    pub fn can_supply(&self, index: usize) -> bool {
        ops::can_supply(self.arena, self.id.output(index))
    }

    /// Supply `packet` on output `index`.
    ///
    /// The packet moves into the downstream input and the downstream stage is
    /// queued for supply.
    ///
    /// # Panics
    ///
    /// Panics if the output is unconnected or the downstream slot is
    /// occupied. Check [`can_supply`](Self::can_supply) first.
    pub fn supply_packet(&mut self, index: usize, packet: Packet) {
        ops::supply_packet(
            self.arena,
            self.backlogs,
            self.engine,
            self.id.output(index),
            packet,
        );
    }

    /// Queue this stage for another update in the current drain.
    pub fn request_update(&mut self) {
        self.backlogs.push_supply(self.arena, self.id);
    }

    /// Raw reference to input `index`, for logging or bookkeeping.
    pub fn input_ref(&self, index: usize) -> InputRef {
        self.id.input(index)
    }

    /// Raw reference to output `index`.
    pub fn output_ref(&self, index: usize) -> OutputRef {
        self.id.output(index)
    }
}

impl std::fmt::Debug for UpdateContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateContext")
            .field("stage", &self.id)
            .field("engine", &self.engine)
            .finish()
    }
}
