//! Ports: the connection points of stages.
//!
//! Each stage has an ordered list of [`Input`]s and [`Output`]s. An input is
//! connected to exactly one output (its "mate") and an output is the mate of
//! at most one input. Packets move output → input; demand is set on the
//! input side and stored on the mate output, where the producer reads it.
//!
//! Ports are addressed with [`InputRef`] and [`OutputRef`]: small copyable
//! values naming a port index on a [`StageId`]. A reference never owns
//! anything. The stage id carries a generation, so a reference to a removed
//! stage is detected instead of silently resolving to whatever reuses the
//! slot.

use crate::demand::Demand;
use crate::memory::PayloadAllocator;
use crate::packet::Packet;
use std::sync::Arc;

/// Stable, generation-checked identifier of a stage in an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl StageId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot index.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Reference to input `index` of this stage.
    pub fn input(self, index: usize) -> InputRef {
        InputRef::new(self, index)
    }

    /// Reference to output `index` of this stage.
    pub fn output(self, index: usize) -> OutputRef {
        OutputRef::new(self, index)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage#{}v{}", self.index, self.generation)
    }
}

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// A consuming port.
    Input,
    /// A producing port.
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Names input `index` on `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputRef {
    /// Owning stage.
    pub stage: StageId,
    /// Port index on the stage.
    pub index: usize,
}

impl InputRef {
    /// Create an input reference.
    pub fn new(stage: StageId, index: usize) -> Self {
        Self { stage, index }
    }
}

/// Names output `index` on `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// Owning stage.
    pub stage: StageId,
    /// Port index on the stage.
    pub index: usize,
}

impl OutputRef {
    /// Create an output reference.
    pub fn new(stage: StageId, index: usize) -> Self {
        Self { stage, index }
    }
}

// ============================================================================
// Input
// ============================================================================

/// A consuming endpoint.
///
/// Holds at most one pending packet supplied by the mate output.
#[derive(Debug, Default)]
pub struct Input {
    packet_from_upstream: Option<Packet>,
    mate: Option<OutputRef>,
    prepared: bool,
}

impl Input {
    /// Create an unconnected input.
    pub fn new() -> Self {
        Self::default()
    }

    /// The connected output, if any.
    pub fn mate(&self) -> Option<OutputRef> {
        self.mate
    }

    /// Check if the input is connected.
    pub fn is_connected(&self) -> bool {
        self.mate.is_some()
    }

    /// Check if the input has been prepared.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn set_prepared(&mut self, prepared: bool) {
        self.prepared = prepared;
    }

    /// Bind this input to `output`.
    ///
    /// # Panics
    ///
    /// Panics if the input is already connected.
    pub fn connect(&mut self, output: OutputRef) {
        assert!(
            self.mate.is_none(),
            "input is already connected to {}:{}",
            self.mate.map(|m| m.stage.to_string()).unwrap_or_default(),
            self.mate.map(|m| m.index).unwrap_or_default(),
        );
        self.mate = Some(output);
    }

    /// Clear the connection, returning the former mate.
    pub(crate) fn disconnect(&mut self) -> Option<OutputRef> {
        self.mate.take()
    }

    /// The pending packet, if any.
    pub fn packet(&self) -> Option<&Packet> {
        self.packet_from_upstream.as_ref()
    }

    /// Check if a packet is pending.
    pub fn has_packet(&self) -> bool {
        self.packet_from_upstream.is_some()
    }

    /// Move the pending packet out of the slot.
    pub fn take_packet(&mut self) -> Option<Packet> {
        self.packet_from_upstream.take()
    }

    /// Move `packet` into the pending slot.
    ///
    /// # Panics
    ///
    /// Panics if the input is not connected, or if a packet is already
    /// pending (the producer ignored backpressure).
    pub fn supply_packet_from_output(&mut self, packet: Packet) {
        assert!(
            self.mate.is_some(),
            "packet supplied to an unconnected input"
        );
        assert!(
            self.packet_from_upstream.is_none(),
            "packet supplied to an input whose slot is occupied"
        );
        self.packet_from_upstream = Some(packet);
    }

    /// Discard any pending packet. Idempotent.
    pub fn flush(&mut self) {
        self.packet_from_upstream = None;
    }
}

// ============================================================================
// Output
// ============================================================================

/// A producing endpoint.
///
/// Mirrors the demand set on its mate input.
#[derive(Default)]
pub struct Output {
    demand: Demand,
    mate: Option<InputRef>,
    copy_allocator: Option<Arc<dyn PayloadAllocator>>,
}

impl Output {
    /// Create an unconnected output with negative demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current downstream demand.
    pub fn demand(&self) -> Demand {
        self.demand
    }

    /// The connected input, if any.
    pub fn mate(&self) -> Option<InputRef> {
        self.mate
    }

    /// Check if the output is connected.
    pub fn is_connected(&self) -> bool {
        self.mate.is_some()
    }

    /// Bind this output to `input`.
    ///
    /// # Panics
    ///
    /// Panics if the output is already the mate of an input.
    pub fn connect(&mut self, input: InputRef) {
        assert!(
            self.mate.is_none(),
            "output is already connected to an input"
        );
        self.mate = Some(input);
    }

    /// Clear the connection and reset demand, returning the former mate.
    pub(crate) fn disconnect(&mut self) -> Option<InputRef> {
        self.demand = Demand::Negative;
        self.copy_allocator = None;
        self.mate.take()
    }

    /// Record new demand from the mate input.
    ///
    /// Returns `true` if the stored value changed.
    pub fn update_demand(&mut self, demand: Demand) -> bool {
        if self.demand == demand {
            return false;
        }
        self.demand = demand;
        true
    }

    /// Allocator that supplied packets are copied into, if any.
    pub fn copy_allocator(&self) -> Option<&Arc<dyn PayloadAllocator>> {
        self.copy_allocator.as_ref()
    }

    pub(crate) fn set_copy_allocator(&mut self, allocator: Option<Arc<dyn PayloadAllocator>>) {
        self.copy_allocator = allocator;
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("demand", &self.demand)
            .field("mate", &self.mate)
            .field(
                "copy_allocator",
                &self.copy_allocator.as_ref().map(|a| a.name().to_string()),
            )
            .finish()
    }
}

/// Check if any output in `outputs` has positive demand.
pub fn has_positive_demand(outputs: &[Output]) -> bool {
    outputs.iter().any(|o| o.demand().wants_production())
}
