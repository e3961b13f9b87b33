//! Sink adapter.

use crate::demand::Demand;
use crate::memory::PayloadAllocator;
use crate::observability;
use crate::packet::Packet;
use crate::stage::{Stage, UpdateContext};
use std::sync::Arc;

/// Opaque platform output: a device, a window, a file.
pub trait FrameSink: Send {
    /// Take a packet.
    fn accept(&mut self, packet: Packet);

    /// How much more the sink wants. Read after every update and applied to
    /// the sink stage's input.
    fn demand(&self) -> Demand {
        Demand::Positive
    }
}

/// One input, no outputs.
///
/// Takes every packet as soon as it arrives and hands it to the
/// [`FrameSink`]. After end of stream the input demand is negative.
pub struct SinkStage<F> {
    sink: F,
    allocator: Option<Arc<dyn PayloadAllocator>>,
    accepted: u64,
    finished: bool,
}

impl<F: FrameSink> SinkStage<F> {
    /// Create a sink stage.
    pub fn new(sink: F) -> Self {
        Self {
            sink,
            allocator: None,
            accepted: 0,
            finished: false,
        }
    }

    /// Offer `allocator` to upstream stages when the input is prepared.
    pub fn with_allocator(mut self, allocator: Arc<dyn PayloadAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Packets accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Check if end of stream was accepted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<F: FrameSink> Stage for SinkStage<F> {
    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        0
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if let Some(packet) = ctx.take_packet(0, true) {
            if packet.is_end_of_stream() {
                self.finished = true;
                observability::trace_eos(ctx.engine_name(), ctx.stage_name());
            }
            self.sink.accept(packet);
            self.accepted += 1;
        }

        let demand = if self.finished {
            Demand::Negative
        } else {
            self.sink.demand()
        };
        ctx.set_demand(0, demand);
    }

    fn prepare_input(&mut self, _index: usize) -> Option<Arc<dyn PayloadAllocator>> {
        self.allocator.clone()
    }

    fn name(&self) -> &str {
        "sink"
    }
}
