//! Source adapter.

use crate::memory::PayloadAllocator;
use crate::observability;
use crate::packet::Packet;
use crate::stage::{Stage, UpdateContext};
use std::sync::Arc;

/// Something that produces packets on request.
pub trait PacketSource: Send {
    /// Produce the next packet.
    ///
    /// `None` means nothing is available right now. The source is asked
    /// again on its next update; a source waiting on another thread should
    /// request that update through an
    /// [`UpdateRequester`](crate::engine::UpdateRequester).
    fn next_packet(&mut self) -> Option<Packet>;

    /// Offer the allocator the downstream stage prepared its input with.
    ///
    /// Return `true` to allocate payloads from it directly. Otherwise the
    /// engine copies every packet into it.
    fn use_allocator(&mut self, allocator: Arc<dyn PayloadAllocator>) -> bool {
        let _ = allocator;
        false
    }
}

/// Wraps an iterator of packets.
///
/// # Example
///
/// ```rust
/// use demandflow::packet::Packet;
/// use demandflow::stages::{IterSource, SourceStage};
///
/// let packets = (0..4).map(|i| Packet::new(i, vec![0u8; 16].as_slice()));
/// let stage = SourceStage::new(IterSource::new(packets));
/// ```
#[derive(Debug)]
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    /// Wrap `iter`.
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> PacketSource for IterSource<I>
where
    I: Iterator<Item = Packet> + Send,
{
    fn next_packet(&mut self) -> Option<Packet> {
        self.iter.next()
    }
}

/// Zero inputs, one output.
///
/// Produces while the output demand is positive and the downstream slot is
/// free. A packet produced while the slot is occupied is held until it can
/// be supplied. Production stops after an end-of-stream packet.
pub struct SourceStage<S> {
    source: S,
    pending: Option<Packet>,
    finished: bool,
    produced: u64,
}

impl<S: PacketSource> SourceStage<S> {
    /// Create a source stage.
    pub fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
            finished: false,
            produced: 0,
        }
    }

    /// Packets supplied so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Check if end of stream was produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<S: PacketSource> Stage for SourceStage<S> {
    fn input_count(&self) -> usize {
        0
    }

    fn output_count(&self) -> usize {
        1
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let demand = ctx.output_demand(0);

        if self.pending.is_none() && !self.finished && demand.wants_production() {
            if let Some(packet) = self.source.next_packet() {
                if packet.is_end_of_stream() {
                    self.finished = true;
                    observability::trace_eos(ctx.engine_name(), ctx.stage_name());
                }
                self.pending = Some(packet);
            }
        }

        if demand.allows_supply() && ctx.can_supply(0) {
            if let Some(packet) = self.pending.take() {
                ctx.supply_packet(0, packet);
                self.produced += 1;
            }
        }
    }

    fn prepare_output(
        &mut self,
        _index: usize,
        allocator: Option<&Arc<dyn PayloadAllocator>>,
        _upstream: &mut dyn FnMut(usize),
    ) -> bool {
        allocator.is_some_and(|allocator| self.source.use_allocator(allocator.clone()))
    }

    fn flush_output(&mut self, _index: usize) {
        self.pending = None;
    }

    fn name(&self) -> &str {
        "source"
    }
}
