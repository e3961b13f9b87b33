//! Transform adapter.

use crate::demand::Demand;
use crate::packet::Packet;
use crate::stage::{Stage, UpdateContext};

/// One packet in, at most one packet out.
pub trait PacketTransform: Send {
    /// Transform `packet`. `None` drops it.
    fn transform(&mut self, packet: Packet) -> Option<Packet>;
}

impl<F> PacketTransform for F
where
    F: FnMut(Packet) -> Option<Packet> + Send,
{
    fn transform(&mut self, packet: Packet) -> Option<Packet> {
        self(packet)
    }
}

/// One input, one output.
///
/// A packet is taken only once the output can accept the result, so at most
/// one packet waits in front of the stage. While a packet waits the input
/// demand is negative; otherwise the output demand is mirrored upstream.
/// End-of-stream packets are forwarded without transformation.
///
/// # Example
///
/// ```rust
/// use demandflow::packet::Packet;
/// use demandflow::stages::TransformStage;
///
/// // Drop empty packets.
/// let filter = TransformStage::new(|p: Packet| (!p.is_empty()).then_some(p));
/// ```
pub struct TransformStage<T> {
    transform: T,
    processed: u64,
    dropped: u64,
}

impl<T: PacketTransform> TransformStage<T> {
    /// Create a transform stage.
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            processed: 0,
            dropped: 0,
        }
    }

    /// Packets transformed and supplied.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Packets the transform dropped.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<T: PacketTransform> Stage for TransformStage<T> {
    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        1
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if ctx.has_packet(0) && ctx.can_supply(0) && ctx.output_demand(0).allows_supply() {
            if let Some(packet) = ctx.take_packet(0, true) {
                if packet.is_end_of_stream() {
                    ctx.supply_packet(0, packet);
                } else if let Some(out) = self.transform.transform(packet) {
                    ctx.supply_packet(0, out);
                    self.processed += 1;
                } else {
                    self.dropped += 1;
                    tracing::trace!("'{}' dropped a packet", ctx.stage_name());
                }
            }
        }

        let demand = if ctx.has_packet(0) {
            Demand::Negative
        } else {
            ctx.output_demand(0)
        };
        ctx.set_demand(0, demand);
    }

    fn name(&self) -> &str {
        "transform"
    }
}
