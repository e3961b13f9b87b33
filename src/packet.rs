//! Packets: the unit of media data moved between stages.
//!
//! A packet is exclusively owned. It is not `Clone`; handing it to an output
//! moves it into the connected input, and taking it from the input moves it
//! into the consuming stage. There is never more than one owner, so a packet
//! is never read by two stages at once.
//!
//! # Example
//!
//! ```rust
//! use demandflow::packet::Packet;
//!
//! let packet = Packet::new(1_000, b"pcm".as_slice()).with_sequence(7);
//! assert_eq!(packet.size(), 3);
//! assert_eq!(packet.meta().sequence, 7);
//! assert!(!packet.is_end_of_stream());
//!
//! let eos = Packet::end_of_stream(2_000);
//! assert!(eos.is_end_of_stream());
//! assert_eq!(eos.size(), 0);
//! ```

use crate::error::Result;
use crate::memory::PayloadAllocator;
use bytes::BytesMut;
use std::sync::Arc;

/// Metadata carried alongside a packet's payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketMeta {
    /// Presentation timestamp, in the stream's time base.
    pub pts: i64,

    /// The packet marks the end of its stream.
    pub end_of_stream: bool,

    /// Sequence number set by the producer.
    pub sequence: u64,

    /// Stream identifier for multi-stream producers.
    pub stream_id: Option<u64>,
}

/// An exclusively-owned unit of payload plus metadata.
pub struct Packet {
    meta: PacketMeta,
    payload: BytesMut,
    /// Where the payload came from; it goes back there on drop.
    allocator: Option<Arc<dyn PayloadAllocator>>,
}

impl Packet {
    /// Create a packet with a heap payload.
    pub fn new(pts: i64, payload: impl Into<BytesMut>) -> Self {
        Self {
            meta: PacketMeta {
                pts,
                ..Default::default()
            },
            payload: payload.into(),
            allocator: None,
        }
    }

    /// Create a packet whose payload was drawn from `allocator`.
    ///
    /// The payload is released back to the allocator when the packet drops.
    pub fn with_allocator(
        pts: i64,
        payload: BytesMut,
        allocator: Arc<dyn PayloadAllocator>,
    ) -> Self {
        Self {
            meta: PacketMeta {
                pts,
                ..Default::default()
            },
            payload,
            allocator: Some(allocator),
        }
    }

    /// Create an empty end-of-stream packet.
    pub fn end_of_stream(pts: i64) -> Self {
        Self {
            meta: PacketMeta {
                pts,
                end_of_stream: true,
                ..Default::default()
            },
            payload: BytesMut::new(),
            allocator: None,
        }
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.meta.sequence = sequence;
        self
    }

    /// Set the stream identifier.
    pub fn with_stream_id(mut self, stream_id: u64) -> Self {
        self.meta.stream_id = Some(stream_id);
        self
    }

    /// Mark this packet as the last of its stream.
    pub fn with_end_of_stream(mut self) -> Self {
        self.meta.end_of_stream = true;
        self
    }

    /// Get the packet metadata.
    pub fn meta(&self) -> &PacketMeta {
        &self.meta
    }

    /// Get mutable packet metadata.
    pub fn meta_mut(&mut self) -> &mut PacketMeta {
        &mut self.meta
    }

    /// Presentation timestamp.
    pub fn pts(&self) -> i64 {
        self.meta.pts
    }

    /// Check if this packet ends its stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.meta.end_of_stream
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as a byte slice.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as a mutable byte slice.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    /// Check if the payload belongs to an allocator.
    pub fn has_allocator(&self) -> bool {
        self.allocator.is_some()
    }

    /// Take the payload out of the packet.
    ///
    /// The payload is detached from its allocator and will not be returned
    /// to it.
    pub fn into_payload(mut self) -> BytesMut {
        self.allocator = None;
        std::mem::take(&mut self.payload)
    }

    /// Copy this packet into a payload drawn from `allocator`.
    ///
    /// Metadata is preserved. The original packet is left untouched.
    pub fn copy_into(&self, allocator: &Arc<dyn PayloadAllocator>) -> Result<Packet> {
        let mut payload = allocator.allocate(self.payload.len())?;
        payload.copy_from_slice(&self.payload);
        Ok(Packet {
            meta: self.meta.clone(),
            payload,
            allocator: Some(Arc::clone(allocator)),
        })
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        if let Some(allocator) = self.allocator.take() {
            allocator.release(std::mem::take(&mut self.payload));
        }
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("pts", &self.meta.pts)
            .field("sequence", &self.meta.sequence)
            .field("end_of_stream", &self.meta.end_of_stream)
            .field("size", &self.payload.len())
            .field(
                "allocator",
                &self.allocator.as_ref().map(|a| a.name().to_string()),
            )
            .finish()
    }
}
