//! The payload allocator trait and the default heap allocator.

use crate::error::Result;
use bytes::BytesMut;

/// A source of payload buffers.
///
/// Allocators are shared between the stage that provides them and the
/// packets drawn from them, so they must be `Send + Sync`.
pub trait PayloadAllocator: Send + Sync {
    /// Allocate a zero-filled payload of exactly `size` bytes.
    fn allocate(&self, size: usize) -> Result<BytesMut>;

    /// Return a payload previously obtained from [`allocate`](Self::allocate).
    fn release(&self, payload: BytesMut);

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Allocates payloads on the heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    /// Create a heap allocator.
    pub fn new() -> Self {
        Self
    }
}

impl PayloadAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Result<BytesMut> {
        Ok(BytesMut::zeroed(size))
    }

    fn release(&self, _payload: BytesMut) {}

    fn name(&self) -> &str {
        "heap"
    }
}
