//! Payload allocation for packets.
//!
//! Stages that care where their payload memory comes from (a hardware sink
//! that needs frames in a mapped region, a decoder that recycles buffers)
//! expose a [`PayloadAllocator`] when their input is prepared. Producers draw
//! payloads from it, and a [`Packet`](crate::packet::Packet) created with an
//! allocator hands its payload back when dropped.
//!
//! - [`PayloadAllocator`]: Trait for payload sources
//! - [`HeapAllocator`]: Plain heap allocation, release is a no-op
//! - [`PoolAllocator`]: Fixed-size reusable buffers with bounded capacity
//!
//! # Example
//!
//! ```rust
//! use demandflow::memory::{PayloadAllocator, PoolAllocator};
//!
//! let pool = PoolAllocator::new(4096, 8).unwrap();
//! let payload = pool.allocate(1024).unwrap();
//! assert_eq!(payload.len(), 1024);
//! assert_eq!(pool.available(), 7);
//!
//! pool.release(payload);
//! assert_eq!(pool.available(), 8);
//! ```

mod allocator;
mod payload_pool;

pub use allocator::{HeapAllocator, PayloadAllocator};
pub use payload_pool::{PoolAllocator, PoolStats};
