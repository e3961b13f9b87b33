//! Fixed-capacity payload pool.
//!
//! The pool pre-allocates `capacity` buffers of `buffer_size` bytes. Packets
//! drawn from it return their payload when dropped, so memory use is bounded
//! and buffers are reused instead of reallocated each frame.
//!
//! Unlike a blocking pool, exhaustion is reported as [`Error::PoolExhausted`].
//! The engine never blocks inside an update; a producer that cannot get a
//! buffer simply does not produce on this pass.

use super::PayloadAllocator;
use crate::error::{Error, Result};
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Statistics about pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total buffers owned by the pool.
    pub capacity: usize,
    /// Buffers currently available.
    pub available: usize,
    /// Buffers currently lent out.
    pub in_use: usize,
    /// Successful allocations.
    pub allocations: u64,
    /// Allocations refused because the pool was empty.
    pub exhausted: u64,
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// A pool of equally sized, reusable payload buffers.
///
/// Each pool has a name, used in logs and as the `pool` label of the
/// `demandflow_pool_available` gauge. It defaults to `pool-<n>`, unique
/// within the process.
pub struct PoolAllocator {
    name: String,
    buffer_size: usize,
    capacity: usize,
    free: Mutex<Vec<BytesMut>>,
    allocations: AtomicU64,
    exhausted: AtomicU64,
}

impl PoolAllocator {
    /// Create a pool of `capacity` buffers, each `buffer_size` bytes.
    pub fn new(buffer_size: usize, capacity: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::AllocationFailed("buffer size must be non-zero".into()));
        }
        if capacity == 0 {
            return Err(Error::AllocationFailed("pool capacity must be non-zero".into()));
        }

        let free = (0..capacity)
            .map(|_| BytesMut::with_capacity(buffer_size))
            .collect();

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            name: format!("pool-{}", id),
            buffer_size,
            capacity,
            free: Mutex::new(free),
            allocations: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
        })
    }

    /// Replace the generated name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Size of each buffer in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Total number of buffers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently available.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Snapshot of pool statistics.
    pub fn stats(&self) -> PoolStats {
        let available = self.available();
        PoolStats {
            capacity: self.capacity,
            available,
            in_use: self.capacity - available,
            allocations: self.allocations.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

impl PayloadAllocator for PoolAllocator {
    fn allocate(&self, size: usize) -> Result<BytesMut> {
        if size > self.buffer_size {
            return Err(Error::AllocationFailed(format!(
                "requested {} bytes from a pool of {}-byte buffers",
                size, self.buffer_size
            )));
        }

        let buffer = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        match buffer {
            Some(mut buffer) => {
                buffer.clear();
                buffer.resize(size, 0);
                self.allocations.fetch_add(1, Ordering::Relaxed);
                Ok(buffer)
            }
            None => {
                self.exhausted.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    "payload pool '{}' exhausted ({} buffers)",
                    self.name,
                    self.capacity
                );
                Err(Error::PoolExhausted)
            }
        }
    }

    fn release(&self, mut payload: BytesMut) {
        // Buffers that were split or shrunk below the pool size are dropped
        // and replaced so every pooled buffer keeps the full capacity.
        if payload.capacity() < self.buffer_size {
            payload = BytesMut::with_capacity(self.buffer_size);
        }
        payload.clear();

        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(payload);
            crate::observability::record_pool_available(self.name(), free.len());
        } else {
            tracing::warn!("payload released to full pool '{}'; dropping it", self.name);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("name", &self.name)
            .field("buffer_size", &self.buffer_size)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
