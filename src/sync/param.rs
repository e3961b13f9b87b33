//! Lock-free parameter cell.
//!
//! A control thread sets a value (gain, pan, playback rate) and the thread
//! driving the engine reads it during updates without taking a lock. The
//! `f32` is stored as its bit pattern in an `AtomicU32`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Shared storage behind a [`ParamWriter`] and its readers.
#[derive(Debug)]
pub struct ParamCell {
    bits: AtomicU32,
}

impl ParamCell {
    /// Create a cell holding `value`, returning its single writer and a
    /// reader.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(value: f32) -> (ParamWriter, ParamReader) {
        let cell = Arc::new(Self {
            bits: AtomicU32::new(value.to_bits()),
        });
        (
            ParamWriter { cell: cell.clone() },
            ParamReader { cell },
        )
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// The one handle allowed to change a parameter. Not `Clone`.
#[derive(Debug)]
pub struct ParamWriter {
    cell: Arc<ParamCell>,
}

impl ParamWriter {
    /// Publish a new value.
    #[inline]
    pub fn set(&self, value: f32) {
        self.cell.store(value);
    }

    /// The last published value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.cell.load()
    }

    /// Create another reader.
    pub fn reader(&self) -> ParamReader {
        ParamReader {
            cell: self.cell.clone(),
        }
    }
}

/// Read-only handle to a parameter.
#[derive(Debug, Clone)]
pub struct ParamReader {
    cell: Arc<ParamCell>,
}

impl ParamReader {
    /// The last published value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.cell.load()
    }
}
