//! # demandflow
//!
//! A demand-driven media processing graph.
//!
//! Stages are connected output-to-input. Packets flow downstream one at a
//! time per connection, while demand (`Negative`, `Neutral`, `Positive`)
//! flows upstream and tells producers when to produce. A single-threaded
//! engine keeps two backlogs of stages to update (supply and demand) and
//! drains them until nothing is left to do.
//!
//! ## Features
//!
//! - **Bounded buffering**: every input holds at most one packet
//! - **Exclusive ownership**: a packet is moved, never shared, between stages
//! - **Allocator negotiation**: consumers can offer payload allocators upstream
//! - **Generation-checked handles**: stale stage and port references are caught
//! - **Cross-thread wakeups**: other threads request updates through a channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use demandflow::prelude::*;
//!
//! let mut engine = Engine::new();
//! let src = engine.add_stage("src", SourceStage::new(IterSource::new(packets)));
//! let sink = engine.add_stage("sink", SinkStage::new(device));
//! engine.connect(src.output(0), sink.input(0));
//! engine.validate()?;
//!
//! engine.request_update(sink);
//! engine.drain();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod demand;
pub mod engine;
pub mod error;
pub mod memory;
pub mod observability;
pub mod packet;
pub mod stage;
pub mod stages;
pub mod sync;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::demand::Demand;
    pub use crate::engine::{DrainOrder, Engine, EngineConfig, UpdateRequester};
    pub use crate::error::{Error, Result};
    pub use crate::memory::{HeapAllocator, PayloadAllocator, PoolAllocator};
    pub use crate::packet::{Packet, PacketMeta};
    pub use crate::stage::{InputRef, OutputRef, Stage, StageId, UpdateContext};
    pub use crate::stages::{
        FrameSink, IterSource, PacketSource, PacketTransform, SinkStage, SourceStage,
        TransformStage,
    };
}

pub use error::{Error, Result};
