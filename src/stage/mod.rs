//! Stages and ports.
//!
//! - [`Stage`]: The processing-node contract (update, prepare, unprepare,
//!   flush)
//! - [`Input`] / [`Output`]: Consuming and producing ports
//! - [`InputRef`] / [`OutputRef`] / [`StageId`]: Generation-checked handles
//! - [`UpdateContext`]: What a stage sees of the engine while updating
//!
//! # Example
//!
//! ```rust
//! use demandflow::demand::Demand;
//! use demandflow::stage::{Stage, UpdateContext};
//!
//! /// Passes packets through unchanged.
//! struct Relay;
//!
//! impl Stage for Relay {
//!     fn input_count(&self) -> usize {
//!         1
//!     }
//!
//!     fn output_count(&self) -> usize {
//!         1
//!     }
//!
//!     fn update(&mut self, ctx: &mut UpdateContext<'_>) {
//!         if ctx.has_packet(0) && ctx.can_supply(0) {
//!             if let Some(packet) = ctx.take_packet(0, true) {
//!                 ctx.supply_packet(0, packet);
//!             }
//!         }
//!         let demand = if ctx.has_packet(0) {
//!             Demand::Negative
//!         } else {
//!             ctx.output_demand(0)
//!         };
//!         ctx.set_demand(0, demand);
//!     }
//! }
//! ```

mod context;
mod port;
mod traits;

pub use context::UpdateContext;
pub use port::{
    Input, InputRef, Output, OutputRef, PortDirection, StageId, has_positive_demand,
};
pub use traits::{SchedulingState, Stage};
