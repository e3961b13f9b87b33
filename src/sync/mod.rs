//! Cross-thread primitives for collaborators of the engine.
//!
//! - [`ParamCell`]: Lock-free single-writer `f32` parameter
//! - [`Notification`] / [`SharedNotification`]: One-shot events
//!
//! # Example
//!
//! ```rust
//! use demandflow::sync::{ParamCell, SharedNotification};
//!
//! let (gain, reader) = ParamCell::new(1.0);
//! gain.set(0.5);
//! assert_eq!(reader.get(), 0.5);
//!
//! let ready = SharedNotification::new();
//! ready.when_fired(|| println!("device ready"));
//! assert!(ready.fire());
//! ```

mod notify;
mod param;

pub use notify::{Notification, SharedNotification};
pub use param::{ParamCell, ParamReader, ParamWriter};
