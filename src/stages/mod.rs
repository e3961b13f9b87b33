//! Generic stage adapters.
//!
//! Concrete processing (decoding, mixing, device output) lives outside the
//! crate. These adapters turn small collaborator traits into full
//! [`Stage`](crate::stage::Stage)s that follow the demand protocol:
//!
//! | Adapter | Collaborator | Ports |
//! |---------|--------------|-------|
//! | [`SourceStage`] | [`PacketSource`] | 0 in, 1 out |
//! | [`TransformStage`] | [`PacketTransform`] | 1 in, 1 out |
//! | [`SinkStage`] | [`FrameSink`] | 1 in, 0 out |

mod sink;
mod source;
mod transform;

pub use sink::{FrameSink, SinkStage};
pub use source::{IterSource, PacketSource, SourceStage};
pub use transform::{PacketTransform, TransformStage};
