//! Error types for demandflow.
//!
//! Only recoverable conditions live here. Structural invariant violations
//! (double connect, supplying into an occupied input, dereferencing a stale
//! port reference) are programmer errors and panic at the call site.

use crate::stage::PortDirection;
use thiserror::Error;

/// Result type alias using demandflow's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for demandflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Payload pool is exhausted (no buffers available).
    #[error("payload pool exhausted: no buffers available")]
    PoolExhausted,

    /// Payload allocation failed.
    #[error("payload allocation failed: {0}")]
    AllocationFailed(String),

    /// The stage graph contains a cycle.
    #[error("graph contains a cycle through '{from}' -> '{to}'")]
    Cycle {
        /// Stage on the producing end of the offending connection.
        from: String,
        /// Stage on the consuming end of the offending connection.
        to: String,
    },

    /// A port was left unconnected.
    #[error("{direction} {index} of stage '{stage}' is not connected")]
    UnconnectedPort {
        /// Name of the stage owning the port.
        stage: String,
        /// Whether the port is an input or an output.
        direction: PortDirection,
        /// Index of the port on its stage.
        index: usize,
    },

    /// Engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine was dropped; update requests can no longer be delivered.
    #[error("engine is closed")]
    EngineClosed,
}
