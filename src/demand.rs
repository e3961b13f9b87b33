//! Demand: the backpressure signal that flows upstream.
//!
//! Every input carries a logical demand value. The consuming stage that owns
//! the input sets it; the value is mirrored onto the connected output, where
//! the producing stage reads it to decide whether to produce.
//!
//! ```text
//! Producer ──packet──> Output ═══ Input ──packet──> Consumer
//!     ^                  │                              │
//!     └── reads demand ──┘<──────── set_demand ─────────┘
//! ```
//!
//! Demand is the only sanctioned flow-control mechanism. A consumer that
//! cannot keep up says so with `Negative`; the producer simply stops.

/// Tri-state backpressure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Demand {
    /// The consumer will not accept packets. Producers must hold back.
    #[default]
    Negative = 0,

    /// The consumer accepts a packet that is already available but does not
    /// ask for new production.
    Neutral = 1,

    /// The consumer wants more packets produced.
    Positive = 2,
}

impl Demand {
    /// Check if the producer should start producing a new packet.
    #[inline]
    pub fn wants_production(&self) -> bool {
        matches!(self, Demand::Positive)
    }

    /// Check if a packet that is already in hand may be supplied.
    #[inline]
    pub fn allows_supply(&self) -> bool {
        !matches!(self, Demand::Negative)
    }
}

impl From<u8> for Demand {
    fn from(value: u8) -> Self {
        match value {
            1 => Demand::Neutral,
            2 => Demand::Positive,
            _ => Demand::Negative,
        }
    }
}

impl From<Demand> for u8 {
    fn from(demand: Demand) -> Self {
        demand as u8
    }
}

impl std::fmt::Display for Demand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Demand::Negative => "negative",
            Demand::Neutral => "neutral",
            Demand::Positive => "positive",
        };
        f.write_str(s)
    }
}
