//! # Signals
//!
//! Addressing and the packed signal code shared by every actor.
//!
//! ## Code Layout
//!
//! ```text
//!    7   6   5   4   3   2   1   0
//!  ┌───┬───────┬───────────────────┐
//!  │ T │  kind │       index       │
//!  └───┴───────┴───────────────────┘
//!  T     0 = high (interface) tier, 1 = normal (logic) tier
//!  kind  00 notification · 01 command · 10 response · 11 local
//!  index meaningful only within (tier, kind, sender)
//! ```
//!
//! The layout is load-bearing: the bus routes on the tier bit before
//! anything else looks at the code.

/// Actor identity: index into the registry.
pub type ActorId = u8;

/// Reserved target: the signal is dropped without being queued.
pub const NO_TARGET: ActorId = 0;

/// Reserved target: deliver to every registered actor in ascending id order.
pub const BROADCAST: ActorId = 0xFF;

/// Sender id used by the kernel itself (startup, timer responses).
pub const SYSTEM: ActorId = 0;

// ---------------------------------------------------------------------------
// Tier and kind
// ---------------------------------------------------------------------------

/// Dispatch tier, selecting both queue and execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Interface traffic, serviced by the deferred high-priority context.
    High,
    /// Logic traffic, serviced by the main dispatch loop.
    Normal,
}

/// Semantic type of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Notification,
    Command,
    Response,
    Local,
}

// ---------------------------------------------------------------------------
// Packed code
// ---------------------------------------------------------------------------

/// One-byte packed signal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SignalCode(u8);

impl SignalCode {
    const TIER_NORMAL: u8 = 0x80;
    const KIND_SHIFT: u8 = 5;
    const KIND_MASK: u8 = 0x60;
    const INDEX_MASK: u8 = 0x1F;

    /// Reinterpret a raw code byte, e.g. one read back from a queue.
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Build a code from its parts. `index` is truncated to five bits.
    pub const fn new(tier: Tier, kind: SignalKind, index: u8) -> Self {
        let tier_bit = match tier {
            Tier::High => 0,
            Tier::Normal => Self::TIER_NORMAL,
        };
        let kind_bits = match kind {
            SignalKind::Notification => 0,
            SignalKind::Command => 1,
            SignalKind::Response => 2,
            SignalKind::Local => 3,
        };
        Self(tier_bit | (kind_bits << Self::KIND_SHIFT) | (index & Self::INDEX_MASK))
    }

    pub const fn notification(tier: Tier, index: u8) -> Self {
        Self::new(tier, SignalKind::Notification, index)
    }

    pub const fn command(tier: Tier, index: u8) -> Self {
        Self::new(tier, SignalKind::Command, index)
    }

    pub const fn response(tier: Tier, index: u8) -> Self {
        Self::new(tier, SignalKind::Response, index)
    }

    /// Local signals are private to one module and always ride the
    /// normal tier.
    pub const fn local(index: u8) -> Self {
        Self::new(Tier::Normal, SignalKind::Local, index)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn tier(self) -> Tier {
        if self.0 & Self::TIER_NORMAL != 0 {
            Tier::Normal
        } else {
            Tier::High
        }
    }

    #[inline]
    pub const fn kind(self) -> SignalKind {
        match (self.0 & Self::KIND_MASK) >> Self::KIND_SHIFT {
            0 => SignalKind::Notification,
            1 => SignalKind::Command,
            2 => SignalKind::Response,
            _ => SignalKind::Local,
        }
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0 & Self::INDEX_MASK
    }
}

// ---------------------------------------------------------------------------
// Queued envelope header
// ---------------------------------------------------------------------------

/// Four-byte header written ahead of every queued payload.
///
/// A header is always pushed before its payload and popped before it, so
/// the reader learns how many payload bytes follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub from: ActorId,
    pub to: ActorId,
    pub code: SignalCode,
    pub len: u8,
}

impl Header {
    /// Encoded size in bytes.
    pub const SIZE: usize = 4;

    pub const fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.from, self.to, self.code.raw(), self.len]
    }

    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            from: bytes[0],
            to: bytes[1],
            code: SignalCode::from_raw(bytes[2]),
            len: bytes[3],
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
