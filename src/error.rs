//! # Faults
//!
//! Every invariant violation in TinyQ is unrecoverable. Leaf components
//! report them as [`Fault`] values; the kernel logs the fault and hands it
//! to [`Port::halt`](crate::port::Port::halt), which never returns.
//!
//! Conditions that are expected but uninteresting (sending to id 0,
//! addressing an actor that does not exist) are not faults and are dropped
//! silently.

use crate::signal::Tier;

/// A fatal kernel condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("ring buffer overflow: {requested} bytes requested, {available} free")]
    BufferOverflow { requested: usize, available: usize },

    #[error("ring buffer underflow: {requested} bytes requested, {available} stored")]
    BufferUnderflow { requested: usize, available: usize },

    /// A signal did not fit in its queue. Queues must be sized for the
    /// worst-case burst.
    #[error("{tier:?} queue overflow")]
    QueueOverflow { tier: Tier },

    #[error("payload of {0} bytes exceeds the 255-byte limit")]
    PayloadTooLarge(usize),

    #[error("too many timers")]
    TimerTableFull,

    #[error("timer period of {0} ms overflows the tick domain")]
    TimerPeriodOverflow(u32),

    /// A state machine received a signal while it had no valid state.
    #[error("state machine has no active state")]
    NoActiveState,

    /// `sleep` must be entered holding exactly the dispatch loop's lock level.
    #[error("sleep requested at lock depth {0}")]
    SleepDepth(u32),

    #[error("{0} actors exceed the addressable range")]
    TooManyActors(usize),
}
