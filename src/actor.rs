//! # Actors
//!
//! An actor is a statically registered unit of behavior with one handler.
//! The application assembles an ordered registry before startup; an
//! actor's id is its index in that registry.
//!
//! ```ignore
//! static ACTORS: [&dyn Actor<Board>; 3] = [&SystemActor, &BUTTON, &PLAYER];
//! static KERNEL: Kernel<'static, Board> = Kernel::new(Board::new(), &ACTORS);
//! ```
//!
//! Handlers run to completion in either the main dispatch loop or the
//! deferred high-priority context. Hardware interrupt handlers never call
//! them directly; they enqueue with [`Kernel::send`] instead.

use crate::kernel::Kernel;
use crate::port::Port;
use crate::signal::{ActorId, SignalCode, Tier};

/// Broadcast by the kernel once at startup.
pub const SYSTEM_NTF_START: SignalCode = SignalCode::notification(Tier::Normal, 0);

/// Wall-clock change notification, reserved for boards that keep a calendar.
pub const SYSTEM_NTF_TIME_CHANGE: SignalCode = SignalCode::notification(Tier::Normal, 1);

/// Timer expiry. Payload: the 16-bit timer id, little-endian.
pub const SYSTEM_RSP_TIMER: SignalCode = SignalCode::response(Tier::Normal, 0);

/// A message-handling capability.
pub trait Actor<P: Port>: Sync {
    /// Handle one signal addressed to `me` (directly or by broadcast).
    fn on_signal(
        &self,
        kernel: &Kernel<'_, P>,
        me: ActorId,
        from: ActorId,
        code: SignalCode,
        payload: &[u8],
    );
}

/// Occupant of the reserved id 0. Ignores everything it receives.
pub struct SystemActor;

impl<P: Port> Actor<P> for SystemActor {
    fn on_signal(&self, _: &Kernel<'_, P>, _: ActorId, _: ActorId, _: SignalCode, _: &[u8]) {}
}

/// Decode the timer id carried by a [`SYSTEM_RSP_TIMER`] payload.
pub fn timer_id(payload: &[u8]) -> Option<u16> {
    match payload {
        [lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalKind;

    #[test]
    fn test_system_codes_ride_the_normal_tier() {
        assert_eq!(SYSTEM_NTF_START.raw(), 0x80);
        assert_eq!(SYSTEM_NTF_TIME_CHANGE.raw(), 0x81);
        assert_eq!(SYSTEM_RSP_TIMER.raw(), 0xC0);

        for code in [SYSTEM_NTF_START, SYSTEM_NTF_TIME_CHANGE, SYSTEM_RSP_TIMER] {
            assert_eq!(code.tier(), Tier::Normal);
        }
        assert_eq!(SYSTEM_NTF_TIME_CHANGE.kind(), SignalKind::Notification);
        assert_eq!(SYSTEM_RSP_TIMER.kind(), SignalKind::Response);
    }

    #[test]
    fn test_timer_id_decoding() {
        assert_eq!(timer_id(&0xBEEFu16.to_le_bytes()), Some(0xBEEF));
        assert_eq!(timer_id(&[1]), None);
        assert_eq!(timer_id(&[1, 2, 3]), None);
    }
}
