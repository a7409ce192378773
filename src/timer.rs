//! # Timer Table
//!
//! N logical countdowns multiplexed onto one hardware alarm.
//!
//! ## Representation
//!
//! - 32 fixed slots, each holding a packed `(actor, timer id)` key and the
//!   remaining ticks
//! - a parallel `u32` occupancy bitmap: bit `i` set ⇔ slot `i` is live
//!
//! ## Reconciliation
//!
//! The alarm's counter runs freely, so remaining periods are only brought
//! up to date when time is observed: on every start and on every alarm
//! expiry. Both paths subtract the elapsed ticks from each live slot,
//! retire the slots that reached zero into an [`Expired`] list, and report
//! the new minimum so the caller can re-arm the alarm.
//!
//! Stopping a timer only clears its occupancy bit. The alarm is not
//! re-armed; a canceled slot simply stops participating in the next
//! reconciliation.
//!
//! Expired keys are listed in slot order. That is an implementation order,
//! not a priority between actors.

use heapless::Vec;

use crate::config::TIMER_SLOTS;
use crate::error::Fault;
use crate::signal::ActorId;

/// Owner and id of one logical timer, packed as `actor << 16 | id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TimerKey(u32);

impl TimerKey {
    pub const fn new(actor: ActorId, id: u16) -> Self {
        Self(((actor as u32) << 16) | id as u32)
    }

    #[inline]
    pub const fn actor(self) -> ActorId {
        (self.0 >> 16) as ActorId
    }

    #[inline]
    pub const fn id(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Timers retired by one reconciliation, in slot order.
pub type Expired = Vec<TimerKey, TIMER_SLOTS>;

#[derive(Debug, Clone, Copy)]
struct Slot {
    key: TimerKey,
    remaining: u32,
}

impl Slot {
    const EMPTY: Self = Self {
        key: TimerKey(0),
        remaining: 0,
    };
}

/// Fixed table of logical timers.
pub struct TimerTable {
    occupied: u32,
    slots: [Slot; TIMER_SLOTS],
}

impl TimerTable {
    pub const fn new() -> Self {
        Self {
            occupied: 0,
            slots: [Slot::EMPTY; TIMER_SLOTS],
        }
    }

    /// Number of live timers.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Remaining ticks of a live timer.
    pub fn remaining(&self, key: TimerKey) -> Option<u32> {
        self.live()
            .find(|&i| self.slots[i].key == key)
            .map(|i| self.slots[i].remaining)
    }

    /// Reconcile against `elapsed` ticks, then (re)start `key` with `ticks`.
    ///
    /// An existing entry for `key` is dropped before reconciliation so it
    /// can neither fire nor be duplicated. A zero `ticks` leaves the key
    /// stopped.
    pub fn start(&mut self, key: TimerKey, ticks: u32, elapsed: u32) -> Result<Expired, Fault> {
        self.stop(key);
        let expired = self.reconcile(elapsed);

        if ticks > 0 {
            let free = (!self.occupied).trailing_zeros() as usize;
            if free >= TIMER_SLOTS {
                return Err(Fault::TimerTableFull);
            }
            self.slots[free] = Slot {
                key,
                remaining: ticks,
            };
            self.occupied |= 1 << free;
        }
        Ok(expired)
    }

    /// Cancel `key`. Returns whether it was live.
    pub fn stop(&mut self, key: TimerKey) -> bool {
        let found = self.live().find(|&i| self.slots[i].key == key);
        match found {
            Some(slot) => {
                self.occupied &= !(1 << slot);
                true
            }
            None => false,
        }
    }

    /// Subtract `elapsed` ticks from every live timer and retire those that
    /// ran out.
    pub fn reconcile(&mut self, elapsed: u32) -> Expired {
        let mut expired = Expired::new();
        for slot in 0..TIMER_SLOTS {
            if self.occupied & (1 << slot) == 0 {
                continue;
            }
            let entry = &mut self.slots[slot];
            if entry.remaining <= elapsed {
                self.occupied &= !(1 << slot);
                // One entry per slot, so the list cannot fill up.
                let _ = expired.push(entry.key);
            } else {
                entry.remaining -= elapsed;
            }
        }
        expired
    }

    /// Smallest remaining period among live timers.
    pub fn next_deadline(&self) -> Option<u32> {
        self.live().map(|i| self.slots[i].remaining).min()
    }

    fn live(&self) -> impl Iterator<Item = usize> + '_ {
        (0..TIMER_SLOTS).filter(move |&i| self.occupied & (1 << i) != 0)
    }
}

impl Default for TimerTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(expired: &Expired) -> std::vec::Vec<TimerKey> {
        expired.iter().copied().collect()
    }

    #[test]
    fn test_key_packing() {
        let key = TimerKey::new(3, 0xBEEF);
        assert_eq!(key.raw(), 0x0003_BEEF);
        assert_eq!(key.actor(), 3);
        assert_eq!(key.id(), 0xBEEF);
    }

    #[test]
    fn test_start_inserts_and_reports_deadline() {
        let mut table = TimerTable::new();
        assert!(table.start(TimerKey::new(1, 1), 100, 0).unwrap().is_empty());
        assert!(table.start(TimerKey::new(1, 2), 40, 0).unwrap().is_empty());
        assert_eq!(table.len(), 2);
        assert_eq!(table.next_deadline(), Some(40));
    }

    #[test]
    fn test_elapsed_ticks_are_subtracted() {
        let mut table = TimerTable::new();
        let a = TimerKey::new(3, 1);
        let b = TimerKey::new(3, 2);
        table.start(a, 100, 0).unwrap();
        table.start(b, 50, 40).unwrap();

        assert_eq!(table.remaining(a), Some(60));
        assert_eq!(table.remaining(b), Some(50));
        assert_eq!(table.next_deadline(), Some(50));
    }

    #[test]
    fn test_reconcile_retires_in_slot_order() {
        let mut table = TimerTable::new();
        let keys_in = [TimerKey::new(1, 7), TimerKey::new(2, 7), TimerKey::new(3, 7)];
        table.start(keys_in[0], 30, 0).unwrap();
        table.start(keys_in[1], 90, 0).unwrap();
        table.start(keys_in[2], 20, 0).unwrap();

        let expired = table.reconcile(30);
        assert_eq!(keys(&expired), vec![keys_in[0], keys_in[2]]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.next_deadline(), Some(60));
    }

    #[test]
    fn test_restart_replaces_without_duplicate() {
        let mut table = TimerTable::new();
        let key = TimerKey::new(4, 1);
        table.start(key, 100, 0).unwrap();
        // Old countdown would have expired in this window; it must not fire.
        let expired = table.start(key, 50, 120).unwrap();

        assert!(expired.is_empty());
        assert_eq!(table.len(), 1);
        assert_eq!(table.remaining(key), Some(50));
    }

    #[test]
    fn test_zero_period_cancels() {
        let mut table = TimerTable::new();
        let key = TimerKey::new(4, 1);
        table.start(key, 100, 0).unwrap();
        table.start(key, 0, 0).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.next_deadline(), None);
    }

    #[test]
    fn test_stop_is_lazy_and_idempotent() {
        let mut table = TimerTable::new();
        let key = TimerKey::new(2, 9);
        table.start(key, 10, 0).unwrap();
        assert!(table.stop(key));
        assert!(!table.stop(key));
        assert!(table.reconcile(100).is_empty());
    }

    #[test]
    fn test_stop_frees_slot_for_reuse() {
        let mut table = TimerTable::new();
        table.start(TimerKey::new(1, 1), 10, 0).unwrap();
        table.start(TimerKey::new(1, 2), 20, 0).unwrap();

        assert!(table.stop(TimerKey::new(1, 1)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.remaining(TimerKey::new(1, 1)), None);
        assert_eq!(table.next_deadline(), Some(20));

        table.start(TimerKey::new(2, 1), 5, 0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.next_deadline(), Some(5));
    }

    #[test]
    fn test_table_full() {
        let mut table = TimerTable::new();
        for id in 0..TIMER_SLOTS as u16 {
            table.start(TimerKey::new(1, id), 1000, 0).unwrap();
        }
        assert_eq!(
            table.start(TimerKey::new(2, 0), 10, 0),
            Err(Fault::TimerTableFull)
        );
        // Restarting a live key reuses its slot.
        assert!(table.start(TimerKey::new(1, 5), 10, 0).is_ok());
    }

    #[test]
    fn test_expiry_frees_slot_for_insert() {
        let mut table = TimerTable::new();
        for id in 0..TIMER_SLOTS as u16 {
            table.start(TimerKey::new(1, id), 10 + id as u32, 0).unwrap();
        }
        let expired = table.start(TimerKey::new(2, 0), 5, 10).unwrap();
        assert_eq!(keys(&expired), vec![TimerKey::new(1, 0)]);
        assert_eq!(table.remaining(TimerKey::new(2, 0)), Some(5));
    }
}
