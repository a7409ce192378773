//! # Lock / Wait Arbitration
//!
//! The nested system lock is TinyQ's only synchronization primitive. Every
//! piece of shared kernel state (queues, timer table, counters) is read and
//! written while it is held.
//!
//! ## Nesting
//!
//! ```text
//!   lock()   ── mask IRQs, depth += 1
//!   lock()   ── mask IRQs, depth += 1        (depth 2)
//!   unlock() ── depth -= 1                   (IRQs stay masked)
//!   unlock() ── depth -= 1 → 0, unmask IRQs
//! ```
//!
//! [`Lock::lock`] returns a [`LockGuard`] that unlocks on drop and carries
//! the [`CriticalSection`] token used to open the kernel's
//! `Mutex<RefCell<_>>` cells.
//!
//! ## Wait Counter and Sleep
//!
//! Actors driving time-critical hardware sequences raise the wait counter
//! with `request_wait` so the idle loop only sleeps lightly. With no
//! outstanding requests the core drops into deep sleep.

use core::cell::Cell;

use cortex_m::interrupt::{CriticalSection, Mutex};

use crate::error::Fault;
use crate::port::{Port, SleepDepth};
use crate::signal::ActorId;

/// Nested interrupt-masking lock plus the wait counter.
pub struct Lock<P: Port> {
    port: P,
    depth: Mutex<Cell<u32>>,
    waiters: Mutex<Cell<u32>>,
}

impl<P: Port> Lock<P> {
    pub const fn new(port: P) -> Self {
        Self {
            port,
            depth: Mutex::new(Cell::new(0)),
            waiters: Mutex::new(Cell::new(0)),
        }
    }

    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mask interrupts and enter one more nesting level.
    pub fn lock(&self) -> LockGuard<'_, P> {
        self.port.disable_irq();
        // SAFETY: interrupts stay masked until the matching unlock brings
        // the depth back to zero, which outlives the guard holding this token.
        let cs = unsafe { CriticalSection::new() };
        let depth = self.depth.borrow(&cs);
        depth.set(depth.get() + 1);
        LockGuard { lock: self, cs }
    }

    fn unlock(&self) {
        self.port.disable_irq();
        // SAFETY: interrupts were masked on the line above.
        let cs = unsafe { CriticalSection::new() };
        let depth = self.depth.borrow(&cs);
        let remaining = depth.get().saturating_sub(1);
        depth.set(remaining);
        if remaining == 0 {
            self.port.enable_irq();
        }
    }

    /// Keep the idle loop out of deep sleep until the matching
    /// [`release_wait`](Self::release_wait).
    pub fn request_wait(&self, actor: ActorId) {
        let guard = self.lock();
        let waiters = self.waiters.borrow(guard.cs());
        waiters.set(waiters.get() + 1);
        log::trace!("actor {} requests wait ({} outstanding)", actor, waiters.get());
    }

    pub fn release_wait(&self, actor: ActorId) {
        let guard = self.lock();
        let waiters = self.waiters.borrow(guard.cs());
        match waiters.get().checked_sub(1) {
            Some(remaining) => {
                waiters.set(remaining);
                log::trace!("actor {} releases wait ({} outstanding)", actor, remaining);
            }
            None => log::warn!("actor {} released a wait it never requested", actor),
        }
    }

    /// Idle the core. Consumes the dispatch loop's single lock level.
    ///
    /// The level is dropped without unmasking interrupts, so an interrupt
    /// that arrives between the emptiness check and the sleep instruction
    /// still wakes the core. Interrupts are unmasked unconditionally on
    /// the wake path.
    pub fn sleep(&self, guard: LockGuard<'_, P>) -> Result<SleepDepth, Fault> {
        let depth = guard.depth();
        if depth != 1 {
            return Err(Fault::SleepDepth(depth));
        }
        let sleep = if guard.waiters() > 0 {
            SleepDepth::Light
        } else {
            SleepDepth::Deep
        };
        self.depth.borrow(guard.cs()).set(0);
        core::mem::forget(guard);

        self.port.sleep(sleep);
        self.port.enable_irq();
        Ok(sleep)
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// One held level of the system lock.
pub struct LockGuard<'a, P: Port> {
    lock: &'a Lock<P>,
    cs: CriticalSection,
}

impl<P: Port> LockGuard<'_, P> {
    /// Token for borrowing lock-protected `Mutex` cells.
    #[inline]
    pub fn cs(&self) -> &CriticalSection {
        &self.cs
    }

    /// Current nesting depth, counting this guard.
    pub fn depth(&self) -> u32 {
        self.lock.depth.borrow(&self.cs).get()
    }

    /// Outstanding wait requests.
    pub fn waiters(&self) -> u32 {
        self.lock.waiters.borrow(&self.cs).get()
    }
}

impl<P: Port> Drop for LockGuard<'_, P> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
