//! # Hardware Port
//!
//! The capabilities the kernel needs from the chip, and nothing more.
//! Peripheral programming (pins, external interrupt lines, waveform
//! generators) stays outside this boundary, in actors and board code.
//!
//! The kernel calls into the port from its own critical sections; the
//! port calls back into the kernel only from its exception handlers:
//!
//! ```text
//!   deferred-context exception ──► Kernel::dispatch_high()
//!   alarm exception            ──► Kernel::alarm_expired()
//! ```

use crate::error::Fault;

/// How deeply the core may sleep while the normal queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepDepth {
    /// Core clock gated, peripherals running. Chosen while any actor holds
    /// a wait request.
    Light,
    /// Low-power stop mode. Chosen when nobody needs low-latency wakeups.
    Deep,
}

/// Logic-analyser probe points raised by the kernel around its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugPin {
    NormalDispatch,
    HighDispatch,
    Sleep,
}

/// Hardware capabilities required by the kernel.
///
/// Implementations must be usable from both thread mode and exception
/// handlers, hence the `Sync` bound.
pub trait Port: Sync {
    /// Alarm ticks per millisecond.
    const TICKS_PER_MS: u32;
    /// Shortest period the alarm can be armed for.
    const ALARM_MIN_TICKS: u32;
    /// Longest period the alarm can be armed for. Longer timers are served
    /// by re-arming on expiry.
    const ALARM_MAX_TICKS: u32;

    /// One-time hardware setup, called by `Kernel::start`.
    fn init(&self);

    /// Mask all maskable interrupts.
    fn disable_irq(&self);

    /// Unmask interrupts.
    fn enable_irq(&self);

    /// Request the deferred high-priority context. Requesting while it is
    /// already pending is harmless.
    fn pend_high_dispatch(&self);

    /// Suspend the core until the next interrupt. Entered with interrupts
    /// masked; the pending interrupt still wakes the core.
    fn sleep(&self, depth: SleepDepth);

    /// Arm the alarm `ticks` from now and make now the reference point for
    /// [`alarm_elapsed`](Port::alarm_elapsed).
    fn alarm_start(&self, ticks: u32);

    /// Disarm the alarm and forget the reference point.
    fn alarm_stop(&self);

    /// Ticks since the reference point, or 0 when no reference is set.
    /// With `reset`, the reference point moves to now.
    fn alarm_elapsed(&self, reset: bool) -> u32;

    /// Stop for good. On hardware this spins with interrupts masked until
    /// the watchdog resets the chip.
    fn halt(&self, fault: Fault) -> !;

    /// Software reset.
    fn reset(&self) -> !;

    /// Busy-wait for roughly `us` microseconds.
    fn delay_us(&self, us: u32);

    /// Drive a debug probe pin. No-op unless the board wires one up.
    fn debug_pin(&self, _pin: DebugPin, _asserted: bool) {}
}
