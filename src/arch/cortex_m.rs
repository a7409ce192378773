//! # Cortex-M Port
//!
//! [`Port`] implementation for ARMv6-M and ARMv7-M cores.
//!
//! ## Exception Mapping
//!
//! | Kernel concept | Cortex-M mechanism |
//! |----------------|--------------------|
//! | system lock | PRIMASK (`cpsid i` / `cpsie i`) |
//! | deferred high-priority context | PendSV at the lowest priority |
//! | light sleep | `wfi` with SLEEPDEEP clear |
//! | deep sleep | `wfi` with SLEEPDEEP set |
//! | alarm | any [`Alarm`]; [`SysTickAlarm`] by default |
//!
//! The firmware binds the exceptions to the kernel:
//!
//! ```ignore
//! #[exception]
//! fn PendSV() {
//!     KERNEL.dispatch_high();
//! }
//!
//! #[exception]
//! fn SysTick() {
//!     KERNEL.alarm_expired();
//! }
//! ```
//!
//! PendSV sits below every hardware interrupt, so interrupt handlers can
//! always preempt high-tier dispatch to enqueue more work.

use core::cell::Cell;

use cortex_m::asm;
use cortex_m::interrupt::{self, Mutex};
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m::Peripherals;

use crate::config::SYSTEM_CLOCK_HZ;
use crate::error::Fault;
use crate::port::{Port, SleepDepth};

/// Lowest exception priority; the unimplemented low bits read as zero.
const LOWEST_PRIORITY: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// A one-shot hardware countdown with a free-running elapsed counter.
///
/// Same contract as the alarm half of [`Port`]. The alarm's interrupt
/// handler must call `Kernel::alarm_expired`.
pub trait Alarm: Sync {
    const TICKS_PER_MS: u32;
    const MIN_TICKS: u32;
    const MAX_TICKS: u32;

    fn init(&self);
    fn start(&self, ticks: u32);
    fn stop(&self);
    fn elapsed(&self, reset: bool) -> u32;
}

/// SysTick as the alarm, clocked from the external reference
/// (`SYSTEM_CLOCK_HZ / 8`).
///
/// SysTick halts in the core's deep sleep on most parts. Actors that need
/// timers to keep running should hold a wait request so the idle loop only
/// sleeps lightly.
///
/// ## Counting
///
/// ```text
///   start(p): reload = p - 1, counter cleared
///   counter:  0 → p-1 → … → 1 → 0 (COUNTFLAG, exception) → p-1 → …
///   elapsed = completed periods × p + ticks into the current period
/// ```
pub struct SysTickAlarm {
    /// Armed period in ticks; zero while stopped.
    period: Mutex<Cell<u32>>,
    /// Ticks accumulated by completed periods since the last start.
    completed: Mutex<Cell<u32>>,
    /// Elapsed-ticks reference point, moved by `elapsed(true)`.
    origin: Mutex<Cell<u32>>,
}

impl SysTickAlarm {
    pub const fn new() -> Self {
        Self {
            period: Mutex::new(Cell::new(0)),
            completed: Mutex::new(Cell::new(0)),
            origin: Mutex::new(Cell::new(0)),
        }
    }

    fn syst() -> SYST {
        // SAFETY: SysTick is owned by this alarm; nothing else in the
        // firmware programs it.
        unsafe { Peripherals::steal() }.SYST
    }

    /// Ticks since the last `start`, folding in a pending wrap.
    fn total(&self, cs: &interrupt::CriticalSection) -> u32 {
        let period = self.period.borrow(cs).get();
        let completed = self.completed.borrow(cs);

        let mut current = SYST::get_current();
        if Self::syst().has_wrapped() {
            completed.set(completed.get().saturating_add(period));
            current = SYST::get_current();
        }
        if current == 0 {
            // Either just cleared by `start` or sitting on a counted wrap.
            completed.get()
        } else {
            completed.get().saturating_add(period - current)
        }
    }
}

impl Default for SysTickAlarm {
    fn default() -> Self {
        Self::new()
    }
}

impl Alarm for SysTickAlarm {
    const TICKS_PER_MS: u32 = SYSTEM_CLOCK_HZ / 8 / 1000;
    const MIN_TICKS: u32 = 2;
    /// The reload register is 24 bits wide.
    const MAX_TICKS: u32 = 0x00FF_FFFF;

    fn init(&self) {
        let mut syst = Self::syst();
        syst.disable_counter();
        syst.disable_interrupt();
        syst.set_clock_source(SystClkSource::External);
    }

    fn start(&self, ticks: u32) {
        interrupt::free(|cs| {
            let ticks = ticks.clamp(Self::MIN_TICKS, Self::MAX_TICKS);
            let mut syst = Self::syst();
            syst.disable_counter();
            syst.set_reload(ticks - 1);
            syst.clear_current();
            SCB::clear_pendst();

            self.period.borrow(cs).set(ticks);
            self.completed.borrow(cs).set(0);
            self.origin.borrow(cs).set(0);

            syst.enable_interrupt();
            syst.enable_counter();
        });
    }

    fn stop(&self) {
        interrupt::free(|cs| {
            let mut syst = Self::syst();
            syst.disable_interrupt();
            syst.disable_counter();
            SCB::clear_pendst();
            self.period.borrow(cs).set(0);
        });
    }

    fn elapsed(&self, reset: bool) -> u32 {
        interrupt::free(|cs| {
            if self.period.borrow(cs).get() == 0 {
                return 0;
            }
            let total = self.total(cs);
            let origin = self.origin.borrow(cs);
            let elapsed = total.saturating_sub(origin.get());
            if reset {
                origin.set(total);
            }
            elapsed
        })
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// The Cortex-M port over alarm `A`.
pub struct CortexM<A: Alarm> {
    alarm: A,
}

impl<A: Alarm> CortexM<A> {
    pub const fn new(alarm: A) -> Self {
        Self { alarm }
    }

    fn scb() -> SCB {
        // SAFETY: only single read-modify-write register accesses go
        // through this handle, with interrupts masked by the caller or by
        // running before the kernel starts.
        unsafe { Peripherals::steal() }.SCB
    }
}

impl<A: Alarm> Port for CortexM<A> {
    const TICKS_PER_MS: u32 = A::TICKS_PER_MS;
    const ALARM_MIN_TICKS: u32 = A::MIN_TICKS;
    const ALARM_MAX_TICKS: u32 = A::MAX_TICKS;

    fn init(&self) {
        let mut scb = Self::scb();
        // SAFETY: PendSV only runs kernel dispatch, which tolerates any
        // priority; lowest keeps it from delaying hardware interrupts.
        unsafe { scb.set_priority(SystemHandler::PendSV, LOWEST_PRIORITY) };
        self.alarm.init();
    }

    #[inline]
    fn disable_irq(&self) {
        interrupt::disable();
    }

    #[inline]
    fn enable_irq(&self) {
        // SAFETY: only called by the system lock when its depth reaches
        // zero, so no critical section is live.
        unsafe { interrupt::enable() };
    }

    #[inline]
    fn pend_high_dispatch(&self) {
        SCB::set_pendsv();
    }

    fn sleep(&self, depth: SleepDepth) {
        let mut scb = Self::scb();
        match depth {
            SleepDepth::Light => scb.clear_sleepdeep(),
            SleepDepth::Deep => scb.set_sleepdeep(),
        }
        asm::dsb();
        asm::wfi();
    }

    fn alarm_start(&self, ticks: u32) {
        self.alarm.start(ticks);
    }

    fn alarm_stop(&self) {
        self.alarm.stop();
    }

    fn alarm_elapsed(&self, reset: bool) -> u32 {
        self.alarm.elapsed(reset)
    }

    fn halt(&self, _fault: Fault) -> ! {
        interrupt::disable();
        loop {
            asm::nop();
        }
    }

    fn reset(&self) -> ! {
        SCB::sys_reset()
    }

    fn delay_us(&self, us: u32) {
        asm::delay(us.saturating_mul(SYSTEM_CLOCK_HZ / 1_000_000));
    }
}
