//! # Kernel
//!
//! The signal bus, both dispatch contexts, and the timer service, gathered
//! into one [`Kernel`] value that owns every piece of shared state.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         └─► KERNEL.run()                  (no return)
//!               ├─► Port::init()
//!               ├─► broadcast SYSTEM_NTF_START
//!               └─► loop { step() }
//!                     ├─► normal queue non-empty → dispatch one signal
//!                     └─► empty                  → sleep until an IRQ
//! ```
//!
//! ## Execution Contexts
//!
//! | Context | Entry | Services |
//! |---------|-------|----------|
//! | Main loop | [`Kernel::step`] | normal queue, one signal per step |
//! | Deferred  | [`Kernel::dispatch_high`] | high queue, drained completely |
//! | Hardware IRQ | [`Kernel::send`], [`Kernel::alarm_expired`] | enqueue only |
//!
//! The deferred context keeps draining until it observes an empty high
//! queue, with no bound on the batch. Sustained high-tier traffic can
//! therefore starve the main loop.
//!
//! ## Failure Model
//!
//! Faults are not returned to callers. They are logged and handed to
//! [`Port::halt`], matching a crash-and-watchdog-reset design.

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;

use crate::actor::{Actor, SYSTEM_NTF_START, SYSTEM_RSP_TIMER};
use crate::config::{HIGH_QUEUE_SIZE, MAX_PAYLOAD, MAX_TIMER_TICKS, NORMAL_QUEUE_SIZE};
use crate::error::Fault;
use crate::port::{DebugPin, Port, SleepDepth};
use crate::ring_buffer::RingBuffer;
use crate::signal::{ActorId, Header, SignalCode, Tier, BROADCAST, NO_TARGET, SYSTEM};
use crate::sync::{Lock, LockGuard};
use crate::timer::{Expired, TimerKey, TimerTable};

/// What one iteration of the main loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Dispatched,
    Slept(SleepDepth),
}

/// Fill levels of both queues, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub normal: usize,
    pub normal_high_water: usize,
    pub high: usize,
    pub high_high_water: usize,
}

/// The kernel context.
///
/// Construct once, usually in a `static`, and share by reference. All
/// operations take `&self`; mutable state sits behind the system lock.
pub struct Kernel<'a, P: Port> {
    lock: Lock<P>,
    actors: &'a [&'a dyn Actor<P>],
    normal: Mutex<RefCell<RingBuffer<NORMAL_QUEUE_SIZE>>>,
    high: Mutex<RefCell<RingBuffer<HIGH_QUEUE_SIZE>>>,
    timers: Mutex<RefCell<TimerTable>>,
}

impl<'a, P: Port> Kernel<'a, P> {
    /// Create a kernel over `port` serving the given actor registry.
    /// Actor ids are registry indices.
    pub const fn new(port: P, actors: &'a [&'a dyn Actor<P>]) -> Self {
        Self {
            lock: Lock::new(port),
            actors,
            normal: Mutex::new(RefCell::new(RingBuffer::new())),
            high: Mutex::new(RefCell::new(RingBuffer::new())),
            timers: Mutex::new(RefCell::new(TimerTable::new())),
        }
    }

    #[inline]
    pub fn port(&self) -> &P {
        self.lock.port()
    }

    /// Number of registered actors.
    #[inline]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Initialize the port and broadcast the start notification.
    pub fn start(&self) {
        // Ids run 0..=254; 0xFF is reserved for broadcast.
        if self.actors.len() > BROADCAST as usize {
            self.fatal(Fault::TooManyActors(self.actors.len()));
        }
        self.port().init();
        log::info!("tinyq: starting with {} actors", self.actors.len());
        self.send(SYSTEM, BROADCAST, SYSTEM_NTF_START, &[]);
    }

    /// Start the kernel and run the main dispatch loop forever.
    pub fn run(&self) -> ! {
        self.start();
        loop {
            self.step();
        }
    }

    /// One iteration of the main dispatch loop: deliver the oldest normal
    /// signal, or sleep if there is none.
    pub fn step(&self) -> Activity {
        let mut scratch = [0u8; MAX_PAYLOAD];
        let guard = self.lock.lock();
        let popped = self.dequeue(&self.normal, &guard, &mut scratch);

        match popped {
            Some(header) => {
                drop(guard);
                self.port().debug_pin(DebugPin::NormalDispatch, true);
                self.deliver(header, &scratch);
                self.port().debug_pin(DebugPin::NormalDispatch, false);
                Activity::Dispatched
            }
            None => {
                self.port().debug_pin(DebugPin::Sleep, true);
                let depth = match self.lock.sleep(guard) {
                    Ok(depth) => depth,
                    Err(fault) => self.fatal(fault),
                };
                self.port().debug_pin(DebugPin::Sleep, false);
                log::trace!("woke from {:?} sleep", depth);
                Activity::Slept(depth)
            }
        }
    }

    /// Body of the deferred high-priority context. Drains the high queue
    /// and returns once it has been observed empty.
    pub fn dispatch_high(&self) {
        let mut scratch = [0u8; MAX_PAYLOAD];
        loop {
            let popped = {
                let guard = self.lock.lock();
                self.dequeue(&self.high, &guard, &mut scratch)
            };
            let Some(header) = popped else {
                break;
            };
            self.port().debug_pin(DebugPin::HighDispatch, true);
            self.deliver(header, &scratch);
            self.port().debug_pin(DebugPin::HighDispatch, false);
        }
    }

    /// Log `fault` and halt through the port.
    pub fn fatal(&self, fault: Fault) -> ! {
        log::error!("tinyq fault: {}", fault);
        self.port().halt(fault)
    }

    pub fn reset(&self) -> ! {
        log::info!("tinyq: software reset");
        self.port().reset()
    }

    pub fn delay_us(&self, us: u32) {
        self.port().delay_us(us);
    }

    // -----------------------------------------------------------------------
    // Signal bus
    // -----------------------------------------------------------------------

    /// Queue a signal for delivery. Safe to call from any context,
    /// including hardware interrupt handlers.
    ///
    /// Signals to [`NO_TARGET`] are dropped. High-tier signals also pend the
    /// deferred context.
    pub fn send(&self, from: ActorId, to: ActorId, code: SignalCode, payload: &[u8]) {
        if to == NO_TARGET {
            log::trace!("drop {:#04x} from {}: no target", code.raw(), from);
            return;
        }
        if let Err(fault) = self.enqueue(from, to, code, payload) {
            self.fatal(fault);
        }
    }

    fn enqueue(
        &self,
        from: ActorId,
        to: ActorId,
        code: SignalCode,
        payload: &[u8],
    ) -> Result<(), Fault> {
        let len = u8::try_from(payload.len()).map_err(|_| Fault::PayloadTooLarge(payload.len()))?;
        let header = Header { from, to, code, len };
        let tier = code.tier();

        let guard = self.lock.lock();
        match tier {
            Tier::High => {
                let mut queue = self.high.borrow(guard.cs()).borrow_mut();
                Self::push_envelope(&mut *queue, header, payload)
                    .map_err(|_| Fault::QueueOverflow { tier })?;
                self.port().pend_high_dispatch();
            }
            Tier::Normal => {
                let mut queue = self.normal.borrow(guard.cs()).borrow_mut();
                Self::push_envelope(&mut *queue, header, payload)
                    .map_err(|_| Fault::QueueOverflow { tier })?;
            }
        }
        Ok(())
    }

    fn push_envelope<const N: usize>(
        queue: &mut RingBuffer<N>,
        header: Header,
        payload: &[u8],
    ) -> Result<(), Fault> {
        // Check up front so a header is never queued without its payload.
        if queue.space() < Header::SIZE + payload.len() {
            return Err(Fault::BufferOverflow {
                requested: Header::SIZE + payload.len(),
                available: queue.space(),
            });
        }
        queue.push_back(&header.to_bytes())?;
        queue.push_back(payload)
    }

    /// Pop one envelope, copying its payload into `scratch`.
    fn dequeue<const N: usize>(
        &self,
        queue: &Mutex<RefCell<RingBuffer<N>>>,
        guard: &LockGuard<'_, P>,
        scratch: &mut [u8; MAX_PAYLOAD],
    ) -> Option<Header> {
        let mut queue = queue.borrow(guard.cs()).borrow_mut();
        if queue.is_empty() {
            return None;
        }
        let mut raw = [0u8; Header::SIZE];
        let popped = queue
            .pop_front(&mut raw)
            .and_then(|()| {
                let header = Header::from_bytes(raw);
                queue.pop_front(&mut scratch[..header.len as usize])?;
                Ok(header)
            });
        match popped {
            Ok(header) => Some(header),
            Err(fault) => self.fatal(fault),
        }
    }

    fn deliver(&self, header: Header, scratch: &[u8; MAX_PAYLOAD]) {
        log::trace!(
            "dispatch {:#04x} {} -> {} ({} bytes)",
            header.code.raw(),
            header.from,
            header.to,
            header.len
        );
        self.process_signal(header.from, header.to, header.code, &scratch[..header.len as usize]);
    }

    /// Invoke the target's handler now, or every handler in ascending id
    /// order for [`BROADCAST`]. Unknown targets are ignored.
    pub fn process_signal(&self, from: ActorId, to: ActorId, code: SignalCode, payload: &[u8]) {
        if to == BROADCAST {
            for (id, actor) in self.actors.iter().enumerate() {
                actor.on_signal(self, id as ActorId, from, code, payload);
            }
        } else if let Some(actor) = self.actors.get(to as usize) {
            actor.on_signal(self, to, from, code, payload);
        } else {
            log::trace!("drop {:#04x} from {}: no actor {}", code.raw(), from, to);
        }
    }

    /// Current and peak fill levels of both queues.
    pub fn queue_stats(&self) -> QueueStats {
        let guard = self.lock.lock();
        let normal = self.normal.borrow(guard.cs()).borrow();
        let high = self.high.borrow(guard.cs()).borrow();
        QueueStats {
            normal: normal.size(),
            normal_high_water: normal.high_water_mark(),
            high: high.size(),
            high_high_water: high.high_water_mark(),
        }
    }

    // -----------------------------------------------------------------------
    // Lock and wait arbitration
    // -----------------------------------------------------------------------

    /// Enter one level of the system lock. Interrupts stay masked until
    /// every guard has been dropped.
    pub fn lock(&self) -> LockGuard<'_, P> {
        self.lock.lock()
    }

    pub fn request_wait(&self, actor: ActorId) {
        self.lock.request_wait(actor);
    }

    pub fn release_wait(&self, actor: ActorId) {
        self.lock.release_wait(actor);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Start (or restart) timer `id` of `actor`. On expiry the actor
    /// receives [`SYSTEM_RSP_TIMER`] carrying `id`. A zero period cancels.
    pub fn start_timer(&self, actor: ActorId, id: u16, period_ms: u32) {
        let ticks = match Self::ms_to_ticks(period_ms) {
            Ok(ticks) => ticks,
            Err(fault) => self.fatal(fault),
        };
        let key = TimerKey::new(actor, id);

        let expired = {
            let guard = self.lock.lock();
            let port = self.port();
            let elapsed = port.alarm_elapsed(true);
            port.alarm_stop();

            let mut timers = self.timers.borrow(guard.cs()).borrow_mut();
            let expired = match timers.start(key, ticks, elapsed) {
                Ok(expired) => expired,
                Err(fault) => self.fatal(fault),
            };
            self.rearm(timers.next_deadline());
            expired
        };

        log::debug!("timer {}:{} started for {} ms", actor, id, period_ms);
        self.notify(&expired);
    }

    /// Cancel timer `id` of `actor`. The alarm is left as is.
    pub fn stop_timer(&self, actor: ActorId, id: u16) {
        let guard = self.lock.lock();
        let stopped = self
            .timers
            .borrow(guard.cs())
            .borrow_mut()
            .stop(TimerKey::new(actor, id));
        if stopped {
            log::debug!("timer {}:{} stopped", actor, id);
        }
    }

    /// Hardware alarm callback: reconcile elapsed time, re-arm, and notify
    /// the owners of expired timers.
    pub fn alarm_expired(&self) {
        let expired = {
            let guard = self.lock.lock();
            let elapsed = self.port().alarm_elapsed(false);
            let mut timers = self.timers.borrow(guard.cs()).borrow_mut();
            let expired = timers.reconcile(elapsed);
            match timers.next_deadline() {
                Some(ticks) => self.rearm(Some(ticks)),
                None => self.port().alarm_stop(),
            }
            expired
        };
        self.notify(&expired);
    }

    fn rearm(&self, deadline: Option<u32>) {
        if let Some(ticks) = deadline {
            self.port()
                .alarm_start(ticks.clamp(P::ALARM_MIN_TICKS, P::ALARM_MAX_TICKS));
        }
    }

    fn notify(&self, expired: &Expired) {
        for key in expired {
            log::debug!("timer {}:{} expired", key.actor(), key.id());
            self.send(SYSTEM, key.actor(), SYSTEM_RSP_TIMER, &key.id().to_le_bytes());
        }
    }

    fn ms_to_ticks(period_ms: u32) -> Result<u32, Fault> {
        period_ms
            .checked_mul(P::TICKS_PER_MS)
            .filter(|&ticks| ticks <= MAX_TIMER_TICKS)
            .ok_or(Fault::TimerPeriodOverflow(period_ms))
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
