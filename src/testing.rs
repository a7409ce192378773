//! Host-side doubles shared by the unit tests.

use std::sync::Mutex;

use crate::actor::Actor;
use crate::error::Fault;
use crate::kernel::Kernel;
use crate::port::{Port, SleepDepth};
use crate::signal::{ActorId, SignalCode};

// ---------------------------------------------------------------------------
// Mock port
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    Init,
    DisableIrq,
    EnableIrq,
    PendHigh,
    Sleep(SleepDepth),
    AlarmStart(u32),
    AlarmStop,
}

#[derive(Default)]
struct MockState {
    events: Vec<PortEvent>,
    irq_enabled: bool,
    now: u32,
    reference: Option<u32>,
    high_pending: bool,
}

/// Records every port call and simulates a free-running alarm counter
/// that only moves when a test calls [`MockPort::advance`].
pub struct MockPort {
    state: Mutex<MockState>,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                irq_enabled: true,
                ..MockState::default()
            }),
        }
    }

    pub fn advance(&self, ticks: u32) {
        self.state.lock().unwrap().now += ticks;
    }

    pub fn events(&self) -> Vec<PortEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    pub fn irq_enabled(&self) -> bool {
        self.state.lock().unwrap().irq_enabled
    }

    pub fn count(&self, event: PortEvent) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    /// Alarm arm requests, in order.
    pub fn alarm_starts(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PortEvent::AlarmStart(ticks) => Some(ticks),
                _ => None,
            })
            .collect()
    }

    /// Whether the deferred context was requested; clears the request.
    pub fn take_high_pending(&self) -> bool {
        core::mem::take(&mut self.state.lock().unwrap().high_pending)
    }

    fn record(&self, event: PortEvent) {
        self.state.lock().unwrap().events.push(event);
    }
}

impl Port for MockPort {
    const TICKS_PER_MS: u32 = 1;
    const ALARM_MIN_TICKS: u32 = 1;
    const ALARM_MAX_TICKS: u32 = 10_000;

    fn init(&self) {
        self.record(PortEvent::Init);
    }

    fn disable_irq(&self) {
        let mut state = self.state.lock().unwrap();
        state.irq_enabled = false;
        state.events.push(PortEvent::DisableIrq);
    }

    fn enable_irq(&self) {
        let mut state = self.state.lock().unwrap();
        state.irq_enabled = true;
        state.events.push(PortEvent::EnableIrq);
    }

    fn pend_high_dispatch(&self) {
        let mut state = self.state.lock().unwrap();
        state.high_pending = true;
        state.events.push(PortEvent::PendHigh);
    }

    fn sleep(&self, depth: SleepDepth) {
        self.record(PortEvent::Sleep(depth));
    }

    fn alarm_start(&self, ticks: u32) {
        let mut state = self.state.lock().unwrap();
        state.reference = Some(state.now);
        state.events.push(PortEvent::AlarmStart(ticks));
    }

    fn alarm_stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.reference = None;
        state.events.push(PortEvent::AlarmStop);
    }

    fn alarm_elapsed(&self, reset: bool) -> u32 {
        let mut state = self.state.lock().unwrap();
        let Some(reference) = state.reference else {
            return 0;
        };
        let elapsed = state.now - reference;
        if reset {
            state.reference = Some(state.now);
        }
        elapsed
    }

    fn halt(&self, fault: Fault) -> ! {
        panic!("fatal: {fault}");
    }

    fn reset(&self) -> ! {
        panic!("reset requested");
    }

    fn delay_us(&self, _us: u32) {}
}

// ---------------------------------------------------------------------------
// Recording actor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub me: ActorId,
    pub from: ActorId,
    pub code: SignalCode,
    pub payload: Vec<u8>,
}

/// Delivery log shared by several recorders, so tests can assert on the
/// global order across actors.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<Delivery>>,
}

impl Journal {
    pub fn entries(&self) -> Vec<Delivery> {
        self.entries.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Delivery> {
        core::mem::take(&mut *self.entries.lock().unwrap())
    }
}

pub struct Recorder<'j> {
    journal: &'j Journal,
}

impl<'j> Recorder<'j> {
    pub fn new(journal: &'j Journal) -> Self {
        Self { journal }
    }
}

impl<P: Port> Actor<P> for Recorder<'_> {
    fn on_signal(
        &self,
        _kernel: &Kernel<'_, P>,
        me: ActorId,
        from: ActorId,
        code: SignalCode,
        payload: &[u8],
    ) {
        self.journal.entries.lock().unwrap().push(Delivery {
            me,
            from,
            code,
            payload: payload.to_vec(),
        });
    }
}
