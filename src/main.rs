//! # TinyQ Demo Firmware
//!
//! A minimal image showing how a board wires up the kernel:
//!
//! | Id | Actor | Behavior |
//! |----|-------|----------|
//! | 0 | `SystemActor` | Reserved, ignores everything |
//! | 1 | `Heartbeat` | Two-state machine toggling a beat on a periodic timer |
//!
//! ## Heartbeat
//!
//! ```text
//!        SYSTEM_NTF_START
//!              │
//!              ▼
//!   ┌──────┐  timer  ┌──────┐
//!   │ Rest │ ──────► │ Beat │
//!   │ 900ms│ ◄────── │100ms │
//!   └──────┘  timer  └──────┘
//! ```
//!
//! SysTick backs the alarm and stops in deep sleep, so the heartbeat
//! holds a wait request for as long as it runs.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cortex_m_rt::{entry, exception};
use panic_halt as _;

use tinyq::actor::{timer_id, SYSTEM_NTF_START, SYSTEM_RSP_TIMER};
use tinyq::arch::cortex_m::{CortexM, SysTickAlarm};
use tinyq::state_machine::message;
use tinyq::{
    Actor, ActorId, Event, Kernel, SignalCode, StateHandler, StateMachine, SystemActor, Transition,
    SYSTEM,
};

type Board = CortexM<SysTickAlarm>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

const HEARTBEAT_ID: ActorId = 1;

static HEARTBEAT: Heartbeat = Heartbeat::new();

static ACTORS: [&dyn Actor<Board>; 2] = [&SystemActor, &HEARTBEAT];

static KERNEL: Kernel<'static, Board> = Kernel::new(CortexM::new(SysTickAlarm::new()), &ACTORS);

// ---------------------------------------------------------------------------
// Heartbeat actor
// ---------------------------------------------------------------------------

const BEAT_TIMER: u16 = 0;
const REST_MS: u32 = 900;
const BEAT_MS: u32 = 100;

const REST: usize = 0;
const BEAT: usize = 1;

/// Timer expiry as seen by the state machine.
const TIMER_MSG: u16 = message(SYSTEM, SYSTEM_RSP_TIMER);

struct Pulse {
    beats: u32,
}

struct HeartbeatInner {
    sm: StateMachine<Pulse>,
    pulse: Pulse,
}

struct Heartbeat {
    inner: RefCell<HeartbeatInner>,
}

// SAFETY: the heartbeat only receives normal-tier signals, so it is only
// ever touched from the main dispatch loop.
unsafe impl Sync for Heartbeat {}

const HEARTBEAT_STATES: [StateHandler<Pulse>; 2] = [rest, beat];

impl Heartbeat {
    const fn new() -> Self {
        Self {
            inner: RefCell::new(HeartbeatInner {
                sm: StateMachine::new(&HEARTBEAT_STATES),
                pulse: Pulse { beats: 0 },
            }),
        }
    }
}

impl Actor<Board> for Heartbeat {
    fn on_signal(
        &self,
        kernel: &Kernel<'_, Board>,
        me: ActorId,
        from: ActorId,
        code: SignalCode,
        payload: &[u8],
    ) {
        let mut inner = self.inner.borrow_mut();
        let HeartbeatInner { sm, pulse } = &mut *inner;

        if code == SYSTEM_NTF_START && from == SYSTEM {
            kernel.request_wait(me);
            sm.init(pulse);
            return;
        }
        if code == SYSTEM_RSP_TIMER && timer_id(payload) != Some(BEAT_TIMER) {
            return;
        }
        if let Err(fault) = sm.signal_entry(pulse, message(from, code), payload) {
            kernel.fatal(fault);
        }
    }
}

fn rest(_pulse: &mut Pulse, event: Event<'_>) -> Transition {
    match event {
        Event::Enter { .. } => {
            KERNEL.start_timer(HEARTBEAT_ID, BEAT_TIMER, REST_MS);
            Transition::Stay
        }
        Event::Signal { msg: TIMER_MSG, .. } => Transition::Goto(BEAT, 0),
        _ => Transition::Stay,
    }
}

fn beat(pulse: &mut Pulse, event: Event<'_>) -> Transition {
    match event {
        Event::Enter { .. } => {
            pulse.beats = pulse.beats.wrapping_add(1);
            log::info!("heartbeat {}", pulse.beats);
            KERNEL.start_timer(HEARTBEAT_ID, BEAT_TIMER, BEAT_MS);
            Transition::Stay
        }
        Event::Signal { msg: TIMER_MSG, .. } => Transition::Goto(REST, 0),
        _ => Transition::Stay,
    }
}

// ---------------------------------------------------------------------------
// Exceptions and entry
// ---------------------------------------------------------------------------

#[exception]
fn PendSV() {
    KERNEL.dispatch_high();
}

#[exception]
fn SysTick() {
    KERNEL.alarm_expired();
}

/// Firmware entry point. Starts the kernel; does not return.
#[entry]
fn main() -> ! {
    KERNEL.run()
}
