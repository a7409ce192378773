//! # TinyQ
//!
//! A cooperative, message-passing micro-kernel for single-core
//! microcontrollers with no heap and no preemptive scheduler.
//!
//! ## Overview
//!
//! Behavior lives in statically registered **actors** that talk only by
//! **signals**: small envelopes of `[from, to, code, len]` plus up to 255
//! payload bytes. The kernel gives them:
//!
//! - **A tiered signal bus.** Two byte queues, a deferred high-priority
//!   context for interface traffic and the main loop for logic traffic.
//! - **Software timers.** Up to 32 logical countdowns multiplexed onto one
//!   hardware alarm, reported back as signals.
//! - **Lock and wait arbitration.** A nested interrupt-masking lock and a
//!   wait counter that picks how deeply the idle loop may sleep.
//! - **A state machine helper** that actors use to structure their
//!   handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │             Actors (application, actor.rs)             │
//! │        on_signal() · StateMachine (state_machine.rs)   │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                 │
//! │   send() · start_timer() · request_wait() · step()     │
//! ├──────────────┬───────────────────┬─────────────────────┤
//! │  Signal bus  │   Timer table     │   Lock / wait       │
//! │  signal.rs   │   timer.rs        │   sync.rs           │
//! │  ring_buffer │                   │                     │
//! ├──────────────┴───────────────────┴─────────────────────┤
//! │                 Port trait (port.rs)                   │
//! │  IRQ mask · deferred context · sleep · alarm · halt    │
//! ├────────────────────────────────────────────────────────┤
//! │          Cortex-M port (arch/cortex_m.rs)              │
//! │        PRIMASK · PendSV · WFI · SysTick alarm          │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signal Flow
//!
//! ```text
//!   IRQ handler / actor ──send()──► high queue ──PendSV──► dispatch_high()
//!                            └────► normal queue ────────► step() ─► handler
//!   alarm IRQ ──alarm_expired()──► SYSTEM_RSP_TIMER ──► normal queue
//! ```
//!
//! Hardware interrupt handlers only enqueue. Actor handlers always run to
//! completion in one of the two software contexts.
//!
//! ## Memory Model
//!
//! - **No heap**: every queue and table is a fixed-size field of [`Kernel`]
//! - **One context value**: the kernel is built by a `const fn` and lives in
//!   a `static`; nothing else is global
//! - **One lock**: all shared state sits in `cortex_m::interrupt::Mutex`
//!   cells opened with the token carried by the system lock's guard

#![cfg_attr(not(test), no_std)]

pub mod actor;
pub mod arch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod port;
pub mod ring_buffer;
pub mod signal;
pub mod state_machine;
pub mod sync;
pub mod timer;

#[cfg(test)]
mod testing;

pub use actor::{Actor, SystemActor};
pub use error::Fault;
pub use kernel::{Activity, Kernel, QueueStats};
pub use port::{DebugPin, Port, SleepDepth};
pub use signal::{ActorId, SignalCode, SignalKind, Tier, BROADCAST, NO_TARGET, SYSTEM};
pub use state_machine::{Event, StateHandler, StateMachine, Transition};
