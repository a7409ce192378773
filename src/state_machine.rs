//! # State Machine Helper
//!
//! Table-driven finite state machine for structuring actor behavior.
//!
//! A machine is a table of handler functions indexed by state. Each handler
//! sees three kinds of [`Event`]: `Enter` when its state becomes current
//! (with a 32-bit parameter), `Leave` when it stops being current, and
//! `Signal` for everything the owning actor forwards.
//!
//! ## Transitions
//!
//! ```text
//!   goto_state(new, param)
//!     ├─► old handler: Leave          (skipped when stateless)
//!     ├─► last_state = old, state = new
//!     └─► new handler: Enter{param}   (skipped when new is out of range)
//! ```
//!
//! Handlers never call back into the machine that is running them. They
//! return a [`Transition`] instead:
//!
//! | Returned from | `Transition::Goto` |
//! |---------------|--------------------|
//! | `Signal` | applied once the handler returns |
//! | `Enter`  | applied after the entry completes, as a chained transition |
//! | `Leave`  | ignored |
//!
//! An out-of-range target leaves the machine stateless. It stays that way,
//! and rejects signals with [`Fault::NoActiveState`], until the next
//! transition to a valid state.

use crate::error::Fault;
use crate::signal::{ActorId, SignalCode};

/// What a state handler is asked to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'p> {
    Enter { param: u32 },
    Leave,
    Signal { msg: u16, payload: &'p [u8] },
}

/// A handler's request to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Goto(usize, u32),
}

/// Handler for one state. `C` is the owning actor's context.
pub type StateHandler<C> = fn(&mut C, Event<'_>) -> Transition;

/// Compose the 16-bit state-machine message for a bus signal: sender in
/// the high byte, code in the low byte.
#[inline]
pub const fn message(from: ActorId, code: SignalCode) -> u16 {
    ((from as u16) << 8) | code.raw() as u16
}

/// A running state machine over the context type `C`.
pub struct StateMachine<C: 'static> {
    table: &'static [StateHandler<C>],
    state: Option<usize>,
    last_state: Option<usize>,
}

impl<C: 'static> StateMachine<C> {
    /// A machine over `table` that has not entered any state yet.
    pub const fn new(table: &'static [StateHandler<C>]) -> Self {
        Self {
            table,
            state: None,
            last_state: None,
        }
    }

    /// Reset to stateless and enter state 0 with parameter 0.
    pub fn init(&mut self, ctx: &mut C) {
        self.state = None;
        self.goto_state(ctx, 0, 0);
    }

    /// Current state, or `None` when stateless.
    #[inline]
    pub fn state(&self) -> Option<usize> {
        self.state
    }

    /// State before the most recent transition.
    #[inline]
    pub fn last_state(&self) -> Option<usize> {
        self.last_state
    }

    /// Leave the current state and enter `new_state` with `param`.
    pub fn goto_state(&mut self, ctx: &mut C, new_state: usize, param: u32) {
        let mut next = Some((new_state, param));
        while let Some((target, param)) = next.take() {
            if let Some(handler) = self.handler() {
                let _ = handler(ctx, Event::Leave);
            }
            self.last_state = self.state;
            self.state = (target < self.table.len()).then_some(target);
            log::trace!("state {:?} -> {:?}", self.last_state, self.state);

            if let Some(handler) = self.handler() {
                if let Transition::Goto(state, param) = handler(ctx, Event::Enter { param }) {
                    next = Some((state, param));
                }
            }
        }
    }

    /// Hand `msg` to the current state's handler.
    pub fn signal_entry(&mut self, ctx: &mut C, msg: u16, payload: &[u8]) -> Result<(), Fault> {
        let handler = self.handler().ok_or(Fault::NoActiveState)?;
        if let Transition::Goto(state, param) = handler(ctx, Event::Signal { msg, payload }) {
            self.goto_state(ctx, state, param);
        }
        Ok(())
    }

    fn handler(&self) -> Option<StateHandler<C>> {
        self.state.map(|state| self.table[state])
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
