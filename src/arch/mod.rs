//! # Architecture Ports
//!
//! Implementations of [`Port`](crate::port::Port) for real hardware.
//! Currently provides the Cortex-M port; other cores slot in as sibling
//! modules.

pub mod cortex_m;
