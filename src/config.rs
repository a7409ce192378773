//! # TinyQ Configuration
//!
//! Compile-time constants governing queue sizing and the timer service.
//! All limits are fixed at compile time; nothing is allocated dynamically.
//!
//! Tick-rate constants belong to the hardware port instead (see
//! [`Port::TICKS_PER_MS`](crate::port::Port::TICKS_PER_MS)), since they
//! depend on which counter backs the alarm.

use static_assertions::const_assert;

/// Backing storage of the normal (logic) queue in bytes. One byte is
/// permanently reserved, so the usable capacity is one less.
///
/// Size this for the worst-case burst of normal-tier traffic: overflow is
/// fatal.
pub const NORMAL_QUEUE_SIZE: usize = 256 * 2;

/// Backing storage of the high (interface) queue in bytes.
pub const HIGH_QUEUE_SIZE: usize = 256 * 2;

/// Largest payload a single signal may carry. The envelope stores the
/// length in one byte.
pub const MAX_PAYLOAD: usize = 255;

/// Number of logical timers that may be live at once. Equal to the width
/// of the occupancy bitmap.
pub const TIMER_SLOTS: usize = 32;

/// Ceiling of the hardware tick domain. A timer period that converts to
/// more ticks than this is rejected.
pub const MAX_TIMER_TICKS: u32 = 0x7fff_ffff;

/// System clock frequency in Hz (STM32F0 HSI at 8 MHz). Used by the
/// Cortex-M port for SysTick reloads and busy-wait delays.
pub const SYSTEM_CLOCK_HZ: u32 = 8_000_000;

// A queue must be able to hold at least one maximal envelope.
const_assert!(NORMAL_QUEUE_SIZE > crate::signal::Header::SIZE + MAX_PAYLOAD);
const_assert!(HIGH_QUEUE_SIZE > crate::signal::Header::SIZE + MAX_PAYLOAD);
const_assert!(TIMER_SLOTS == u32::BITS as usize);
