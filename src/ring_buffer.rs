//! # Circular Byte Buffer
//!
//! Fixed-capacity FIFO byte store backing both signal queues.
//!
//! ## Layout
//!
//! ```text
//!   storage: [u8; N]
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   │    │ d0 │ d1 │ d2 │ d3 │    │    │    │
//!   └────┴────┴────┴────┴────┴────┴────┴────┘
//!          ▲ front             ▲ back
//! ```
//!
//! One slot is always left unused so that `front == back` means empty and
//! never full. The usable capacity is therefore `N - 1`.
//!
//! Multi-byte copies are split into at most two contiguous `copy_from_slice`
//! calls when they straddle the physical end of storage.
//!
//! There is no internal locking. Every kernel access happens while the
//! system lock is held.

use crate::error::Fault;

/// A circular byte buffer with `N` bytes of backing storage.
pub struct RingBuffer<const N: usize> {
    front: usize,
    back: usize,
    high_water_mark: usize,
    storage: [u8; N],
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty buffer. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            front: 0,
            back: 0,
            high_water_mark: 0,
            storage: [0u8; N],
        }
    }

    /// Usable capacity in bytes (`N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of bytes currently stored.
    #[inline]
    pub fn size(&self) -> usize {
        if self.back < self.front {
            N - self.front + self.back
        } else {
            self.back - self.front
        }
    }

    /// Number of bytes that can still be pushed.
    #[inline]
    pub fn space(&self) -> usize {
        self.capacity() - self.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    /// Largest size observed since creation. Useful for sizing queues
    /// against real traffic.
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Discard all stored bytes.
    pub fn clear(&mut self) {
        self.front = 0;
        self.back = 0;
    }

    /// Append `data` at the back.
    pub fn push_back(&mut self, data: &[u8]) -> Result<(), Fault> {
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_space(data.len())?;

        self.copy_in(self.back, data);
        self.back = self.wrap(self.back + data.len());
        self.note_size();
        Ok(())
    }

    /// Remove `buf.len()` bytes from the front into `buf`.
    pub fn pop_front(&mut self, buf: &mut [u8]) -> Result<(), Fault> {
        if buf.is_empty() {
            return Ok(());
        }
        self.ensure_stored(buf.len())?;

        self.copy_out(self.front, buf);
        self.front = self.wrap(self.front + buf.len());
        Ok(())
    }

    /// Remove `count` bytes from the front without copying them anywhere.
    pub fn skip(&mut self, count: usize) -> Result<(), Fault> {
        self.ensure_stored(count)?;
        self.front = self.wrap(self.front + count);
        Ok(())
    }

    pub fn push_byte(&mut self, byte: u8) -> Result<(), Fault> {
        self.ensure_space(1)?;
        self.storage[self.back] = byte;
        self.back = self.wrap(self.back + 1);
        self.note_size();
        Ok(())
    }

    pub fn pop_byte(&mut self) -> Result<u8, Fault> {
        self.ensure_stored(1)?;
        let byte = self.storage[self.front];
        self.front = self.wrap(self.front + 1);
        Ok(byte)
    }

    /// Copy `buf.len()` bytes starting `offset` bytes past the front into
    /// `buf`. Cursors are not moved.
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), Fault> {
        self.ensure_stored(offset + buf.len())?;
        self.copy_out(self.wrap(self.front + offset), buf);
        Ok(())
    }

    /// Overwrite `data.len()` bytes starting `offset` bytes past the front.
    /// Cursors are not moved, so the written region only becomes visible to
    /// `pop_front` once it lies between front and back.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Fault> {
        if offset + data.len() > self.capacity() {
            return Err(Fault::BufferOverflow {
                requested: offset + data.len(),
                available: self.capacity(),
            });
        }
        self.copy_in(self.wrap(self.front + offset), data);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    #[inline]
    fn wrap(&self, index: usize) -> usize {
        if index >= N {
            index - N
        } else {
            index
        }
    }

    fn ensure_space(&self, requested: usize) -> Result<(), Fault> {
        let available = self.space();
        if requested > available {
            return Err(Fault::BufferOverflow { requested, available });
        }
        Ok(())
    }

    fn ensure_stored(&self, requested: usize) -> Result<(), Fault> {
        let available = self.size();
        if requested > available {
            return Err(Fault::BufferUnderflow { requested, available });
        }
        Ok(())
    }

    fn note_size(&mut self) {
        self.high_water_mark = self.high_water_mark.max(self.size());
    }

    /// Copy `data` into storage at physical index `start`, wrapping once.
    fn copy_in(&mut self, start: usize, data: &[u8]) {
        let first = data.len().min(N - start);
        self.storage[start..start + first].copy_from_slice(&data[..first]);
        if data.len() > first {
            self.storage[..data.len() - first].copy_from_slice(&data[first..]);
        }
    }

    /// Copy from physical index `start` into `buf`, wrapping once.
    fn copy_out(&self, start: usize, buf: &mut [u8]) {
        let first = buf.len().min(N - start);
        buf[..first].copy_from_slice(&self.storage[start..start + first]);
        if buf.len() > first {
            let rest = buf.len() - first;
            buf[first..].copy_from_slice(&self.storage[..rest]);
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Advance both cursors by `shift` so later operations start mid-storage.
    fn offset_buffer<const N: usize>(shift: usize) -> RingBuffer<N> {
        let mut ring = RingBuffer::<N>::new();
        for _ in 0..shift {
            ring.push_byte(0xAA).unwrap();
            ring.pop_byte().unwrap();
        }
        ring
    }

    #[test]
    fn test_empty_buffer() {
        let ring = RingBuffer::<8>::new();
        assert!(ring.is_empty());
        assert_eq!(ring.size(), 0);
        assert_eq!(ring.capacity(), 7);
        assert_eq!(ring.space(), 7);
    }

    #[test]
    fn test_fills_to_capacity_minus_one() {
        let mut ring = RingBuffer::<8>::new();
        ring.push_back(&[1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(ring.size(), 7);
        assert_eq!(ring.space(), 0);
        assert!(!ring.is_empty());

        assert_eq!(
            ring.push_byte(8),
            Err(Fault::BufferOverflow { requested: 1, available: 0 })
        );
    }

    #[test]
    fn test_push_rejects_oversized_write() {
        let mut ring = RingBuffer::<8>::new();
        ring.push_back(&[1, 2, 3]).unwrap();
        assert_eq!(
            ring.push_back(&[0; 5]),
            Err(Fault::BufferOverflow { requested: 5, available: 4 })
        );
        // Failed push leaves contents untouched
        assert_eq!(ring.size(), 3);
    }

    #[test]
    fn test_pop_rejects_underflow() {
        let mut ring = RingBuffer::<8>::new();
        ring.push_back(&[1, 2]).unwrap();
        let mut out = [0u8; 3];
        assert_eq!(
            ring.pop_front(&mut out),
            Err(Fault::BufferUnderflow { requested: 3, available: 2 })
        );
        assert_eq!(
            RingBuffer::<4>::new().pop_byte(),
            Err(Fault::BufferUnderflow { requested: 1, available: 0 })
        );
    }

    #[test]
    fn test_wraparound_copy() {
        let mut ring = offset_buffer::<8>(6);
        ring.push_back(&[10, 11, 12, 13, 14]).unwrap();
        assert_eq!(ring.size(), 5);

        let mut out = [0u8; 5];
        ring.pop_front(&mut out).unwrap();
        assert_eq!(out, [10, 11, 12, 13, 14]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_byte_ops_interleave_with_bulk() {
        let mut ring = RingBuffer::<6>::new();
        ring.push_byte(1).unwrap();
        ring.push_back(&[2, 3]).unwrap();
        assert_eq!(ring.pop_byte(), Ok(1));
        ring.push_back(&[4, 5, 6]).unwrap();

        let mut out = [0u8; 5];
        ring.pop_front(&mut out).unwrap();
        assert_eq!(out, [2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_read_peeks_without_consuming() {
        let mut ring = offset_buffer::<8>(5);
        ring.push_back(&[1, 2, 3, 4, 5]).unwrap();

        let mut peek = [0u8; 3];
        ring.read(2, &mut peek).unwrap();
        assert_eq!(peek, [3, 4, 5]);
        assert_eq!(ring.size(), 5);

        let mut too_far = [0u8; 2];
        assert!(ring.read(4, &mut too_far).is_err());
    }

    #[test]
    fn test_write_patches_in_place() {
        let mut ring = offset_buffer::<8>(6);
        ring.push_back(&[1, 2, 3, 4]).unwrap();
        ring.write(1, &[20, 30]).unwrap();

        let mut out = [0u8; 4];
        ring.pop_front(&mut out).unwrap();
        assert_eq!(out, [1, 20, 30, 4]);

        assert!(ring.write(6, &[0, 0]).is_err());
    }

    #[test]
    fn test_skip_and_clear() {
        let mut ring = RingBuffer::<8>::new();
        ring.push_back(&[1, 2, 3, 4]).unwrap();
        ring.skip(3).unwrap();
        assert_eq!(ring.pop_byte(), Ok(4));
        assert!(ring.skip(1).is_err());

        ring.push_back(&[9, 9]).unwrap();
        ring.clear();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_high_water_mark() {
        let mut ring = RingBuffer::<16>::new();
        ring.push_back(&[0; 9]).unwrap();
        ring.skip(9).unwrap();
        ring.push_back(&[0; 4]).unwrap();
        assert_eq!(ring.high_water_mark(), 9);
    }

    proptest! {
        #[test]
        fn round_trip_survives_wraparound(
            shift in 0usize..64,
            data in proptest::collection::vec(any::<u8>(), 0..=63),
        ) {
            let mut ring = offset_buffer::<64>(shift);
            ring.push_back(&data).unwrap();
            prop_assert_eq!(ring.size(), data.len());

            let mut out = vec![0u8; data.len()];
            ring.pop_front(&mut out).unwrap();
            prop_assert_eq!(out, data);
            prop_assert!(ring.is_empty());
        }
    }
}
