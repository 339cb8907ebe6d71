//! Sequence-number allocation.
//!
//! One allocator is typically created per channel group and shared among all
//! callers operating on it; correlation of completions back to requests rests
//! entirely on these numbers being unique.

use std::sync::atomic::{AtomicU32, Ordering};

use super::constants::SEQ_NUM_MODULUS;

/// Thread-safe monotonically increasing sequence counter.
///
/// `bump` returns the current value and increments atomically: for k calls
/// from any mix of threads the returned set is exactly `{n0..n0+k-1}` with no
/// duplicate or gap (modulo the 8-digit wire width).
#[derive(Debug)]
pub struct SequenceNumberAllocator {
    counter: AtomicU32,
}

impl SequenceNumberAllocator {
    /// Create an allocator starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create an allocator starting at the given value.
    pub fn starting_at(seq_num: u32) -> Self {
        Self {
            counter: AtomicU32::new(seq_num % SEQ_NUM_MODULUS),
        }
    }

    /// Return the current number and increment, in one atomic operation.
    pub fn bump(&self) -> u32 {
        let mut current = self.counter.load(Ordering::Relaxed);
        loop {
            let next = (current + 1) % SEQ_NUM_MODULUS;
            match self.counter.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current,
                Err(observed) => current = observed,
            }
        }
    }

    /// Peek at the next value `bump` would return, without incrementing.
    pub fn current(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }

    /// Overwrite the counter, used when resynchronizing with a peer.
    pub fn reset(&self, seq_num: u32) {
        self.counter.store(seq_num % SEQ_NUM_MODULUS, Ordering::Release);
    }
}

impl Default for SequenceNumberAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_bump_returns_then_increments() {
        let alloc = SequenceNumberAllocator::new();
        assert_eq!(alloc.bump(), 0);
        assert_eq!(alloc.current(), 1);

        let alloc = SequenceNumberAllocator::starting_at(692_784);
        assert_eq!(alloc.bump(), 692_784);
        assert_eq!(alloc.current(), 692_785);
    }

    #[test]
    fn test_reset() {
        let alloc = SequenceNumberAllocator::starting_at(692_784);
        alloc.reset(473_923);
        assert_eq!(alloc.bump(), 473_923);
        assert_eq!(alloc.current(), 473_924);
    }

    #[test]
    fn test_wraps_at_wire_width() {
        let alloc = SequenceNumberAllocator::starting_at(SEQ_NUM_MODULUS - 1);
        assert_eq!(alloc.bump(), SEQ_NUM_MODULUS - 1);
        assert_eq!(alloc.bump(), 0);
    }

    #[test]
    fn test_concurrent_bumps_are_unique() {
        let alloc = Arc::new(SequenceNumberAllocator::starting_at(100));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = Arc::clone(&alloc);
            handles.push(thread::spawn(move || {
                (0..250).map(|_| alloc.bump()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for n in handle.join().unwrap() {
                assert!(seen.insert(n), "duplicate sequence number {n}");
            }
        }

        // 8 threads x 250 bumps from 100: exactly {100..2099}.
        assert_eq!(seen.len(), 2000);
        assert_eq!(seen.iter().min(), Some(&100));
        assert_eq!(seen.iter().max(), Some(&2099));
    }
}
