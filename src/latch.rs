//! A counting latch, used to track the pool's live worker threads.

use crate::platform::*;

// -----------------------------------------------------------------------------
// Count latch

/// A [`CountLatch`] is a counter that a thread can block on until it reaches
/// zero. Each live worker holds one count. Teardown waits for the count to
/// drain, and the worker that brings it to zero wakes the waiting thread.
///
/// The count is also read without blocking, as an advisory input to the
/// pool's spawn decisions.
pub struct CountLatch {
    count: AtomicU32,
}

impl CountLatch {
    /// Creates a new latch with a count of zero.
    pub fn new() -> CountLatch {
        CountLatch {
            count: AtomicU32::new(0),
        }
    }

    /// Returns the current count. The value may be stale by the time it is
    /// used.
    #[inline(always)]
    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Adds one to the count.
    #[inline(always)]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes one from the count, waking any thread in `wait` if the count
    /// reaches zero.
    ///
    /// The caller must keep the latch alive until this returns, even if the
    /// woken thread would otherwise be free to deallocate it.
    #[inline]
    pub fn count_down(&self) {
        if self.count.fetch_sub(1, Ordering::Release) == 1 {
            wake_all(&self.count);
        }
    }

    /// Blocks the current thread until the count is zero.
    pub fn wait(&self) {
        loop {
            let count = self.count.load(Ordering::Acquire);
            if count == 0 {
                return;
            }
            wait(&self.count, count);
        }
    }
}

impl Default for CountLatch {
    fn default() -> CountLatch {
        CountLatch::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use alloc::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn wait_on_zero_returns() {
        let latch = CountLatch::new();
        latch.wait();
        assert_eq!(latch.get(), 0);
    }

    #[test]
    fn wait_for_other_threads() {
        let latch = Arc::new(CountLatch::new());
        for _ in 0..4 {
            latch.increment();
        }
        assert_eq!(latch.get(), 4);

        let handles: alloc::vec::Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.count_down())
            })
            .collect();

        latch.wait();
        assert_eq!(latch.get(), 0);

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
