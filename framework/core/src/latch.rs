use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A counting barrier that releases every waiter once it has been counted down to zero.
///
/// Used as the rendezvous between a caller and a background thread: the thread counts down when
/// it reaches a milestone (started, stopped) and the caller blocks in [CountdownLatch::wait]
/// until it does. Counting down past zero has no effect.
#[derive(Debug)]
pub struct CountdownLatch {
    count: Mutex<usize>,
    released: Condvar,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }

        *count -= 1;
        if *count == 0 {
            self.released.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Block until the count reaches zero. Returns immediately if it already has.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.released.wait(&mut count);
        }
    }

    /// Block until the count reaches zero or the timeout elapses. Returns true if the latch was
    /// released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        while *count > 0 {
            if self.released.wait_for(&mut count, timeout).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}
