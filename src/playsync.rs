// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A cancel handle shared between a controlling thread and a worker (an output stream, the
/// progress monitor, or a voice). Checking the flag is lock-free so the render path can poll it
/// every cycle; the mutex and condvar are only used by threads that want to block until
/// cancellation.
#[derive(Clone)]
pub struct CancelHandle {
    /// Set once the underlying operation should stop.
    cancelled: Arc<AtomicBool>,
    /// Guards the condvar wait.
    lock: Arc<Mutex<()>>,
    /// The condvar will handle notification of cancelling.
    condvar: Arc<Condvar>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
            lock: Arc::new(Mutex::new(())),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the handle has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Waits until the handle is cancelled or the timeout elapses. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_cancelled() {
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                return self.is_cancelled();
            }
        }
        true
    }

    /// Cancels the handle and wakes any waiters. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            let _guard = self.lock.lock();
            self.condvar.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || cancel_handle.wait_timeout(Duration::from_secs(10)))
        };

        cancel_handle.cancel();
        assert!(join.join().unwrap());
        assert!(cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_handle_timeout() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.wait_timeout(Duration::from_millis(10)));
        assert!(!cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_twice() {
        let cancel_handle = CancelHandle::new();
        cancel_handle.cancel();
        cancel_handle.cancel();
        assert!(cancel_handle.wait_timeout(Duration::ZERO));
    }
}
