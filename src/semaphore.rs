//! A small blocking counting semaphore.
//!
//! Thread-per-connection analogue of the original's `setrlimit(RLIMIT_NPROC,
//! ...)` ceiling (spec.md §4.8, §6): the supervisor acquires a permit before
//! spawning a worker thread and blocks if none are free, and the worker
//! releases its permit on exit. No extra crate is pulled in for this —
//! `Mutex` + `Condvar` is the textbook construction and the counts involved
//! here are small enough that the classic implementation is plenty fast.

use std::sync::{Arc, Condvar, Mutex};

struct Inner {
    available: Mutex<usize>,
    cond: Condvar,
}

/// A cloneable handle to a fixed-size pool of permits.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<Inner>,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                available: Mutex::new(permits),
                cond: Condvar::new(),
            }),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) -> Permit {
        let mut available = self.inner.available.lock().unwrap();
        while *available == 0 {
            available = self.inner.cond.wait(available).unwrap();
        }
        *available -= 1;
        Permit {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Returned by [`Semaphore::acquire`]; releases the permit when dropped.
pub struct Permit {
    inner: Arc<Inner>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut available = self.inner.available.lock().unwrap();
        *available += 1;
        self.inner.cond.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn limits_concurrent_holders() {
        let sem = Semaphore::new(2);
        let p1 = sem.acquire();
        let p2 = sem.acquire();

        let sem2 = sem.clone();
        let got_third = Arc::new(Mutex::new(false));
        let got_third2 = Arc::clone(&got_third);
        let handle = thread::spawn(move || {
            let _p3 = sem2.acquire();
            *got_third2.lock().unwrap() = true;
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!*got_third.lock().unwrap());

        drop(p1);
        handle.join().unwrap();
        assert!(*got_third.lock().unwrap());
        drop(p2);
    }
}
