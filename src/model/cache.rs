//! One-shot derived-property cache
//!
//! Simple types carry a few properties (primitive link, fundamental
//! facets, QName-or-NOTATION flag) that are derived from the base chain
//! on first use and then shared by every concurrent validation session.
//! [`PropertyCache`] serializes the first computation and broadcasts its
//! completion; every later read is a short lock on the `Ready` state.
//!
//! The state machine is `Unset -> Computing -> Ready`. The computing
//! caller runs the closure with the lock released, so a recursive walk
//! over the base chain cannot self-deadlock.

use std::sync::{Condvar, Mutex};

#[derive(Debug)]
enum State<T> {
    Unset,
    Computing,
    Ready(T),
}

/// A one-shot, published-once cache cell.
#[derive(Debug)]
pub struct PropertyCache<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T: Clone> PropertyCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Unset),
            ready: Condvar::new(),
        }
    }

    /// Return the cached value, computing it with `compute` if this is
    /// the first call. Concurrent callers arriving during the computing
    /// window block until the value is published.
    pub fn get_or_init(&self, compute: impl FnOnce() -> T) -> T {
        {
            let mut state = self.state.lock().expect("property cache poisoned");
            loop {
                match &*state {
                    State::Ready(value) => return value.clone(),
                    State::Computing => {
                        state = self
                            .ready
                            .wait(state)
                            .expect("property cache poisoned");
                    }
                    State::Unset => {
                        *state = State::Computing;
                        break;
                    }
                }
            }
        }

        // Lock released while the (possibly recursive) computation runs.
        let value = compute();

        let mut state = self.state.lock().expect("property cache poisoned");
        *state = State::Ready(value.clone());
        self.ready.notify_all();
        value
    }

    /// Peek without computing; `None` until the first `get_or_init`
    /// completes.
    pub fn get(&self) -> Option<T> {
        match &*self.state.lock().expect("property cache poisoned") {
            State::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Default for PropertyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_computes_once() {
        let cache = PropertyCache::new();
        let calls = AtomicUsize::new(0);

        let a = cache.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            41
        });
        let b = cache.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            99
        });

        assert_eq!(a, 41);
        assert_eq!(b, 41);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_peek() {
        let cache = PropertyCache::new();
        assert_eq!(cache.get(), None);
        cache.get_or_init(|| "x");
        assert_eq!(cache.get(), Some("x"));
    }

    #[test]
    fn test_concurrent_readers_see_one_value() {
        let cache = Arc::new(PropertyCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(5));
                        7u32
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
