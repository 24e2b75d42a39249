//! # Shared Economy Handle
//!
//! For hosts whose production tick and refresh tick run on different
//! threads. One coarse lock guards every read and every write; both ticks are
//! short, so contention stays negligible.

use std::sync::Arc;

use creamery_economy::{Economy, EconomySnapshot};
use parking_lot::{Mutex, MutexGuard};

/// Cloneable handle to one economy behind a single lock.
#[derive(Clone, Debug)]
pub struct SharedEconomy {
    inner: Arc<Mutex<Economy>>,
}

impl SharedEconomy {
    /// Wraps an economy.
    #[must_use]
    pub fn new(economy: Economy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(economy)),
        }
    }

    /// Runs `f` with read access.
    pub fn read<R>(&self, f: impl FnOnce(&Economy) -> R) -> R {
        f(&*self.inner.lock())
    }

    /// Runs `f` with write access.
    pub fn write<R>(&self, f: impl FnOnce(&mut Economy) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    /// Locks for a longer sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, Economy> {
        self.inner.lock()
    }

    /// Captures a snapshot under the lock.
    #[must_use]
    pub fn snapshot(&self) -> EconomySnapshot {
        self.read(Economy::snapshot)
    }

    /// Number of handles sharing this economy.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creamery_economy::{Amount, EconomyConfig};
    use std::thread;

    #[test]
    fn test_ticks_and_reads_from_two_threads() {
        let shared = SharedEconomy::new(EconomyConfig::creamery().unwrap().build().unwrap());
        let milk = shared.read(|e| e.resource_id("milk").unwrap());
        let cow = shared.read(|e| e.building_id("Cow").unwrap());

        shared.write(|e| {
            e.collect(milk, Amount::from_whole(10)).unwrap();
            e.buy(cow).unwrap();
        });

        let ticker = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    shared.write(Economy::tick);
                }
            })
        };
        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = shared.snapshot();
                    assert!(snapshot.resources[0].amount <= snapshot.resources[0].capacity);
                }
            })
        };
        ticker.join().unwrap();
        reader.join().unwrap();

        assert_eq!(shared.read(Economy::tick_count), 100);
        assert_eq!(shared.read(|e| e.amount(milk)), Amount::from_whole(63));
        assert_eq!(shared.handle_count(), 1);
    }
}
