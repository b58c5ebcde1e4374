//! Lock helpers
//!
//! A poisoned lock means a writer panicked mid-update; the record can no
//! longer be trusted, so callers get `ConcurrencyConflict` instead of a panic.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use types::errors::ExchangeError;

pub fn lock<'a, T>(mutex: &'a Mutex<T>, resource: &str) -> Result<MutexGuard<'a, T>, ExchangeError> {
    mutex.lock().map_err(|_| ExchangeError::conflict(resource))
}

pub fn read<'a, T>(lock: &'a RwLock<T>, resource: &str) -> Result<RwLockReadGuard<'a, T>, ExchangeError> {
    lock.read().map_err(|_| ExchangeError::conflict(resource))
}

pub fn write<'a, T>(lock: &'a RwLock<T>, resource: &str) -> Result<RwLockWriteGuard<'a, T>, ExchangeError> {
    lock.write().map_err(|_| ExchangeError::conflict(resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_poisoned_mutex_reports_conflict() {
        let mutex = Arc::new(Mutex::new(0u32));
        let poisoner = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();

        let result = lock(&mutex, "wallet:test");
        assert_eq!(
            result.err(),
            Some(ExchangeError::conflict("wallet:test"))
        );
    }

    #[test]
    fn test_healthy_lock() {
        let rw = RwLock::new(5);
        assert_eq!(*read(&rw, "coin").unwrap(), 5);
        *write(&rw, "coin").unwrap() = 6;
        assert_eq!(*read(&rw, "coin").unwrap(), 6);
    }
}
