use crate::error::{Result, RingError};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Optional point in time after which a blocking operation gives up.
///
/// `Deadline::never()` waits indefinitely; the timed variants turn an expired
/// wait into [`RingError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn never() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now. Durations too large to represent wait
    /// forever.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn from_option(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::never, Self::after)
    }

    pub fn is_never(&self) -> bool {
        self.0.is_none()
    }

    pub fn has_elapsed(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Acquire `mutex`, giving up once the deadline passes.
    pub fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>> {
        match self.0 {
            None => Ok(mutex.lock()),
            Some(at) => mutex.try_lock_until(at).ok_or(RingError::Timeout),
        }
    }

    /// Park once on `condvar`, releasing `guard` while asleep.
    ///
    /// Returns `Err(Timeout)` when the deadline passed during the wait.
    /// Callers re-check their predicate either way.
    pub fn wait<T>(&self, condvar: &Condvar, guard: &mut MutexGuard<'_, T>) -> Result<()> {
        match self.0 {
            None => {
                condvar.wait(guard);
                Ok(())
            }
            Some(at) => {
                if condvar.wait_until(guard, at).timed_out() {
                    Err(RingError::Timeout)
                } else {
                    Ok(())
                }
            }
        }
    }
}
