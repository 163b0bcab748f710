//! Small blocking helpers shared by the registry and the shutdown coordinator.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Runs `operation` with exclusive access to the data behind `mutex`.
///
/// The lock is released when `operation` returns or unwinds.
#[inline]
pub fn synchronized<T, R>(mutex: &Mutex<T>, operation: impl FnOnce(&mut T) -> R) -> R {
  let mut guard = mutex.lock();
  operation(&mut *guard)
}

/// Like [`synchronized`], but also hands the condition variable paired with
/// `mutex` to `operation` so it can notify waiters while holding the lock.
#[inline]
pub fn synchronized_with_condition<T, R>(
  mutex: &Mutex<T>,
  cond: &Condvar,
  operation: impl FnOnce(&mut T, &Condvar) -> R,
) -> R {
  let mut guard = mutex.lock();
  operation(&mut *guard, cond)
}

/// Waits on `cond` until `satisfied` holds or `timeout` elapses.
///
/// Returns `true` if the predicate was satisfied before the deadline and
/// `false` if the wait ended because the timer fired. Spurious wakeups are
/// absorbed by re-checking the predicate.
pub fn wait_with_timeout<T>(
  cond: &Condvar,
  guard: &mut MutexGuard<'_, T>,
  timeout: Duration,
  mut satisfied: impl FnMut(&mut T) -> bool,
) -> bool {
  let deadline = Instant::now() + timeout;
  while !satisfied(&mut **guard) {
    if cond.wait_until(guard, deadline).timed_out() {
      return satisfied(&mut **guard);
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn synchronized_produces_sane_results() {
    let counter = Mutex::new(0usize);
    const THREADS: usize = 8;
    const ITERATIONS: usize = 10_000;

    thread::scope(|s| {
      for _ in 0..THREADS {
        s.spawn(|| {
          for _ in 0..ITERATIONS {
            synchronized(&counter, |x| *x += 1);
          }
        });
      }
    });

    assert_eq!(*counter.lock(), THREADS * ITERATIONS);
  }

  #[test]
  fn wait_with_timeout_reports_timer_expiry() {
    let mutex = Mutex::new(false);
    let cond = Condvar::new();

    let mut guard = mutex.lock();
    let satisfied = wait_with_timeout(&cond, &mut guard, Duration::from_millis(20), |ready| *ready);

    assert!(!satisfied);
  }

  #[test]
  fn wait_with_timeout_reports_real_signal() {
    let state = Arc::new((Mutex::new(false), Condvar::new()));
    let notifier = Arc::clone(&state);

    let handle = thread::spawn(move || {
      thread::sleep(Duration::from_millis(10));
      let (mutex, cond) = &*notifier;
      synchronized_with_condition(mutex, cond, |ready, cond| {
        *ready = true;
        cond.notify_all();
      });
    });

    let (mutex, cond) = &*state;
    let mut guard = mutex.lock();
    let satisfied = wait_with_timeout(cond, &mut guard, Duration::from_secs(5), |ready| *ready);
    drop(guard);
    handle.join().unwrap();

    assert!(satisfied);
  }

  #[test]
  fn wait_with_timeout_returns_immediately_when_already_satisfied() {
    let mutex = Mutex::new(true);
    let cond = Condvar::new();

    let mut guard = mutex.lock();
    assert!(wait_with_timeout(&cond, &mut guard, Duration::from_millis(1), |ready| *ready));
  }
}
