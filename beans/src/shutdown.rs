//! Graceful shutdown: close a context once an external signal fires.
//!
//! Wiring OS signals to a [`Cancellation`] is left to the application.

use crate::context::ApplicationContext;
use crate::error::{Error, Result};
use crate::sync::{synchronized_with_condition, wait_with_timeout};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Default)]
struct SignalState {
  cancelled: Mutex<bool>,
  cond: Condvar,
}

/// A cancellation signal that can be fired once and observed from any
/// thread. Clones share the same signal.
#[derive(Clone, Default)]
pub struct Cancellation {
  state: Arc<SignalState>,
}

impl Cancellation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fires the signal and wakes every waiter. Idempotent.
  pub fn cancel(&self) {
    synchronized_with_condition(&self.state.cancelled, &self.state.cond, |cancelled, cond| {
      *cancelled = true;
      cond.notify_all();
    });
  }

  pub fn is_cancelled(&self) -> bool {
    *self.state.cancelled.lock()
  }

  /// Blocks until the signal fires.
  pub fn wait(&self) {
    let mut cancelled = self.state.cancelled.lock();
    while !*cancelled {
      self.state.cond.wait(&mut cancelled);
    }
  }

  /// Blocks until the signal fires or `timeout` elapses. Returns `true` if
  /// the signal fired.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let mut cancelled = self.state.cancelled.lock();
    wait_with_timeout(&self.state.cond, &mut cancelled, timeout, |cancelled| *cancelled)
  }
}

#[derive(Default)]
struct BarrierState {
  pending: Mutex<usize>,
  cond: Condvar,
}

/// A counted completion barrier: waiters are released once every task that
/// was [`add`](ShutdownBarrier::add)ed has called
/// [`done`](ShutdownBarrier::done). Clones share the same counter.
#[derive(Clone, Default)]
pub struct ShutdownBarrier {
  state: Arc<BarrierState>,
}

impl ShutdownBarrier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, tasks: usize) {
    *self.state.pending.lock() += tasks;
  }

  pub fn done(&self) {
    synchronized_with_condition(&self.state.pending, &self.state.cond, |pending, cond| {
      debug_assert!(*pending > 0, "ShutdownBarrier::done called more times than add");
      *pending = pending.saturating_sub(1);
      if *pending == 0 {
        cond.notify_all();
      }
    });
  }

  pub fn pending(&self) -> usize {
    *self.state.pending.lock()
  }

  /// Blocks until no task is pending.
  pub fn wait(&self) {
    let mut pending = self.state.pending.lock();
    while *pending > 0 {
      self.state.cond.wait(&mut pending);
    }
  }

  /// Blocks until no task is pending or `timeout` elapses. Returns `true` if
  /// every task completed in time.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let mut pending = self.state.pending.lock();
    wait_with_timeout(&self.state.cond, &mut pending, timeout, |pending| *pending == 0)
  }
}

// Releases one barrier slot when dropped, whether the task finished, unwound,
// or never started.
struct BarrierRelease(ShutdownBarrier);

impl Drop for BarrierRelease {
  fn drop(&mut self) {
    self.0.done();
  }
}

/// Arranges for `context` to be closed exactly once when `signal` fires.
///
/// One slot is added to `barrier` immediately and released after the close
/// has run, so callers can block on the barrier to wait for full teardown.
///
/// ```
/// use fibre_beans::{graceful_shutdown, ApplicationContext, Cancellation, ShutdownBarrier};
///
/// let context = ApplicationContext::new();
/// let signal = Cancellation::new();
/// let barrier = ShutdownBarrier::new();
///
/// graceful_shutdown(&context, &signal, &barrier).unwrap();
/// signal.cancel();
/// barrier.wait();
/// ```
pub fn graceful_shutdown(
  context: &ApplicationContext,
  signal: &Cancellation,
  barrier: &ShutdownBarrier,
) -> Result<()> {
  barrier.add(1);
  let release = BarrierRelease(barrier.clone());
  let context = context.clone();
  let signal = signal.clone();

  // If the spawn fails the closure is dropped, which releases the slot.
  thread::Builder::new()
    .name("fibre-beans-shutdown".into())
    .spawn(move || {
      let _release = release;
      signal.wait();
      info!("shutdown signal received");
      context.close();
    })
    .map(|_| ())
    .map_err(Error::ShutdownThread)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancellation_wakes_waiters() {
    let signal = Cancellation::new();
    assert!(!signal.is_cancelled());
    assert!(!signal.wait_timeout(Duration::from_millis(10)));

    let remote = signal.clone();
    let handle = thread::spawn(move || remote.wait());
    signal.cancel();
    handle.join().unwrap();

    assert!(signal.is_cancelled());
    assert!(signal.wait_timeout(Duration::from_millis(10)));
  }

  #[test]
  fn barrier_counts_tasks() {
    let barrier = ShutdownBarrier::new();
    assert!(barrier.wait_timeout(Duration::from_millis(1)));

    barrier.add(2);
    barrier.done();
    assert_eq!(barrier.pending(), 1);
    assert!(!barrier.wait_timeout(Duration::from_millis(10)));

    let remote = barrier.clone();
    let handle = thread::spawn(move || remote.done());
    barrier.wait();
    handle.join().unwrap();
    assert_eq!(barrier.pending(), 0);
  }

  #[test]
  fn release_guard_fires_on_unwind() {
    let barrier = ShutdownBarrier::new();
    barrier.add(1);
    let release = BarrierRelease(barrier.clone());

    let result = thread::spawn(move || {
      let _release = release;
      panic!("task failed");
    })
    .join();

    assert!(result.is_err());
    assert!(barrier.wait_timeout(Duration::from_secs(1)));
  }
}
