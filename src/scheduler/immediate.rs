//! Inline execution, no queue.

use std::rc::Rc;
use std::time::Duration;
use std::time::Instant;

use crate::scheduler::{ActionHandle, Scheduler, SchedulerRef, Work};
use crate::subscription::Subscription;

/// Runs work synchronously inside the `schedule` call. Delays do not
/// wait: a requested delay only matters for the clock reading handed to
/// the work, never for wall time. Reschedules loop inline.
pub struct ImmediateScheduler {
  started: Instant,
}

impl ImmediateScheduler {
  pub fn new() -> Self {
    ImmediateScheduler { started: Instant::now() }
  }
}

impl Default for ImmediateScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Duration {
    self.started.elapsed()
  }

  fn schedule(&self, _delay: Duration, mut work: Work) -> Subscription {
    let subscription = Subscription::new();
    let handle = ActionHandle::new(subscription.clone());
    loop {
      if handle.is_closed() {
        break;
      }
      if let Err(e) = work(&handle) {
        crate::scheduler::report_flush_error(Err(e));
        break;
      }
      if handle.take_reschedule().is_none() {
        break;
      }
    }
    subscription
  }
}

/// Shared immediate scheduler.
pub fn immediate() -> SchedulerRef {
  Rc::new(ImmediateScheduler::new())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::SchedulerExt;
  use std::cell::Cell;

  #[test]
  fn runs_before_schedule_returns() {
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    immediate().schedule_fn(Duration::from_millis(100), move |_| r.set(true));
    assert!(ran.get());
  }

  #[test]
  fn reschedule_loops_inline_until_done() {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    immediate().schedule_fn(Duration::ZERO, move |handle| {
      c.set(c.get() + 1);
      if c.get() < 3 {
        handle.reschedule(Duration::ZERO);
      }
    });
    assert_eq!(count.get(), 3);
  }

  #[test]
  fn unsubscribed_handle_stops_the_loop() {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    immediate().schedule_fn(Duration::ZERO, move |handle| {
      c.set(c.get() + 1);
      handle.reschedule(Duration::ZERO);
      crate::subscription::SubscriptionLike::unsubscribe(handle.subscription());
    });
    assert_eq!(count.get(), 1);
  }
}
