//! Trampoline scheduler.

use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::{ActionQueue, Scheduler, SchedulerRef, Work};
use crate::subscription::Subscription;

/// Runs work on a trampoline: the first `schedule` call starts draining,
/// and work scheduled during the drain is appended instead of nesting.
/// Delays are ordering-only; the queue's logical clock jumps, it never
/// waits wall time. Recursive scheduling therefore runs breadth-first
/// where the immediate scheduler would run depth-first.
pub struct QueueScheduler {
  queue: Rc<ActionQueue>,
}

impl QueueScheduler {
  pub fn new() -> Self {
    QueueScheduler { queue: Rc::new(ActionQueue::new()) }
  }
}

impl Default for QueueScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for QueueScheduler {
  fn now(&self) -> Duration {
    self.queue.now()
  }

  fn schedule(&self, delay: Duration, work: Work) -> Subscription {
    let subscription = self.queue.push(delay, work);
    if !self.queue.is_flushing() {
      crate::scheduler::report_flush_error(self.queue.flush(None));
    }
    subscription
  }
}

/// Fresh trampoline scheduler.
pub fn queue() -> SchedulerRef {
  Rc::new(QueueScheduler::new())
}
