//! Execution-context abstraction.
//!
//! A [`Scheduler`] decides when and in what order units of work run, and
//! owns the clock that time-based operators read. Work is fallible and may
//! ask to be rescheduled through its [`ActionHandle`], which gives
//! iterative producers a stack-free loop.

use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use crate::config;
use crate::error::RxError;
use crate::subscription::{Subscription, SubscriptionLike};

mod immediate;
mod local_pool;
mod queue;
mod virtual_time;

pub use immediate::*;
pub use local_pool::*;
pub use queue::*;
pub use virtual_time::*;

/// A unit of scheduled work. Returning `Err` aborts the current flush on
/// queue-driven schedulers and reaches the unhandled-error hook elsewhere.
pub type Work = Box<dyn FnMut(&ActionHandle) -> Result<(), RxError>>;

/// Shared handle to a scheduler.
pub type SchedulerRef = Rc<dyn Scheduler>;

/// An execution context with a monotonic clock.
pub trait Scheduler {
  /// The scheduler's notion of "now". Virtual schedulers advance this
  /// explicitly; wall-clock schedulers derive it from elapsed time.
  fn now(&self) -> Duration;

  /// Queues `work` to run after `delay`. The returned subscription cancels
  /// the action (and any rescheduled successors) when unsubscribed.
  fn schedule(&self, delay: Duration, work: Work) -> Subscription;
}

/// Convenience constructors over [`Scheduler::schedule`].
pub trait SchedulerExt {
  fn schedule_fn(&self, delay: Duration, f: impl FnMut(&ActionHandle) + 'static) -> Subscription;
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {
  fn schedule_fn(&self, delay: Duration, mut f: impl FnMut(&ActionHandle) + 'static) -> Subscription {
    self.schedule(
      delay,
      Box::new(move |handle| {
        f(handle);
        Ok(())
      }),
    )
  }
}

/// Handed to running work. Lets the work observe cancellation and request
/// another turn without growing the stack.
pub struct ActionHandle {
  subscription: Subscription,
  requested: Cell<Option<Duration>>,
}

impl ActionHandle {
  pub(crate) fn new(subscription: Subscription) -> Self {
    ActionHandle { subscription, requested: Cell::new(None) }
  }

  pub fn subscription(&self) -> &Subscription {
    &self.subscription
  }

  pub fn is_closed(&self) -> bool {
    self.subscription.is_closed()
  }

  /// Requests that this action run again after `delay`. Takes effect when
  /// the current invocation returns; the last request wins.
  pub fn reschedule(&self, delay: Duration) {
    self.requested.set(Some(delay));
  }

  pub(crate) fn take_reschedule(&self) -> Option<Duration> {
    self.requested.take()
  }
}

struct QueuedAction {
  due: Duration,
  seq: u64,
  work: Work,
  handle: Rc<ActionHandle>,
}

impl PartialEq for QueuedAction {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for QueuedAction {}

impl PartialOrd for QueuedAction {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for QueuedAction {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    // Earlier due time first; insertion order breaks ties (FIFO).
    self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
  }
}

/// Priority queue shared by the trampoline and virtual-time schedulers:
/// actions ordered by due time, FIFO among equals, with a re-entrancy
/// guard so work scheduling more work feeds the running flush instead of
/// starting a nested one.
pub(crate) struct ActionQueue {
  heap: RefCell<BinaryHeap<Reverse<QueuedAction>>>,
  seq: Cell<u64>,
  now: Cell<Duration>,
  flushing: Cell<bool>,
}

impl ActionQueue {
  pub(crate) fn new() -> Self {
    ActionQueue {
      heap: RefCell::new(BinaryHeap::new()),
      seq: Cell::new(0),
      now: Cell::new(Duration::ZERO),
      flushing: Cell::new(false),
    }
  }

  pub(crate) fn now(&self) -> Duration {
    self.now.get()
  }

  pub(crate) fn is_flushing(&self) -> bool {
    self.flushing.get()
  }

  pub(crate) fn push(&self, delay: Duration, work: Work) -> Subscription {
    let subscription = Subscription::new();
    let handle = Rc::new(ActionHandle::new(subscription.clone()));
    self.push_action(self.now.get() + delay, work, handle);
    subscription
  }

  fn push_action(&self, due: Duration, work: Work, handle: Rc<ActionHandle>) {
    let seq = self.seq.get();
    self.seq.set(seq + 1);
    self.heap.borrow_mut().push(Reverse(QueuedAction { due, seq, work, handle }));
  }

  /// Runs queued actions in due order until the queue drains. `deadline`
  /// bounds the virtual clock; the first action due past it aborts the
  /// flush with an error. A work error aborts the batch and cancels every
  /// still-queued action.
  pub(crate) fn flush(&self, deadline: Option<Duration>) -> Result<(), RxError> {
    if self.flushing.get() {
      return Ok(());
    }
    self.flushing.set(true);
    let result = self.run_loop(deadline);
    self.flushing.set(false);
    result
  }

  fn run_loop(&self, deadline: Option<Duration>) -> Result<(), RxError> {
    loop {
      let action = self.heap.borrow_mut().pop();
      let Some(Reverse(mut action)) = action else { return Ok(()) };
      if action.handle.is_closed() {
        continue;
      }
      if let Some(deadline) = deadline {
        if action.due > deadline {
          return Err(crate::error::message(format!(
            "scheduled work exceeded the maximum flush horizon of {deadline:?}"
          )));
        }
      }
      if action.due > self.now.get() {
        self.now.set(action.due);
      }
      if let Err(e) = (action.work)(&action.handle) {
        // A failing action aborts the batch: every still-queued sibling is
        // unsubscribed and the error surfaces to the flush caller.
        action.handle.subscription().unsubscribe();
        let remaining: Vec<_> = self.heap.borrow_mut().drain().collect();
        for Reverse(queued) in remaining {
          queued.handle.subscription().unsubscribe();
        }
        return Err(e);
      }
      if let Some(delay) = action.handle.take_reschedule() {
        let due = self.now.get() + delay;
        let handle = action.handle.clone();
        self.push_action(due, action.work, handle);
      }
    }
  }
}

/// Routes a flush failure from a fire-and-forget context to the
/// unhandled-error hook.
pub(crate) fn report_flush_error(result: Result<(), RxError>) {
  if let Err(e) = result {
    config::report_unhandled(e);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn actions_run_in_due_order_with_fifo_ties() {
    let queue = ActionQueue::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (name, delay) in [("a", 5u64), ("b", 0), ("c", 5), ("d", 2)] {
      let o = order.clone();
      queue.push(
        ms(delay),
        Box::new(move |_| {
          o.borrow_mut().push(name);
          Ok(())
        }),
      );
    }

    queue.flush(None).unwrap();
    assert_eq!(*order.borrow(), vec!["b", "d", "a", "c"]);
  }

  #[test]
  fn cancelled_actions_are_skipped() {
    let queue = ActionQueue::new();
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let sub = queue.push(
      ms(1),
      Box::new(move |_| {
        r.set(true);
        Ok(())
      }),
    );
    sub.unsubscribe();
    queue.flush(None).unwrap();
    assert!(!ran.get());
  }

  #[test]
  fn reschedule_loops_without_reentry() {
    let queue = ActionQueue::new();
    let ticks = Rc::new(Cell::new(0u32));
    let t = ticks.clone();
    queue.push(
      ms(1),
      Box::new(move |handle| {
        t.set(t.get() + 1);
        if t.get() < 4 {
          handle.reschedule(ms(1));
        }
        Ok(())
      }),
    );

    queue.flush(None).unwrap();
    assert_eq!(ticks.get(), 4);
    assert_eq!(queue.now(), ms(4));
  }

  #[test]
  fn work_scheduled_mid_flush_joins_the_same_flush() {
    let queue = Rc::new(ActionQueue::new());
    let order = Rc::new(RefCell::new(Vec::new()));

    let (q, o) = (queue.clone(), order.clone());
    queue.push(
      ms(0),
      Box::new(move |_| {
        o.borrow_mut().push("outer");
        let o = o.clone();
        q.push(
          ms(0),
          Box::new(move |_| {
            o.borrow_mut().push("inner");
            Ok(())
          }),
        );
        Ok(())
      }),
    );

    queue.flush(None).unwrap();
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
  }

  #[test]
  fn failing_work_aborts_the_flush() {
    let queue = ActionQueue::new();
    let later_ran = Rc::new(Cell::new(false));

    queue.push(ms(1), Box::new(|_| Err(crate::error::message("bad action"))));
    let l = later_ran.clone();
    queue.push(
      ms(2),
      Box::new(move |_| {
        l.set(true);
        Ok(())
      }),
    );

    let err = queue.flush(None).unwrap_err();
    assert_eq!(err.to_string(), "bad action");
    assert!(!later_ran.get());
  }

  #[test]
  fn deadline_bounds_the_clock() {
    let queue = ActionQueue::new();
    queue.push(ms(50), Box::new(|_| Ok(())));
    assert!(queue.flush(Some(ms(10))).is_err());
  }
}
