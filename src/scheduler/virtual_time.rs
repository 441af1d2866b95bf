//! Virtual clock for deterministic tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::scheduler::{ActionQueue, Scheduler, Work};
use crate::subscription::Subscription;

/// One frame of virtual time.
pub const FRAME: Duration = Duration::from_millis(1);

const DEFAULT_MAX_FRAMES: u64 = 1000;

/// A scheduler whose clock only moves when [`flush`](Self::flush) runs.
///
/// Time is measured in frames of one virtual millisecond. Flushing executes
/// every queued action in due order, jumping the clock to each action's due
/// time; a flush whose work would run past `max_frames` aborts with an
/// error, which catches runaway periodic sources in tests.
pub struct VirtualTimeScheduler {
  queue: ActionQueue,
  max_frames: Cell<u64>,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self {
    VirtualTimeScheduler { queue: ActionQueue::new(), max_frames: Cell::new(DEFAULT_MAX_FRAMES) }
  }

  pub fn with_max_frames(max_frames: u64) -> Self {
    let s = Self::new();
    s.max_frames.set(max_frames);
    s
  }

  pub fn max_frames(&self) -> u64 {
    self.max_frames.get()
  }

  /// Runs all queued work, advancing the virtual clock.
  pub fn flush(&self) -> Result<(), RxError> {
    self.queue.flush(Some(FRAME * self.max_frames.get() as u32))
  }
}

impl Default for VirtualTimeScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration {
    self.queue.now()
  }

  fn schedule(&self, delay: Duration, work: Work) -> Subscription {
    self.queue.push(delay, work)
  }
}

/// Fresh virtual-time scheduler behind a shared handle.
pub fn virtual_time() -> Rc<VirtualTimeScheduler> {
  Rc::new(VirtualTimeScheduler::new())
}
