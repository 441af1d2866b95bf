//! Task-queue schedulers over a thread-local single-threaded executor.
//!
//! Three flavors share one `futures` [`LocalPool`] per thread:
//! [`asap`] runs work as a task with any delay coerced to zero, [`async_scheduler`]
//! honors delays with real timers, and [`animation_frame`] quantizes delays
//! up to 16ms frame boundaries. Nothing runs until the pool is driven; see
//! [`run_until_stalled`] and [`run_for`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
#[cfg(feature = "timer")]
use futures_timer::Delay;

use crate::config;
use crate::scheduler::{ActionHandle, Scheduler, SchedulerRef, Work};
use crate::subscription::{Subscription, SubscriptionLike};

struct PoolCell {
  pool: RefCell<LocalPool>,
  spawner: LocalSpawner,
}

thread_local! {
  static POOL: PoolCell = {
    let pool = LocalPool::new();
    let spawner = pool.spawner();
    PoolCell { pool: RefCell::new(pool), spawner }
  };
}

pub(crate) fn spawn(fut: impl std::future::Future<Output = ()> + 'static) {
  POOL.with(|p| {
    if let Err(e) = p.spawner.spawn_local(fut) {
      config::report_unhandled(crate::error::wrap(e));
    }
  });
}

/// Runs every ready task on the thread's pool. Timer-delayed work whose
/// deadline has not passed stays pending.
pub fn run_until_stalled() {
  POOL.with(|p| {
    // A nested call from inside running work is a no-op.
    if let Ok(mut pool) = p.pool.try_borrow_mut() {
      pool.run_until_stalled();
    }
  });
}

/// Drives the pool for `duration` of wall time, servicing timers. Intended
/// for tests and examples that use the timer-based schedulers.
#[cfg(feature = "timer")]
pub fn run_for(duration: Duration) {
  POOL.with(|p| {
    if let Ok(mut pool) = p.pool.try_borrow_mut() {
      pool.run_until(Delay::new(duration));
    }
  });
}

#[derive(Clone, Copy)]
enum Kind {
  /// Delay coerced to zero; pure task-queue ordering.
  Asap,
  /// Delays honored with real timers.
  Timed,
  /// Delays rounded up to the next 16ms frame boundary.
  Frame,
}

const FRAME: Duration = Duration::from_millis(16);

fn effective_delay(kind: Kind, delay: Duration) -> Duration {
  match kind {
    Kind::Asap => Duration::ZERO,
    Kind::Timed => delay,
    Kind::Frame => {
      let frames = (delay.as_millis() as u64).div_ceil(FRAME.as_millis() as u64);
      FRAME * frames.max(1) as u32
    }
  }
}

/// Scheduler backed by the thread's shared [`LocalPool`].
pub struct LocalPoolScheduler {
  started: Instant,
  kind: Kind,
}

impl Scheduler for LocalPoolScheduler {
  fn now(&self) -> Duration {
    self.started.elapsed()
  }

  fn schedule(&self, delay: Duration, mut work: Work) -> Subscription {
    let subscription = Subscription::new();
    let handle = Rc::new(ActionHandle::new(subscription.clone()));
    let kind = self.kind;
    let mut delay = effective_delay(kind, delay);
    spawn(async move {
      loop {
        if !delay.is_zero() {
          #[cfg(feature = "timer")]
          Delay::new(delay).await;
        }
        if handle.is_closed() {
          break;
        }
        if let Err(e) = work(&handle) {
          config::report_unhandled(e);
          handle.subscription().unsubscribe();
          break;
        }
        match handle.take_reschedule() {
          Some(d) => delay = effective_delay(kind, d),
          None => break,
        }
      }
    });
    subscription
  }
}

/// Task-queue scheduler: work runs on the next pool turn, ahead of any
/// timer-delayed work.
pub fn asap() -> SchedulerRef {
  Rc::new(LocalPoolScheduler { started: Instant::now(), kind: Kind::Asap })
}

/// Timer scheduler: delays wait real wall time.
#[cfg(feature = "timer")]
pub fn async_scheduler() -> SchedulerRef {
  Rc::new(LocalPoolScheduler { started: Instant::now(), kind: Kind::Timed })
}

/// Frame scheduler: work lands on 16ms frame boundaries.
#[cfg(feature = "timer")]
pub fn animation_frame() -> SchedulerRef {
  Rc::new(LocalPoolScheduler { started: Instant::now(), kind: Kind::Frame })
}
