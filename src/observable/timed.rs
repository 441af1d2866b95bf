//! Clock-driven sources.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::observable::Observable;
use crate::scheduler::SchedulerRef;
use crate::subscription::TeardownLogic;

/// Emits 0, 1, 2, ... every `period` on `scheduler`, never completing on
/// its own.
pub fn interval(period: Duration, scheduler: SchedulerRef) -> Observable<u64> {
  timer_emissions(period, Some(period), scheduler)
}

/// Emits a single 0 after `due`, then completes.
pub fn timer(due: Duration, scheduler: SchedulerRef) -> Observable<u64> {
  timer_emissions(due, None, scheduler)
}

/// Emits 0 after `due`, then counts up every `period`.
pub fn timer_at_interval(
  due: Duration,
  period: Duration,
  scheduler: SchedulerRef,
) -> Observable<u64> {
  timer_emissions(due, Some(period), scheduler)
}

fn timer_emissions(
  due: Duration,
  period: Option<Duration>,
  scheduler: SchedulerRef,
) -> Observable<u64> {
  Observable::new(move |sub| {
    let count = Rc::new(Cell::new(0u64));
    let scheduler = scheduler.clone();
    let action = scheduler.schedule(
      due,
      Box::new(move |handle| {
        let n = count.get();
        count.set(n + 1);
        sub.next(n);
        match period {
          Some(p) => handle.reschedule(p),
          None => sub.complete(),
        }
        Ok(())
      }),
    );
    TeardownLogic::Subscription(action)
  })
}
