use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{RxError, TimeoutError};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

/// Deadline policy for [`Observable::timeout`].
pub struct TimeoutConfig<T> {
  /// Deadline for the first value, measured from subscription.
  pub first: Option<Duration>,
  /// Deadline between consecutive values.
  pub each: Option<Duration>,
  pub scheduler: SchedulerRef,
  /// Stream to switch to instead of erroring when a deadline passes.
  pub fallback: Option<Observable<T>>,
  /// Diagnostic payload carried onto the emitted [`TimeoutError`].
  pub meta: Option<Rc<dyn Debug>>,
}

impl<T> TimeoutConfig<T> {
  pub fn first(duration: Duration, scheduler: SchedulerRef) -> Self {
    TimeoutConfig { first: Some(duration), each: None, scheduler, fallback: None, meta: None }
  }

  pub fn each(duration: Duration, scheduler: SchedulerRef) -> Self {
    TimeoutConfig { first: None, each: Some(duration), scheduler, fallback: None, meta: None }
  }

  pub fn with_each(mut self, duration: Duration) -> Self {
    self.each = Some(duration);
    self
  }

  pub fn with_fallback(mut self, fallback: Observable<T>) -> Self {
    self.fallback = Some(fallback);
    self
  }

  pub fn with_meta(mut self, meta: impl Debug + 'static) -> Self {
    self.meta = Some(Rc::new(meta));
    self
  }
}

struct TimeoutState<T> {
  seen: usize,
  last: Option<T>,
  timer: Option<Subscription>,
  source: Option<Subscription>,
}

fn arm<T>(
  delay: Duration,
  state: &Rc<RefCell<TimeoutState<T>>>,
  dest: &Subscriber<T>,
  config: &Rc<TimeoutConfig<T>>,
) where
  T: Clone + Debug + 'static,
{
  let fire_state = state.clone();
  let fire_dest = dest.clone();
  let fire_config = config.clone();
  let action = config.scheduler.schedule(
    delay,
    Box::new(move |_| {
      let (seen, last, source) = {
        let mut state = fire_state.borrow_mut();
        state.timer = None;
        (state.seen, state.last.take(), state.source.take())
      };
      // The late source must not deliver anything once the deadline won.
      if let Some(source) = source {
        source.unsubscribe();
      }
      match &fire_config.fallback {
        Some(fallback) => {
          fallback.chain(fire_dest.subscription(), fire_dest.clone());
        }
        None => fire_dest.error(Rc::new(TimeoutError {
          seen,
          last_value: last,
          meta: fire_config.meta.clone(),
        })),
      }
      Ok(())
    }),
  );
  let old = {
    let mut state = state.borrow_mut();
    state.timer.replace(action.clone())
  };
  if let Some(old) = old {
    old.unsubscribe();
  }
  dest.subscription().add(action);
}

struct TimeoutObserver<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<TimeoutState<T>>>,
  config: Rc<TimeoutConfig<T>>,
}

impl<T> TimeoutObserver<T> {
  fn cancel_timer(&self) {
    let timer = self.state.borrow_mut().timer.take();
    if let Some(timer) = timer {
      timer.unsubscribe();
    }
  }
}

impl<T: Clone + Debug + 'static> Observer<T> for TimeoutObserver<T> {
  fn next(&mut self, value: T) {
    self.cancel_timer();
    {
      let mut state = self.state.borrow_mut();
      state.seen += 1;
      state.last = Some(value.clone());
    }
    self.dest.next(value);
    if !self.dest.is_closed() {
      if let Some(each) = self.config.each {
        arm(each, &self.state, &self.dest, &self.config);
      }
    }
  }

  fn error(&mut self, err: RxError) {
    self.cancel_timer();
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.cancel_timer();
    self.dest.complete();
  }
}

impl<T: Clone + Debug + 'static> Observable<T> {
  /// Errors with [`TimeoutError`] (or switches to the configured fallback)
  /// when the source misses a deadline. A value arriving before its
  /// deadline cancels that deadline; `each` re-arms one per value.
  pub fn timeout(self, config: TimeoutConfig<T>) -> Observable<T> {
    let config = Rc::new(config);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(TimeoutState {
        seen: 0,
        last: None,
        timer: None,
        source: None,
      }));
      if let Some(delay) = config.first.or(config.each) {
        arm(delay, &state, &sub, &config);
      }

      let observer =
        TimeoutObserver { dest: sub.clone(), state: state.clone(), config: config.clone() };
      let up = Subscriber::from_observer(observer);
      state.borrow_mut().source = Some(up.subscription().clone());
      sub.subscription().add(up.subscription().clone());
      self.subscribe_subscriber(up);
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::from_iter;
  use crate::scheduler::{Scheduler, SchedulerExt, VirtualTimeScheduler, FRAME};
  use crate::subject::Subject;

  #[test]
  fn silent_source_errors_at_the_first_deadline() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source: Subject<i32> = Subject::new();
    let errors = Rc::new(RefCell::new(Vec::new()));

    let sink = errors.clone();
    let s = scheduler.clone();
    source
      .observable()
      .timeout(TimeoutConfig::first(FRAME * 5, scheduler.clone()))
      .subscribe_err(|_| {}, move |e| sink.borrow_mut().push((e.to_string(), s.now())));

    scheduler.flush().unwrap();
    assert_eq!(
      *errors.borrow(),
      vec![("timeout: 0 value(s) seen before the deadline".to_string(), FRAME * 5)]
    );
  }

  #[test]
  fn a_value_before_the_deadline_suppresses_the_timeout() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source = Subject::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (l1, l2) = (log.clone(), log.clone());
    source
      .observable()
      .timeout(TimeoutConfig::first(FRAME * 5, scheduler.clone()))
      .subscribe_all(
        move |v| l1.borrow_mut().push(format!("next {v}")),
        |e| panic!("unexpected error: {e}"),
        move || l2.borrow_mut().push("complete".into()),
      );

    let s = source.clone();
    scheduler.schedule_fn(FRAME * 3, move |_| {
      s.next('a').unwrap();
    });
    let s = source.clone();
    scheduler.schedule_fn(FRAME * 30, move |_| {
      s.complete().unwrap();
    });

    scheduler.flush().unwrap();
    assert_eq!(*log.borrow(), vec!["next a", "complete"]);
  }

  #[test]
  fn each_deadline_rearms_per_value_and_records_progress() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source = Subject::new();
    let errors: Rc<RefCell<Vec<RxError>>> = Rc::new(RefCell::new(Vec::new()));

    let sink = errors.clone();
    source
      .observable()
      .timeout(TimeoutConfig::each(FRAME * 4, scheduler.clone()))
      .subscribe_err(|_| {}, move |e| sink.borrow_mut().push(e));

    for (at, value) in [(1u32, 'a'), (2, 'b')] {
      let s = source.clone();
      scheduler.schedule_fn(FRAME * at, move |_| {
        s.next(value).unwrap();
      });
    }

    scheduler.flush().unwrap();
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    let detail = errors[0].downcast_ref::<TimeoutError<char>>().unwrap();
    assert_eq!(detail.seen, 2);
    assert_eq!(detail.last_value, Some('b'));
  }

  #[test]
  fn configured_meta_surfaces_on_the_error() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source: Subject<i32> = Subject::new();
    let errors: Rc<RefCell<Vec<RxError>>> = Rc::new(RefCell::new(Vec::new()));

    let sink = errors.clone();
    source
      .observable()
      .timeout(TimeoutConfig::first(FRAME * 3, scheduler.clone()).with_meta("profile request"))
      .subscribe_err(|_| {}, move |e| sink.borrow_mut().push(e));

    scheduler.flush().unwrap();
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    let detail = errors[0].downcast_ref::<TimeoutError<i32>>().unwrap();
    let meta = detail.meta.as_ref().expect("meta carried onto the error");
    assert_eq!(format!("{meta:?}"), "\"profile request\"");
  }

  #[test]
  fn fallback_takes_over_instead_of_erroring() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source: Subject<i32> = Subject::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (l1, l2) = (log.clone(), log.clone());
    source
      .observable()
      .timeout(
        TimeoutConfig::first(FRAME * 2, scheduler.clone()).with_fallback(from_iter(vec![7, 8])),
      )
      .subscribe_all(
        move |v| l1.borrow_mut().push(format!("next {v}")),
        |e| panic!("unexpected error: {e}"),
        move || l2.borrow_mut().push("complete".into()),
      );

    scheduler.flush().unwrap();
    assert_eq!(*log.borrow(), vec!["next 7", "next 8", "complete"]);
  }
}
