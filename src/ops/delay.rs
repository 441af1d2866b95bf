use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct DelayObserver<T> {
  dest: Subscriber<T>,
  duration: Duration,
  scheduler: SchedulerRef,
}

impl<T: 'static> Observer<T> for DelayObserver<T> {
  fn next(&mut self, value: T) {
    let dest = self.dest.clone();
    let mut value = Some(value);
    let action = self.scheduler.schedule(
      self.duration,
      Box::new(move |_| {
        if let Some(value) = value.take() {
          dest.next(value);
        }
        Ok(())
      }),
    );
    self.dest.subscription().add(action);
  }

  /// Errors are not delayed; they jump the queue.
  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let dest = self.dest.clone();
    let action = self.scheduler.schedule(
      self.duration,
      Box::new(move |_| {
        dest.complete();
        Ok(())
      }),
    );
    self.dest.subscription().add(action);
  }
}

struct DelayWhenState {
  active: usize,
  done: bool,
}

struct DelayWhenFire<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<DelayWhenState>>,
  value: Option<T>,
  slot: Rc<RefCell<Option<Subscription>>>,
}

impl<T: 'static> DelayWhenFire<T> {
  fn fire(&mut self) {
    let Some(value) = self.value.take() else { return };
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    self.dest.next(value);
    let finished = {
      let mut state = self.state.borrow_mut();
      state.active -= 1;
      state.done && state.active == 0
    };
    if finished {
      self.dest.complete();
    }
  }
}

impl<T: 'static, N> Observer<N> for DelayWhenFire<T> {
  fn next(&mut self, _value: N) {
    self.fire();
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.fire();
  }
}

struct DelayWhenObserver<T, N, F> {
  dest: Subscriber<T>,
  selector: Rc<RefCell<F>>,
  state: Rc<RefCell<DelayWhenState>>,
  _duration: std::marker::PhantomData<N>,
}

impl<T, N, F> Observer<T> for DelayWhenObserver<T, N, F>
where
  T: 'static,
  N: 'static,
  F: FnMut(&T) -> Observable<N>,
{
  fn next(&mut self, value: T) {
    let duration = (self.selector.borrow_mut())(&value);
    self.state.borrow_mut().active += 1;

    let slot = Rc::new(RefCell::new(None));
    let observer = DelayWhenFire {
      dest: self.dest.clone(),
      state: self.state.clone(),
      value: Some(value),
      slot: slot.clone(),
    };
    let up = Subscriber::from_observer(observer);
    *slot.borrow_mut() = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    duration.subscribe_subscriber(up);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let finished = {
      let mut state = self.state.borrow_mut();
      state.done = true;
      state.active == 0
    };
    if finished {
      self.dest.complete();
    }
  }
}

impl<T: 'static> Observable<T> {
  /// Shifts every value (and the completion) later by `duration` on
  /// `scheduler`. Errors pass through undelayed.
  pub fn delay(self, duration: Duration, scheduler: SchedulerRef) -> Observable<T> {
    Observable::new(move |sub| {
      let observer =
        DelayObserver { dest: sub.clone(), duration, scheduler: scheduler.clone() };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }

  /// Delays each value until its own notifier stream (from
  /// `duration_selector`) fires; completion waits for every in-flight
  /// value to land.
  pub fn delay_when<N, F>(self, duration_selector: F) -> Observable<T>
  where
    N: 'static,
    F: FnMut(&T) -> Observable<N> + 'static,
  {
    let selector = shared_fn(duration_selector);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(DelayWhenState { active: 0, done: false }));
      let observer = DelayWhenObserver {
        dest: sub.clone(),
        selector: selector.clone(),
        state,
        _duration: std::marker::PhantomData,
      };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
