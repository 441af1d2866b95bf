//! Latest-wins window sampling.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::observable::{shared_fn, timer, Observable};
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct AuditState<T> {
  last: Option<T>,
  window: Option<Subscription>,
  open: bool,
}

struct WindowEnd<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<AuditState<T>>>,
}

impl<T> WindowEnd<T>
where
  T: 'static,
{
  /// Window close: emit the retained value, if any, and drop the window
  /// subscription.
  fn close(&mut self) {
    let (value, window) = {
      let mut state = self.state.borrow_mut();
      if !state.open {
        return;
      }
      state.open = false;
      (state.last.take(), state.window.take())
    };
    if let Some(window) = window {
      window.unsubscribe();
    }
    if let Some(value) = value {
      self.dest.next(value);
    }
  }
}

impl<T: 'static, N> Observer<N> for WindowEnd<T> {
  fn next(&mut self, _value: N) {
    self.close();
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.close();
  }
}

struct AuditObserver<T, N, F> {
  dest: Subscriber<T>,
  selector: Rc<RefCell<F>>,
  state: Rc<RefCell<AuditState<T>>>,
  _duration: std::marker::PhantomData<N>,
}

impl<T, N, F> Observer<T> for AuditObserver<T, N, F>
where
  T: 'static,
  N: 'static,
  F: FnMut(&T) -> Observable<N>,
{
  fn next(&mut self, value: T) {
    if self.state.borrow().open {
      // Latest wins; earlier values in the window are dropped.
      self.state.borrow_mut().last = Some(value);
      return;
    }
    // The selector runs outside any state borrow; it is user code and may
    // push into the source re-entrantly.
    let duration = (self.selector.borrow_mut())(&value);
    {
      let mut state = self.state.borrow_mut();
      state.open = true;
      state.last = Some(value);
    }
    let observer = WindowEnd { dest: self.dest.clone(), state: self.state.clone() };
    let up = Subscriber::from_observer(observer);
    // Fill in before subscribing: a synchronously closing window must be
    // able to tear itself down from inside its own notification.
    self.state.borrow_mut().window = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    duration.subscribe_subscriber(up);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // A value retained in a still-open window is flushed before the
    // completion notification.
    let pending = {
      let mut state = self.state.borrow_mut();
      if state.open {
        state.last.take()
      } else {
        None
      }
    };
    if let Some(value) = pending {
      self.dest.next(value);
    }
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// For each window opened by the first value after the previous window
  /// closed, emits only the latest value when `duration_selector`'s stream
  /// fires (or completes).
  pub fn audit<N, F>(self, duration_selector: F) -> Observable<T>
  where
    N: 'static,
    F: FnMut(&T) -> Observable<N> + 'static,
  {
    let selector = shared_fn(duration_selector);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(AuditState { last: None, window: None, open: false }));
      let observer = AuditObserver {
        dest: sub.clone(),
        selector: selector.clone(),
        state,
        _duration: std::marker::PhantomData,
      };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }

  /// [`audit`](Self::audit) with a fixed window length on `scheduler`.
  pub fn audit_time(self, duration: Duration, scheduler: SchedulerRef) -> Observable<T> {
    self.audit(move |_| timer(duration, scheduler.clone()))
  }
}
