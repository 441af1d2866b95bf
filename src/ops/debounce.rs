use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::observable::{shared_fn, timer, Observable};
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct DebounceState<T> {
  pending: Option<T>,
  window: Option<Subscription>,
}

struct DebounceFire<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<DebounceState<T>>>,
}

impl<T: 'static> DebounceFire<T> {
  fn fire(&mut self) {
    let (pending, window) = {
      let mut state = self.state.borrow_mut();
      (state.pending.take(), state.window.take())
    };
    if let Some(window) = window {
      window.unsubscribe();
    }
    if let Some(value) = pending {
      self.dest.next(value);
    }
  }
}

impl<T: 'static, N> Observer<N> for DebounceFire<T> {
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

struct DebounceObserver<T, N, F> {
  dest: Subscriber<T>,
  selector: Rc<RefCell<F>>,
  state: Rc<RefCell<DebounceState<T>>>,
  _duration: std::marker::PhantomData<N>,
}

impl<T, N, F> Observer<T> for DebounceObserver<T, N, F>
where
  T: 'static,
  N: 'static,
  F: FnMut(&T) -> Observable<N>,
{
  fn next(&mut self, value: T) {
    let duration = (self.selector.borrow_mut())(&value);
    // Every value restarts the quiet period; the previous timer dies.
    let old = {
      let mut state = self.state.borrow_mut();
      state.pending = Some(value);
      state.window.take()
    };
    if let Some(old) = old {
      old.unsubscribe();
    }

    let observer = DebounceFire { dest: self.dest.clone(), state: self.state.clone() };
    let up = Subscriber::from_observer(observer);
    self.state.borrow_mut().window = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    duration.subscribe_subscriber(up);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // A value still waiting out its quiet period is emitted before the
    // completion notification.
    let pending = self.state.borrow_mut().pending.take();
    if let Some(value) = pending {
      self.dest.next(value);
    }
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Emits a value only after `duration_selector`'s stream for it fires
  /// without a newer value having arrived.
  pub fn debounce<N, F>(self, duration_selector: F) -> Observable<T>
  where
    N: 'static,
    F: FnMut(&T) -> Observable<N> + 'static,
  {
    let selector = shared_fn(duration_selector);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(DebounceState { pending: None, window: None }));
      let observer = DebounceObserver {
        dest: sub.clone(),
        selector: selector.clone(),
        state,
        _duration: std::marker::PhantomData,
      };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }

  /// [`debounce`](Self::debounce) with a fixed quiet period.
  pub fn debounce_time(self, duration: Duration, scheduler: SchedulerRef) -> Observable<T> {
    self.debounce(move |_| timer(duration, scheduler.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::{Scheduler, SchedulerExt, VirtualTimeScheduler, FRAME};
  use crate::subject::Subject;

  #[test]
  fn only_values_followed_by_silence_survive() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source = Subject::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    let s = scheduler.clone();
    source
      .observable()
      .debounce_time(FRAME * 5, scheduler.clone())
      .subscribe(move |v| sink.borrow_mut().push((v, s.now())));

    for (at, value) in [(1u32, 'a'), (3, 'b'), (4, 'c'), (20, 'd')] {
      let src = source.clone();
      scheduler.schedule_fn(FRAME * at, move |_| {
        src.next(value).unwrap();
      });
    }

    scheduler.flush().unwrap();
    // `a` and `b` are superseded within their quiet periods; `c` survives
    // at frame 9, `d` at frame 25.
    assert_eq!(*seen.borrow(), vec![('c', FRAME * 9), ('d', FRAME * 25)]);
  }

  #[test]
  fn completion_flushes_the_pending_value() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let source = Subject::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (l1, l2) = (log.clone(), log.clone());
    source
      .observable()
      .debounce_time(FRAME * 50, scheduler.clone())
      .subscribe_complete(
        move |v| l1.borrow_mut().push(format!("next {v}")),
        move || l2.borrow_mut().push("complete".into()),
      );

    let s = source.clone();
    scheduler.schedule_fn(FRAME, move |_| {
      s.next('z').unwrap();
    });
    let s = source.clone();
    scheduler.schedule_fn(FRAME * 2, move |_| {
      s.complete().unwrap();
    });

    scheduler.flush().unwrap();
    assert_eq!(*log.borrow(), vec!["next z", "complete"]);
  }
}
