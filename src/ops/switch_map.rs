use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct SwitchState {
  current: Option<Subscription>,
  active: bool,
  outer_done: bool,
}

struct SwitchInner<R> {
  dest: Subscriber<R>,
  state: Rc<RefCell<SwitchState>>,
}

impl<R: 'static> Observer<R> for SwitchInner<R> {
  fn next(&mut self, value: R) {
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let outer_done = {
      let mut state = self.state.borrow_mut();
      state.active = false;
      if let Some(sub) = state.current.take() {
        sub.unsubscribe();
      }
      state.outer_done
    };
    if outer_done {
      self.dest.complete();
    }
  }
}

struct SwitchMapObserver<R, F> {
  dest: Subscriber<R>,
  project: Rc<RefCell<F>>,
  state: Rc<RefCell<SwitchState>>,
}

impl<T, R: 'static, F: FnMut(T) -> Observable<R>> Observer<T> for SwitchMapObserver<R, F> {
  fn next(&mut self, value: T) {
    let inner = (self.project.borrow_mut())(value);
    // A new inner evicts the previous one; its in-flight values are gone.
    if let Some(old) = self.state.borrow_mut().current.take() {
      old.unsubscribe();
    }
    self.state.borrow_mut().active = true;

    let observer = SwitchInner { dest: self.dest.clone(), state: self.state.clone() };
    let up = Subscriber::from_observer(observer);
    self.state.borrow_mut().current = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    inner.subscribe_subscriber(up);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.borrow_mut();
      state.outer_done = true;
      !state.active
    };
    if done {
      self.dest.complete();
    }
  }
}

impl<T: 'static> Observable<T> {
  /// Projects each value to an inner stream, mirroring only the latest:
  /// each new inner unsubscribes the previous one immediately.
  pub fn switch_map<R, F>(self, project: F) -> Observable<R>
  where
    R: 'static,
    F: FnMut(T) -> Observable<R> + 'static,
  {
    let project = shared_fn(project);
    Observable::new(move |sub| {
      let state =
        Rc::new(RefCell::new(SwitchState { current: None, active: false, outer_done: false }));
      let observer =
        SwitchMapObserver { dest: sub.clone(), project: project.clone(), state };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::{from_iter, interval};
  use crate::scheduler::{SchedulerExt, VirtualTimeScheduler, FRAME};
  use crate::subject::Subject;

  #[test]
  fn a_new_inner_discards_the_old_ones_values() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let trigger = Subject::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    let sch = scheduler.clone();
    trigger
      .observable()
      .switch_map(move |tag: char| {
        interval(FRAME * 10, sch.clone())
          .take(3)
          .map(move |i| format!("{tag}{i}"))
      })
      .subscribe(move |v| sink.borrow_mut().push(v));

    let t = trigger.clone();
    scheduler.schedule_fn(FRAME, move |_| {
      t.next('a').unwrap();
    });
    // Switch while `a`'s inner still has values pending.
    let t = trigger.clone();
    scheduler.schedule_fn(FRAME * 15, move |_| {
      t.next('b').unwrap();
    });

    scheduler.flush().unwrap();
    assert_eq!(*seen.borrow(), vec!["a0", "b0", "b1", "b2"]);
  }

  #[test]
  fn completes_when_outer_and_latest_inner_finish() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let done = Rc::new(std::cell::Cell::new(false));

    let (sink, d) = (seen.clone(), done.clone());
    from_iter(1..=3)
      .switch_map(|v| from_iter(vec![v, v * 100]))
      .subscribe_complete(move |v| sink.borrow_mut().push(v), move || d.set(true));

    // Synchronous inners each run to completion before the next outer
    // value arrives, so nothing is actually discarded here.
    assert_eq!(*seen.borrow(), vec![1, 100, 2, 200, 3, 300]);
    assert!(done.get());
  }
}
