use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct CombineState<T, U> {
  left: Option<T>,
  right: Option<U>,
  left_done: bool,
  right_done: bool,
}

struct LeftObserver<T, U, R, F> {
  dest: Subscriber<R>,
  state: Rc<RefCell<CombineState<T, U>>>,
  combiner: Rc<RefCell<F>>,
}

struct RightObserver<T, U, R, F> {
  dest: Subscriber<R>,
  state: Rc<RefCell<CombineState<T, U>>>,
  combiner: Rc<RefCell<F>>,
}

fn emit_if_ready<T, U, R, F>(
  dest: &Subscriber<R>,
  state: &Rc<RefCell<CombineState<T, U>>>,
  combiner: &Rc<RefCell<F>>,
) where
  T: Clone + 'static,
  U: Clone + 'static,
  R: 'static,
  F: FnMut(&T, &U) -> R,
{
  // Clone the pair out so the user combiner runs without a state borrow.
  let pair = {
    let state = state.borrow();
    match (&state.left, &state.right) {
      (Some(l), Some(r)) => Some((l.clone(), r.clone())),
      _ => None,
    }
  };
  if let Some((l, r)) = pair {
    let combined = (combiner.borrow_mut())(&l, &r);
    dest.next(combined);
  }
}

impl<T, U, R, F> Observer<T> for LeftObserver<T, U, R, F>
where
  T: Clone + 'static,
  U: Clone + 'static,
  R: 'static,
  F: FnMut(&T, &U) -> R,
{
  fn next(&mut self, value: T) {
    self.state.borrow_mut().left = Some(value);
    emit_if_ready(&self.dest, &self.state, &self.combiner);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let finished = {
      let mut state = self.state.borrow_mut();
      state.left_done = true;
      // A side that completes without ever emitting makes combinations
      // impossible for good.
      state.right_done || state.left.is_none()
    };
    if finished {
      self.dest.complete();
    }
  }
}

impl<T, U, R, F> Observer<U> for RightObserver<T, U, R, F>
where
  T: Clone + 'static,
  U: Clone + 'static,
  R: 'static,
  F: FnMut(&T, &U) -> R,
{
  fn next(&mut self, value: U) {
    self.state.borrow_mut().right = Some(value);
    emit_if_ready(&self.dest, &self.state, &self.combiner);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let finished = {
      let mut state = self.state.borrow_mut();
      state.right_done = true;
      state.left_done || state.right.is_none()
    };
    if finished {
      self.dest.complete();
    }
  }
}

impl<T: Clone + 'static> Observable<T> {
  /// Emits `combiner` over the latest value of each input whenever either
  /// input emits, once both have emitted at least once.
  pub fn combine_latest<U, R, F>(self, other: Observable<U>, combiner: F) -> Observable<R>
  where
    U: Clone + 'static,
    R: 'static,
    F: FnMut(&T, &U) -> R + 'static,
  {
    let combiner = shared_fn(combiner);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(CombineState {
        left: None,
        right: None,
        left_done: false,
        right_done: false,
      }));
      self.chain(
        sub.subscription(),
        LeftObserver { dest: sub.clone(), state: state.clone(), combiner: combiner.clone() },
      );
      if !sub.is_closed() {
        other.chain(
          sub.subscription(),
          RightObserver { dest: sub.clone(), state, combiner: combiner.clone() },
        );
      }
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subject::Subject;

  #[test]
  fn emits_on_either_side_once_both_have_values() {
    let left = Subject::new();
    let right = Subject::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (l1, l2) = (log.clone(), log.clone());
    left
      .observable()
      .combine_latest(right.observable(), |l: &i32, r: &i32| l + r)
      .subscribe_complete(
        move |v| l1.borrow_mut().push(format!("next {v}")),
        move || l2.borrow_mut().push("complete".into()),
      );

    left.next(1).unwrap();
    assert!(log.borrow().is_empty(), "one-sided input must not emit");
    right.next(10).unwrap();
    left.next(2).unwrap();
    right.next(20).unwrap();
    left.complete().unwrap();
    right.complete().unwrap();

    assert_eq!(*log.borrow(), vec!["next 11", "next 12", "next 22", "complete"]);
  }

  #[test]
  fn an_empty_side_completes_the_result_immediately() {
    let left: Subject<i32> = Subject::new();
    let right: Subject<i32> = Subject::new();
    let done = Rc::new(std::cell::Cell::new(false));

    let d = done.clone();
    left
      .observable()
      .combine_latest(right.observable(), |l, r| l + r)
      .subscribe_complete(|_| {}, move || d.set(true));

    left.next(1).unwrap();
    right.complete().unwrap();
    assert!(done.get());
  }
}
