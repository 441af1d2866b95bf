use std::rc::Rc;

use crate::error::{EmptyError, RxError};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

enum OnEmpty<T> {
  Emit(T),
  Error,
}

struct EmptyGuardObserver<T> {
  dest: Subscriber<T>,
  on_empty: OnEmpty<T>,
  saw_value: bool,
}

impl<T: Clone + 'static> Observer<T> for EmptyGuardObserver<T> {
  fn next(&mut self, value: T) {
    self.saw_value = true;
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    if !self.saw_value {
      match &self.on_empty {
        OnEmpty::Emit(default) => self.dest.next(default.clone()),
        OnEmpty::Error => {
          self.dest.error(Rc::new(EmptyError));
          return;
        }
      }
    }
    self.dest.complete();
  }
}

impl<T: Clone + 'static> Observable<T> {
  /// Emits `default` if the source completes without a value.
  pub fn default_if_empty(self, default: T) -> Observable<T> {
    self.on_empty(move || OnEmpty::Emit(default.clone()))
  }

  /// Errors with [`EmptyError`] if the source completes without a value.
  pub fn throw_if_empty(self) -> Observable<T> {
    self.on_empty(|| OnEmpty::Error)
  }

  fn on_empty(self, make: impl Fn() -> OnEmpty<T> + 'static) -> Observable<T> {
    Observable::new(move |sub| {
      let observer = EmptyGuardObserver { dest: sub.clone(), on_empty: make(), saw_value: false };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::{empty, of};
  use std::cell::RefCell;

  #[test]
  fn default_fills_an_empty_stream() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    empty().default_if_empty(9).subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![9]);
  }

  #[test]
  fn default_stays_out_of_a_nonempty_stream() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    of(1).default_if_empty(9).subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1]);
  }

  #[test]
  fn throw_if_empty_raises_empty_error() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    empty::<i32>()
      .throw_if_empty()
      .subscribe_err(|_| panic!("no values"), move |e| sink.borrow_mut().push(e.to_string()));
    assert_eq!(*errors.borrow(), vec!["no elements in sequence"]);
  }
}
