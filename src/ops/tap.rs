use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct TapObserver<T, F> {
  dest: Subscriber<T>,
  side_effect: Rc<RefCell<F>>,
}

impl<T: 'static, F: FnMut(&T)> Observer<T> for TapObserver<T, F> {
  fn next(&mut self, value: T) {
    (self.side_effect.borrow_mut())(&value);
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Runs a side effect per value without altering the stream.
  pub fn tap<F>(self, side_effect: F) -> Observable<T>
  where
    F: FnMut(&T) + 'static,
  {
    let side_effect = shared_fn(side_effect);
    Observable::new(move |sub| {
      let observer = TapObserver { dest: sub.clone(), side_effect: side_effect.clone() };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn observes_without_changing_values() {
    let taps = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let t = taps.clone();
    let sink = seen.clone();
    from_iter(vec![1, 2])
      .tap(move |v| t.borrow_mut().push(*v))
      .subscribe(move |v| sink.borrow_mut().push(v));

    assert_eq!(*taps.borrow(), vec![1, 2]);
    assert_eq!(*seen.borrow(), vec![1, 2]);
  }
}
