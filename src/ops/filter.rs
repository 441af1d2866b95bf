use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct FilterObserver<T, F> {
  dest: Subscriber<T>,
  predicate: Rc<RefCell<F>>,
}

impl<T: 'static, F: FnMut(&T) -> bool> Observer<T> for FilterObserver<T, F> {
  fn next(&mut self, value: T) {
    if (self.predicate.borrow_mut())(&value) {
      self.dest.next(value);
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Passes through only the values `predicate` accepts.
  pub fn filter<F>(self, predicate: F) -> Observable<T>
  where
    F: FnMut(&T) -> bool + 'static,
  {
    let predicate = shared_fn(predicate);
    Observable::new(move |sub| {
      let observer = FilterObserver { dest: sub.clone(), predicate: predicate.clone() };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
