use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct ScanObserver<S, F> {
  dest: Subscriber<S>,
  acc: Rc<RefCell<F>>,
  state: S,
}

impl<T, S: Clone + 'static, F: FnMut(S, T) -> S> Observer<T> for ScanObserver<S, F> {
  fn next(&mut self, value: T) {
    self.state = (self.acc.borrow_mut())(self.state.clone(), value);
    self.dest.next(self.state.clone());
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Emits every intermediate accumulation, starting from `seed` (the seed
  /// itself is not emitted). Each subscription accumulates independently.
  pub fn scan<S, F>(self, seed: S, acc: F) -> Observable<S>
  where
    S: Clone + 'static,
    F: FnMut(S, T) -> S + 'static,
  {
    let acc = shared_fn(acc);
    Observable::new(move |sub| {
      let observer = ScanObserver { dest: sub.clone(), acc: acc.clone(), state: seed.clone() };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
