use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct MapObserver<R, F> {
  dest: Subscriber<R>,
  project: Rc<RefCell<F>>,
}

impl<T, R: 'static, F: FnMut(T) -> R> Observer<T> for MapObserver<R, F> {
  fn next(&mut self, value: T) {
    let mapped = (self.project.borrow_mut())(value);
    self.dest.next(mapped);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Transforms each value through `project`.
  pub fn map<R, F>(self, project: F) -> Observable<R>
  where
    R: 'static,
    F: FnMut(T) -> R + 'static,
  {
    let project = shared_fn(project);
    Observable::new(move |sub| {
      let observer = MapObserver { dest: sub.clone(), project: project.clone() };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }

  /// Replaces every value with a clone of `value`.
  pub fn map_to<R: Clone + 'static>(self, value: R) -> Observable<R> {
    self.map(move |_| value.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn projects_each_value() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    from_iter(1..=3).map(|v| v * 10).subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![10, 20, 30]);
  }

  #[test]
  fn map_to_discards_the_input() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    from_iter(1..=3).map_to("x").subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec!["x", "x", "x"]);
  }
}
