use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct DistinctObserver<T> {
  dest: Subscriber<T>,
  last: Option<T>,
}

impl<T: Clone + PartialEq + 'static> Observer<T> for DistinctObserver<T> {
  fn next(&mut self, value: T) {
    if self.last.as_ref() == Some(&value) {
      return;
    }
    self.last = Some(value.clone());
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
  /// Suppresses a value equal to its immediate predecessor.
  pub fn distinct_until_changed(self) -> Observable<T> {
    Observable::new(move |sub| {
      let observer = DistinctObserver { dest: sub.clone(), last: None };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
