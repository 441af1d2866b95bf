use crate::error::RxError;
use crate::observable::{empty, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct TakeObserver<T> {
  dest: Subscriber<T>,
  remaining: usize,
}

impl<T: 'static> Observer<T> for TakeObserver<T> {
  fn next(&mut self, value: T) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.dest.next(value);
    if self.remaining == 0 {
      // Completing the destination unsubscribes the upstream link, which
      // a synchronous producer observes through its closed flag.
      self.dest.complete();
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
  /// Emits the first `count` values, then completes and cancels upstream.
  pub fn take(self, count: usize) -> Observable<T> {
    if count == 0 {
      return empty();
    }
    Observable::new(move |sub| {
      let observer = TakeObserver { dest: sub.clone(), remaining: count };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
