use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

/// Completes the destination on the notifier's first value. A notifier
/// that completes without emitting is ignored.
struct StopObserver<T> {
  dest: Subscriber<T>,
}

impl<T: 'static, N> Observer<N> for StopObserver<T> {
  fn next(&mut self, _value: N) {
    self.dest.complete();
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {}
}

impl<T: 'static> Observable<T> {
  /// Mirrors the source until `notifier` emits, then completes.
  pub fn take_until<N: 'static>(self, notifier: Observable<N>) -> Observable<T> {
    Observable::new(move |sub| {
      // The notifier goes first so an immediately-firing notifier prevents
      // the source from producing at all.
      notifier.chain(sub.subscription(), StopObserver { dest: sub.clone() });
      if !sub.is_closed() {
        self.chain(sub.subscription(), sub.clone());
      }
      TeardownLogic::None
    })
  }
}
