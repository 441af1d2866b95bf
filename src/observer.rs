//! The consumer-side contract.

use crate::error::RxError;

/// Receives values, an error, or completion from a stream.
///
/// All methods take `&mut self` so the trait stays object-safe and a
/// terminal event does not have to consume the observer; the guarding in
/// [`crate::subscriber::Subscriber`] enforces that nothing is delivered
/// after a terminal event anyway.
pub trait Observer<T> {
  fn next(&mut self, value: T);
  fn error(&mut self, err: RxError);
  fn complete(&mut self);
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
  fn next(&mut self, value: T) {
    (**self).next(value);
  }

  fn error(&mut self, err: RxError) {
    (**self).error(err);
  }

  fn complete(&mut self) {
    (**self).complete();
  }
}

/// Closure adapter: the closure handles `next`, terminal events are ignored.
pub struct FnObserver<F>(pub F);

impl<T, F: FnMut(T)> Observer<T> for FnObserver<F> {
  fn next(&mut self, value: T) {
    (self.0)(value);
  }

  fn error(&mut self, _err: RxError) {}

  fn complete(&mut self) {}
}

/// Collects every notification it sees; handy in tests.
#[cfg(test)]
pub(crate) struct RecordingObserver<T> {
  pub notifications: std::rc::Rc<std::cell::RefCell<Vec<crate::notification::Notification<T>>>>,
}

#[cfg(test)]
impl<T> Observer<T> for RecordingObserver<T> {
  fn next(&mut self, value: T) {
    self.notifications.borrow_mut().push(crate::notification::Notification::Next(value));
  }

  fn error(&mut self, err: RxError) {
    self.notifications.borrow_mut().push(crate::notification::Notification::Error(err));
  }

  fn complete(&mut self) {
    self.notifications.borrow_mut().push(crate::notification::Notification::Complete);
  }
}
