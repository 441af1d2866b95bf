//! Reified stream events.

use crate::error::RxError;

/// A single stream event as a value.
///
/// Streams deliver `Next*` followed by at most one of `Error` / `Complete`;
/// reifying the event lets schedulers and the test harness move events
/// around as plain data.
#[derive(Clone, Debug)]
pub enum Notification<T> {
  Next(T),
  Error(RxError),
  Complete,
}

impl<T> Notification<T> {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Notification::Next(_))
  }

  /// Maps the carried value, leaving terminal events untouched.
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Notification<R> {
    match self {
      Notification::Next(v) => Notification::Next(f(v)),
      Notification::Error(e) => Notification::Error(e),
      Notification::Complete => Notification::Complete,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;

  #[test]
  fn terminal_classification() {
    assert!(!Notification::Next(1).is_terminal());
    assert!(Notification::<i32>::Error(message("x")).is_terminal());
    assert!(Notification::<i32>::Complete.is_terminal());
  }

  #[test]
  fn map_only_touches_next() {
    match Notification::Next(2).map(|v| v * 10) {
      Notification::Next(v) => assert_eq!(v, 20),
      _ => panic!("expected next"),
    }
    match Notification::<i32>::Complete.map(|v| v * 10) {
      Notification::Complete => {}
      _ => panic!("expected complete"),
    }
  }
}
