//! Error taxonomy shared across the runtime.
//!
//! Every error travelling through a stream is an [`RxError`]: a cheaply
//! cloneable, displayable handle that downstream code can downcast when it
//! needs the concrete type.

use std::fmt;
use std::rc::Rc;

/// The error currency of the runtime.
///
/// `Rc` keeps errors cloneable so one failure can fan out to any number of
/// observers (a multicast error reaches every subscriber).
pub type RxError = Rc<dyn std::error::Error + 'static>;

/// Wraps any concrete error into an [`RxError`].
pub fn wrap<E: std::error::Error + 'static>(err: E) -> RxError {
  Rc::new(err)
}

/// Builds an ad-hoc [`RxError`] from a message.
pub fn message(msg: impl Into<String>) -> RxError {
  Rc::new(MessageError(msg.into()))
}

/// A plain string error for ad-hoc failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MessageError(pub String);

/// An operation was attempted on a `Subject` after it was unsubscribed.
///
/// Distinct from delivery-after-completion (which is silently swallowed):
/// misusing a subject's own API surfaces loudly, at the call site.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("object unsubscribed")]
pub struct ObjectUnsubscribedError;

/// `throw_if_empty` fired on a source that completed without a value.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no elements in sequence")]
pub struct EmptyError;

/// The `timeout` operator expired before the source produced a value.
#[derive(thiserror::Error, Debug, Clone)]
#[error("timeout: {seen} value(s) seen before the deadline")]
pub struct TimeoutError<T: fmt::Debug> {
  /// How many values the source delivered before the deadline hit.
  pub seen: usize,
  /// The most recent value, if any.
  pub last_value: Option<T>,
  /// Caller-supplied diagnostic payload carried over from the timeout
  /// configuration.
  pub meta: Option<Rc<dyn fmt::Debug>>,
}

/// One or more teardown callbacks failed during a single `unsubscribe`.
///
/// A failing teardown never prevents its siblings from running; all
/// failures are collected here after the full teardown pass.
#[derive(Debug, Clone)]
pub struct UnsubscribeError {
  pub errors: Vec<RxError>,
}

impl fmt::Display for UnsubscribeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} teardown error(s) during unsubscribe:", self.errors.len())?;
    for err in &self.errors {
      write!(f, " [{err}]")?;
    }
    Ok(())
  }
}

impl std::error::Error for UnsubscribeError {}

/// A consumer callback failed while handling a notification.
#[derive(Debug, Clone)]
pub struct CallbackError(pub RxError);

impl fmt::Display for CallbackError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "consumer callback failed: {}", self.0)
  }
}

impl std::error::Error for CallbackError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_display_and_downcast() {
    let err = message("boom");
    assert_eq!(err.to_string(), "boom");
    assert!(err.downcast_ref::<MessageError>().is_some());
  }

  #[test]
  fn timeout_error_reports_seen_count() {
    let err = TimeoutError { seen: 3, last_value: Some(42), meta: None };
    assert_eq!(err.to_string(), "timeout: 3 value(s) seen before the deadline");
  }

  #[test]
  fn unsubscribe_error_aggregates() {
    let err = UnsubscribeError { errors: vec![message("a"), message("b")] };
    let text = err.to_string();
    assert!(text.contains("2 teardown error(s)"));
    assert!(text.contains("[a]"));
    assert!(text.contains("[b]"));
  }
}
