//! Process-wide runtime configuration.
//!
//! The runtime is single-threaded per logical stream graph, so configuration
//! lives in thread-local storage: constructed once, read through accessor
//! functions, never mutated ambiently from the hot path.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;

/// A notification that arrived after its subscriber had already stopped.
#[derive(Clone, Debug)]
pub enum DroppedNotification {
  Next,
  Error(RxError),
  Complete,
}

type ErrorHook = Rc<dyn Fn(RxError)>;
type StoppedHook = Rc<dyn Fn(DroppedNotification)>;

#[derive(Default)]
pub struct Config {
  /// Invoked for errors that reach a subscriber with no error handler.
  /// When unset, errors are reported through `tracing::error!`.
  pub on_unhandled_error: Option<ErrorHook>,
  /// Invoked for notifications delivered after a terminal event. When
  /// unset, drops are reported through `tracing::debug!`.
  pub on_stopped_notification: Option<StoppedHook>,
  /// Legacy mode: unhandled errors raised during a synchronous dispatch are
  /// captured and surfaced at the originating call boundary via
  /// [`take_sync_error`] instead of going to the unhandled-error hook.
  /// Off by default; kept for backward-compatible migrations only.
  pub use_deprecated_sync_error_handling: bool,
}

thread_local! {
  static CONFIG: RefCell<Config> = RefCell::new(Config::default());
  static SYNC_ERROR: RefCell<Option<RxError>> = const { RefCell::new(None) };
}

/// Adjusts the configuration for the current thread.
pub fn configure(f: impl FnOnce(&mut Config)) {
  CONFIG.with(|c| f(&mut c.borrow_mut()));
}

/// Restores the default configuration. Intended for tests.
pub fn reset() {
  CONFIG.with(|c| *c.borrow_mut() = Config::default());
  SYNC_ERROR.with(|s| *s.borrow_mut() = None);
}

/// Retrieves (and clears) an error captured under deprecated synchronous
/// error handling. Returns `None` when the mode is off or nothing failed.
pub fn take_sync_error() -> Option<RxError> {
  SYNC_ERROR.with(|s| s.borrow_mut().take())
}

pub(crate) fn sync_error_handling_enabled() -> bool {
  CONFIG.with(|c| c.borrow().use_deprecated_sync_error_handling)
}

/// Routes an error that no consumer handler claimed.
pub(crate) fn report_unhandled(err: RxError) {
  if sync_error_handling_enabled() {
    SYNC_ERROR.with(|s| {
      let mut slot = s.borrow_mut();
      // First failure wins; later ones still get reported.
      if slot.is_none() {
        *slot = Some(err);
        return;
      }
      drop(slot);
      report_to_hook(err);
    });
    return;
  }
  report_to_hook(err);
}

fn report_to_hook(err: RxError) {
  let hook = CONFIG.with(|c| c.borrow().on_unhandled_error.clone());
  match hook {
    Some(hook) => hook(err),
    None => tracing::error!(error = %err, "unhandled stream error"),
  }
}

/// Routes a notification that arrived after its subscriber stopped.
pub(crate) fn report_stopped(notification: DroppedNotification) {
  let hook = CONFIG.with(|c| c.borrow().on_stopped_notification.clone());
  match hook {
    Some(hook) => hook(notification),
    None => tracing::debug!(?notification, "notification after terminal event dropped"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;
  use std::cell::Cell;

  #[test]
  fn unhandled_errors_reach_the_hook() {
    reset();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_c = seen.clone();
    configure(move |c| {
      c.on_unhandled_error = Some(Rc::new(move |e| seen_c.borrow_mut().push(e.to_string())));
    });

    report_unhandled(message("lost"));
    assert_eq!(*seen.borrow(), vec!["lost".to_string()]);
    reset();
  }

  #[test]
  fn sync_mode_captures_first_error() {
    reset();
    configure(|c| c.use_deprecated_sync_error_handling = true);

    report_unhandled(message("first"));
    let captured = take_sync_error().expect("captured");
    assert_eq!(captured.to_string(), "first");
    assert!(take_sync_error().is_none());
    reset();
  }

  #[test]
  fn stopped_notifications_reach_the_hook() {
    reset();
    let count = Rc::new(Cell::new(0));
    let count_c = count.clone();
    configure(move |c| {
      c.on_stopped_notification = Some(Rc::new(move |_| count_c.set(count_c.get() + 1)));
    });

    report_stopped(DroppedNotification::Next);
    report_stopped(DroppedNotification::Complete);
    assert_eq!(count.get(), 2);
    reset();
  }
}
