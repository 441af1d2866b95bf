//! The cancellation tree.
//!
//! Every `subscribe` call produces a [`Subscription`]: a node holding the
//! teardown actions and child subscriptions accumulated while the stream was
//! live. Unsubscribing a node cancels the whole subtree synchronously.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

use crate::config;
use crate::error::{RxError, UnsubscribeError};

/// Fallible cleanup callback registered by a producer.
pub type TeardownFn = Box<dyn FnOnce() -> Result<(), RxError>>;

/// Cleanup logic a producer hands back from its subscribe function.
pub enum TeardownLogic {
  None,
  Fn(TeardownFn),
  Subscription(Subscription),
}

impl TeardownLogic {
  /// Wraps an infallible cleanup closure.
  pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
    TeardownLogic::Fn(Box::new(move || {
      f();
      Ok(())
    }))
  }

  /// Wraps a fallible cleanup closure.
  pub fn from_try_fn(f: impl FnOnce() -> Result<(), RxError> + 'static) -> Self {
    TeardownLogic::Fn(Box::new(f))
  }
}

impl From<Subscription> for TeardownLogic {
  fn from(s: Subscription) -> Self {
    TeardownLogic::Subscription(s)
  }
}

/// Anything that can be cancelled and asked whether it already was.
pub trait SubscriptionLike {
  fn unsubscribe(&self);
  fn is_closed(&self) -> bool;
}

enum Teardown {
  Fn(TeardownFn),
  Subscription(Subscription),
}

#[derive(Default)]
struct Inner {
  closed: bool,
  teardowns: SmallVec<[Teardown; 1]>,
}

/// A node in the cancellation tree. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct Subscription(Rc<RefCell<Inner>>);

impl Subscription {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_closed(&self) -> bool {
    self.0.borrow().closed
  }

  /// Shared-identity check; clones of one subscription compare equal.
  pub fn ptr_eq(&self, other: &Subscription) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Registers a child subscription.
  ///
  /// Adding `self` is a no-op (cycles are not representable); adding an
  /// already-closed child is a no-op; adding to an already-closed parent
  /// unsubscribes the child immediately.
  pub fn add(&self, child: Subscription) {
    if self.ptr_eq(&child) || child.is_closed() {
      return;
    }
    let closed = {
      let mut inner = self.0.borrow_mut();
      if !inner.closed {
        // Drop links to children that already tore themselves down.
        inner
          .teardowns
          .retain(|t| !matches!(t, Teardown::Subscription(s) if s.is_closed()));
        inner.teardowns.push(Teardown::Subscription(child.clone()));
      }
      inner.closed
    };
    if closed {
      child.unsubscribe();
    }
  }

  /// Registers an infallible teardown callback, running it immediately when
  /// the subscription is already closed.
  pub fn add_fn(&self, f: impl FnOnce() + 'static) {
    self.add_teardown(TeardownLogic::from_fn(f));
  }

  pub fn add_teardown(&self, teardown: TeardownLogic) {
    match teardown {
      TeardownLogic::None => {}
      TeardownLogic::Subscription(s) => self.add(s),
      TeardownLogic::Fn(f) => {
        let closed = {
          let mut inner = self.0.borrow_mut();
          if !inner.closed {
            inner.teardowns.push(Teardown::Fn(f));
            return;
          }
          inner.closed
        };
        debug_assert!(closed);
        if let Err(e) = f() {
          config::report_unhandled(e);
        }
      }
    }
  }

  /// Detaches a previously added child without running it.
  pub fn remove(&self, child: &Subscription) {
    self
      .0
      .borrow_mut()
      .teardowns
      .retain(|t| !matches!(t, Teardown::Subscription(s) if s.ptr_eq(child)));
  }

  pub(crate) fn teardown_len(&self) -> usize {
    self.0.borrow().teardowns.len()
  }

  /// Idempotent cancellation. Runs every teardown in insertion order; a
  /// failing teardown never stops its siblings. Collected failures are
  /// returned as one aggregate error.
  pub fn try_unsubscribe(&self) -> Result<(), UnsubscribeError> {
    let teardowns = {
      let mut inner = self.0.borrow_mut();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardowns)
    };

    let mut errors = Vec::new();
    for teardown in teardowns {
      match teardown {
        Teardown::Fn(f) => {
          if let Err(e) = f() {
            errors.push(e);
          }
        }
        Teardown::Subscription(s) => {
          if let Err(e) = s.try_unsubscribe() {
            errors.extend(e.errors);
          }
        }
      }
    }

    if errors.is_empty() {
      Ok(())
    } else {
      Err(UnsubscribeError { errors })
    }
  }
}

impl SubscriptionLike for Subscription {
  /// Infallible cancellation for internal paths: aggregate teardown
  /// failures are routed to the unhandled-error hook, never dropped.
  fn unsubscribe(&self) {
    if let Err(e) = self.try_unsubscribe() {
      config::report_unhandled(Rc::new(e));
    }
  }

  fn is_closed(&self) -> bool {
    Subscription::is_closed(self)
  }
}

/// RAII wrapper: unsubscribes when dropped.
#[must_use]
pub struct SubscriptionGuard(pub Subscription);

impl SubscriptionGuard {
  pub fn new(subscription: Subscription) -> Self {
    SubscriptionGuard(subscription)
  }
}

impl Drop for SubscriptionGuard {
  fn drop(&mut self) {
    self.0.unsubscribe();
  }
}

impl Subscription {
  /// Activates RAII behavior: the returned guard unsubscribes when it goes
  /// out of scope.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard {
    SubscriptionGuard(self)
  }
}
