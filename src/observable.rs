//! The producer abstraction.
//!
//! An [`Observable`] is a reusable, immutable description of how to produce
//! values: a function that, handed a guarded [`Subscriber`], pushes events
//! into it and returns teardown logic. Cold by default: every `subscribe`
//! re-invokes the producer.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observer::Observer;
use crate::subscriber::{Destination, Subscriber};
use crate::subscription::{Subscription, TeardownLogic};

mod callback;
mod from;
mod future;
mod timed;

pub use callback::*;
pub use from::*;
pub use future::*;
pub use timed::*;

type ProducerFn<T> = dyn Fn(Subscriber<T>) -> Result<TeardownLogic, RxError>;

/// A deferred, repeatable computation that pushes values to a subscriber.
pub struct Observable<T> {
  producer: Rc<ProducerFn<T>>,
}

impl<T> Clone for Observable<T> {
  fn clone(&self) -> Self {
    Observable { producer: self.producer.clone() }
  }
}

impl<T: 'static> Observable<T> {
  /// Builds an observable from an infallible producer.
  pub fn new(producer: impl Fn(Subscriber<T>) -> TeardownLogic + 'static) -> Self {
    Observable { producer: Rc::new(move |sub| Ok(producer(sub))) }
  }

  /// Builds an observable from a fallible producer. A producer `Err` is
  /// funneled to the subscriber's error path, so teardown registered
  /// before the failure still runs.
  pub fn create(
    producer: impl Fn(Subscriber<T>) -> Result<TeardownLogic, RxError> + 'static,
  ) -> Self {
    Observable { producer: Rc::new(producer) }
  }

  /// Shared-identity check; clones of one observable compare equal. This
  /// is the documented equality contract behind `pipe` with zero
  /// operators and the `empty`/`never` singletons.
  pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
    Rc::ptr_eq(&self.producer, &other.producer)
  }

  /// Subscribes with a `next` handler only.
  pub fn subscribe(&self, next: impl FnMut(T) + 'static) -> Subscription {
    self.subscribe_destination(make_fns(Some(infallible(next)), None, None))
  }

  /// Subscribes with `next` and `error` handlers.
  pub fn subscribe_err(
    &self,
    next: impl FnMut(T) + 'static,
    error: impl FnMut(RxError) + 'static,
  ) -> Subscription {
    self.subscribe_destination(make_fns(Some(infallible(next)), Some(Box::new(error)), None))
  }

  /// Subscribes with `next` and `complete` handlers.
  pub fn subscribe_complete(
    &self,
    next: impl FnMut(T) + 'static,
    complete: impl FnMut() + 'static,
  ) -> Subscription {
    self.subscribe_destination(make_fns(Some(infallible(next)), None, Some(Box::new(complete))))
  }

  /// Subscribes with the full handler set.
  pub fn subscribe_all(
    &self,
    next: impl FnMut(T) + 'static,
    error: impl FnMut(RxError) + 'static,
    complete: impl FnMut() + 'static,
  ) -> Subscription {
    self.subscribe_destination(make_fns(
      Some(infallible(next)),
      Some(Box::new(error)),
      Some(Box::new(complete)),
    ))
  }

  /// Subscribes with a fallible `next` handler: an `Err` feeds the
  /// subscriber's own error path.
  pub fn subscribe_try(
    &self,
    next: impl FnMut(T) -> Result<(), RxError> + 'static,
    error: impl FnMut(RxError) + 'static,
  ) -> Subscription {
    self.subscribe_destination(make_fns(Some(Box::new(next)), Some(Box::new(error)), None))
  }

  /// Subscribes a full [`Observer`] implementation.
  pub fn subscribe_observer(&self, observer: impl Observer<T> + 'static) -> Subscription {
    self.subscribe_destination(Destination::Observer(Box::new(observer)))
  }

  fn subscribe_destination(&self, dest: Destination<T>) -> Subscription {
    let subscriber = Subscriber::from_destination(dest);
    let subscription = subscriber.subscription().clone();
    self.subscribe_subscriber(subscriber);
    subscription
  }

  /// Invokes the producer against an existing guarded subscriber.
  pub(crate) fn subscribe_subscriber(&self, subscriber: Subscriber<T>) {
    if subscriber.is_closed() {
      return;
    }
    match (self.producer)(subscriber.clone()) {
      Ok(teardown) => subscriber.subscription().add_teardown(teardown),
      Err(e) => subscriber.error(e),
    }
  }

  /// Subscribes upstream with `observer`, registering the new link as a
  /// child of `parent` so downstream unsubscription propagates up.
  /// Returns the upstream link's own subscription.
  pub(crate) fn chain(
    &self,
    parent: &Subscription,
    observer: impl Observer<T> + 'static,
  ) -> Subscription {
    let up = Subscriber::from_observer(observer);
    let up_sub = up.subscription().clone();
    parent.add(up_sub.clone());
    self.subscribe_subscriber(up);
    up_sub
  }

  /// Applies one composition step. See the [`pipe!`](crate::pipe) macro
  /// for n-ary chains.
  pub fn pipe<R>(self, op: impl FnOnce(Observable<T>) -> Observable<R>) -> Observable<R> {
    op(self)
  }
}

fn make_fns<T>(
  next: Option<crate::subscriber::NextFn<T>>,
  error: Option<crate::subscriber::ErrorFn>,
  complete: Option<crate::subscriber::CompleteFn>,
) -> Destination<T> {
  Destination::Fns { next, error, complete }
}

fn infallible<T>(mut f: impl FnMut(T) + 'static) -> crate::subscriber::NextFn<T> {
  Box::new(move |v| {
    f(v);
    Ok(())
  })
}

/// Shares a `FnMut` between re-invocations of a producer closure.
pub(crate) fn shared_fn<F>(f: F) -> Rc<RefCell<F>> {
  Rc::new(RefCell::new(f))
}

/// Left-to-right operator chaining.
///
/// `pipe!(src => map(f), filter(g))` expands to `src.map(f).filter(g)`;
/// `pipe!(src)` is `src` itself (referential identity preserved).
#[macro_export]
macro_rules! pipe {
  ($src:expr) => { $src };
  ($src:expr => $($op:ident($($arg:expr),* $(,)?)),+ $(,)?) => {{
    let __piped = $src;
    $(let __piped = __piped.$op($($arg),*);)+
    __piped
  }};
}
