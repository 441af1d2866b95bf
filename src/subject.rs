//! Multicast pipes.
//!
//! A [`Subject`] is both a stream and an observer: values pushed in are
//! fanned out to every current subscriber. Unlike delivery guards (which
//! silently drop late notifications), misusing a subject's own input API
//! after [`unsubscribe`](Subject::unsubscribe) is an error the caller sees.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config;
use crate::error::{wrap, ObjectUnsubscribedError, RxError};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, TeardownLogic};

mod async_subject;
mod behavior;
mod replay;

pub use async_subject::*;
pub use behavior::*;
pub use replay::*;

/// Common surface of the subject family, as seen by multicast machinery:
/// a feed side whose misuse errors go to the unhandled-error hook, and an
/// attach side that wires a subscriber in with the flavor's replay rules.
pub trait SubjectLike<T>: 'static {
  fn push_next(&self, value: T);
  fn push_error(&self, err: RxError);
  fn push_complete(&self);
  fn attach_subscriber(&self, subscriber: Subscriber<T>);
}

pub(crate) fn report_misuse(result: Result<(), ObjectUnsubscribedError>) {
  if let Err(e) = result {
    config::report_unhandled(wrap(e));
  }
}

struct SubjectInner<T> {
  observers: Vec<Subscriber<T>>,
  error: Option<RxError>,
  completed: bool,
  unsubscribed: bool,
}

pub(crate) enum SubjectState {
  Live,
  Errored(RxError),
  Completed,
  Unsubscribed,
}

/// A plain multicast subject with no memory: subscribers see only values
/// pushed after they arrived, and a terminal event is replayed to anyone
/// subscribing later.
pub struct Subject<T> {
  inner: Rc<RefCell<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self {
    Subject { inner: self.inner.clone() }
  }
}

impl<T: 'static> Default for Subject<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: 'static> Subject<T> {
  pub fn new() -> Self {
    Subject {
      inner: Rc::new(RefCell::new(SubjectInner {
        observers: Vec::new(),
        error: None,
        completed: false,
        unsubscribed: false,
      })),
    }
  }

  /// Stopped subjects accept no further input; they may still replay their
  /// terminal event to late subscribers.
  pub fn is_stopped(&self) -> bool {
    let inner = self.inner.borrow();
    inner.completed || inner.error.is_some() || inner.unsubscribed
  }

  pub fn is_unsubscribed(&self) -> bool {
    self.inner.borrow().unsubscribed
  }

  /// Number of currently attached observers.
  pub fn subscribed_size(&self) -> usize {
    self.inner.borrow().observers.len()
  }

  /// Closes the subject's input side and detaches every observer without
  /// notifying them. Subsequent input or subscription is a misuse error.
  pub fn unsubscribe(&self) {
    let mut inner = self.inner.borrow_mut();
    inner.unsubscribed = true;
    inner.observers.clear();
  }

  pub(crate) fn state(&self) -> SubjectState {
    let inner = self.inner.borrow();
    if inner.unsubscribed {
      SubjectState::Unsubscribed
    } else if let Some(e) = &inner.error {
      SubjectState::Errored(e.clone())
    } else if inner.completed {
      SubjectState::Completed
    } else {
      SubjectState::Live
    }
  }

  fn check_open(&self) -> Result<(), ObjectUnsubscribedError> {
    if self.inner.borrow().unsubscribed {
      Err(ObjectUnsubscribedError)
    } else {
      Ok(())
    }
  }

  /// Snapshot of the observers; notifications go to this snapshot so an
  /// observer subscribing or unsubscribing mid-delivery does not affect
  /// the current round.
  fn snapshot(&self) -> Vec<Subscriber<T>> {
    self.inner.borrow().observers.clone()
  }

  pub fn error(&self, err: RxError) -> Result<(), ObjectUnsubscribedError> {
    self.check_open()?;
    let observers = {
      let mut inner = self.inner.borrow_mut();
      if inner.completed || inner.error.is_some() {
        return Ok(());
      }
      inner.error = Some(err.clone());
      std::mem::take(&mut inner.observers)
    };
    for observer in observers {
      observer.error(err.clone());
    }
    Ok(())
  }

  pub fn complete(&self) -> Result<(), ObjectUnsubscribedError> {
    self.check_open()?;
    let observers = {
      let mut inner = self.inner.borrow_mut();
      if inner.completed || inner.error.is_some() {
        return Ok(());
      }
      inner.completed = true;
      std::mem::take(&mut inner.observers)
    };
    for observer in observers {
      observer.complete();
    }
    Ok(())
  }
}

impl<T: Clone + 'static> Subject<T> {
  pub fn next(&self, value: T) -> Result<(), ObjectUnsubscribedError> {
    self.check_open()?;
    if self.is_stopped() {
      return Ok(());
    }
    for observer in self.snapshot() {
      observer.next(value.clone());
    }
    Ok(())
  }
}

impl<T: 'static> Subject<T> {
  /// Registers a live subscriber; its own unsubscription detaches it.
  pub(crate) fn register(&self, subscriber: Subscriber<T>) {
    self.inner.borrow_mut().observers.push(subscriber.clone());
    let inner = Rc::downgrade(&self.inner);
    let key = subscriber.subscription().clone();
    subscriber.subscription().add_fn(move || {
      if let Some(inner) = inner.upgrade() {
        inner
          .borrow_mut()
          .observers
          .retain(|o| !o.subscription().ptr_eq(&key));
      }
    });
  }

  pub(crate) fn attach(&self, subscriber: Subscriber<T>) {
    match self.state() {
      SubjectState::Live => self.register(subscriber),
      SubjectState::Errored(e) => subscriber.error(e),
      SubjectState::Completed => subscriber.complete(),
      SubjectState::Unsubscribed => subscriber.error(wrap(ObjectUnsubscribedError)),
    }
  }

  /// The subject's output side.
  pub fn observable(&self) -> Observable<T> {
    let subject = self.clone();
    Observable::new(move |sub| {
      subject.attach(sub);
      TeardownLogic::None
    })
  }

  pub fn subscribe(&self, next: impl FnMut(T) + 'static) -> Subscription {
    self.observable().subscribe(next)
  }

  pub fn subscribe_all(
    &self,
    next: impl FnMut(T) + 'static,
    error: impl FnMut(RxError) + 'static,
    complete: impl FnMut() + 'static,
  ) -> Subscription {
    self.observable().subscribe_all(next, error, complete)
  }
}

/// Feeding a subject through [`Observer`] routes misuse errors to the
/// unhandled-error hook, since the trait has no error channel of its own.
impl<T: Clone + 'static> Observer<T> for Subject<T> {
  fn next(&mut self, value: T) {
    report_misuse(Subject::next(self, value));
  }

  fn error(&mut self, err: RxError) {
    report_misuse(Subject::error(self, err));
  }

  fn complete(&mut self) {
    report_misuse(Subject::complete(self));
  }
}

impl<T: Clone + 'static> SubjectLike<T> for Subject<T> {
  fn push_next(&self, value: T) {
    report_misuse(self.next(value));
  }

  fn push_error(&self, err: RxError) {
    report_misuse(self.error(err));
  }

  fn push_complete(&self) {
    report_misuse(self.complete());
  }

  fn attach_subscriber(&self, subscriber: Subscriber<T>) {
    self.attach(subscriber);
  }
}
