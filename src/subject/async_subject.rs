//! Subject that emits only its final value.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ObjectUnsubscribedError, RxError};
use crate::observable::Observable;
use crate::subject::{Subject, SubjectState};
use crate::subscription::TeardownLogic;

/// Buffers the latest value silently and emits it exactly once, to every
/// subscriber, when the subject completes. An error discards the value.
pub struct AsyncSubject<T> {
  subject: Subject<T>,
  last: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for AsyncSubject<T> {
  fn clone(&self) -> Self {
    AsyncSubject { subject: self.subject.clone(), last: self.last.clone() }
  }
}

impl<T: Clone + 'static> Default for AsyncSubject<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + 'static> AsyncSubject<T> {
  pub fn new() -> Self {
    AsyncSubject { subject: Subject::new(), last: Rc::new(RefCell::new(None)) }
  }

  pub fn next(&self, value: T) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_unsubscribed() {
      return Err(ObjectUnsubscribedError);
    }
    if !self.subject.is_stopped() {
      *self.last.borrow_mut() = Some(value);
    }
    Ok(())
  }

  pub fn error(&self, err: RxError) -> Result<(), ObjectUnsubscribedError> {
    *self.last.borrow_mut() = None;
    self.subject.error(err)
  }

  pub fn complete(&self) -> Result<(), ObjectUnsubscribedError> {
    if self.subject.is_unsubscribed() {
      return Err(ObjectUnsubscribedError);
    }
    if let Some(value) = self.last.borrow().clone() {
      // Flushes the buffered value to the live observers right before the
      // completion notification.
      self.subject.next(value)?;
    }
    self.subject.complete()
  }

  pub fn unsubscribe(&self) {
    self.subject.unsubscribe();
  }

  pub fn subscribed_size(&self) -> usize {
    self.subject.subscribed_size()
  }

  pub fn observable(&self) -> Observable<T> {
    let this = self.clone();
    Observable::new(move |sub| {
      if let SubjectState::Completed = this.subject.state() {
        if let Some(value) = this.last.borrow().clone() {
          sub.next(value);
        }
      }
      this.subject.attach(sub);
      TeardownLogic::None
    })
  }

  pub fn subscribe(&self, next: impl FnMut(T) + 'static) -> crate::subscription::Subscription {
    self.observable().subscribe(next)
  }
}

impl<T: Clone + 'static> crate::subject::SubjectLike<T> for AsyncSubject<T> {
  fn push_next(&self, value: T) {
    crate::subject::report_misuse(self.next(value));
  }

  fn push_error(&self, err: RxError) {
    crate::subject::report_misuse(self.error(err));
  }

  fn push_complete(&self) {
    crate::subject::report_misuse(self.complete());
  }

  fn attach_subscriber(&self, subscriber: crate::subscriber::Subscriber<T>) {
    if let SubjectState::Completed = self.subject.state() {
      if let Some(value) = self.last.borrow().clone() {
        subscriber.next(value);
      }
    }
    self.subject.attach(subscriber);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;
  use std::cell::Cell;

  #[test]
  fn emits_only_the_last_value_at_completion() {
    let subject = AsyncSubject::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    subject.subscribe(move |v| sink.borrow_mut().push(v));

    subject.next(1).unwrap();
    subject.next(2).unwrap();
    assert!(seen.borrow().is_empty(), "nothing is emitted before completion");

    subject.complete().unwrap();
    assert_eq!(*seen.borrow(), vec![2]);
  }

  #[test]
  fn late_subscriber_still_gets_the_value() {
    let subject = AsyncSubject::new();
    subject.next(9).unwrap();
    subject.complete().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let done = Rc::new(Cell::new(false));
    let (sink, d) = (seen.clone(), done.clone());
    subject
      .observable()
      .subscribe_complete(move |v| sink.borrow_mut().push(v), move || d.set(true));

    assert_eq!(*seen.borrow(), vec![9]);
    assert!(done.get());
  }

  #[test]
  fn error_discards_the_buffered_value() {
    let subject = AsyncSubject::new();
    subject.next(1).unwrap();
    subject.error(message("dead")).unwrap();

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    subject
      .observable()
      .subscribe_err(|_: i32| panic!("no value"), move |e| sink.borrow_mut().push(e.to_string()));
    assert_eq!(*errors.borrow(), vec!["dead"]);
  }
}
