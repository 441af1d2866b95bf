//! Subject with a current value.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{wrap, ObjectUnsubscribedError, RxError};
use crate::observable::Observable;
use crate::subject::{Subject, SubjectState};
use crate::subscription::TeardownLogic;

/// Holds the latest value and replays it to every new subscriber before
/// live delivery begins.
pub struct BehaviorSubject<T> {
  subject: Subject<T>,
  value: Rc<RefCell<T>>,
}

impl<T> Clone for BehaviorSubject<T> {
  fn clone(&self) -> Self {
    BehaviorSubject { subject: self.subject.clone(), value: self.value.clone() }
  }
}

impl<T: Clone + 'static> BehaviorSubject<T> {
  pub fn new(initial: T) -> Self {
    BehaviorSubject { subject: Subject::new(), value: Rc::new(RefCell::new(initial)) }
  }

  /// The current value. Errors when the subject has errored (with that
  /// error) or was unsubscribed.
  pub fn value(&self) -> Result<T, RxError> {
    match self.subject.state() {
      SubjectState::Errored(e) => Err(e),
      SubjectState::Unsubscribed => Err(wrap(ObjectUnsubscribedError)),
      SubjectState::Live | SubjectState::Completed => Ok(self.value.borrow().clone()),
    }
  }

  pub fn next(&self, value: T) -> Result<(), ObjectUnsubscribedError> {
    if !self.subject.is_stopped() {
      *self.value.borrow_mut() = value.clone();
    }
    self.subject.next(value)
  }

  pub fn error(&self, err: RxError) -> Result<(), ObjectUnsubscribedError> {
    self.subject.error(err)
  }

  pub fn complete(&self) -> Result<(), ObjectUnsubscribedError> {
    self.subject.complete()
  }

  pub fn unsubscribe(&self) {
    self.subject.unsubscribe();
  }

  pub fn is_stopped(&self) -> bool {
    self.subject.is_stopped()
  }

  pub fn subscribed_size(&self) -> usize {
    self.subject.subscribed_size()
  }

  pub fn observable(&self) -> Observable<T> {
    let this = self.clone();
    Observable::new(move |sub| {
      if let SubjectState::Live = this.subject.state() {
        sub.next(this.value.borrow().clone());
      }
      this.subject.attach(sub);
      TeardownLogic::None
    })
  }

  pub fn subscribe(&self, next: impl FnMut(T) + 'static) -> crate::subscription::Subscription {
    self.observable().subscribe(next)
  }
}

impl<T: Clone + 'static> crate::subject::SubjectLike<T> for BehaviorSubject<T> {
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
    if let SubjectState::Live = self.subject.state() {
      subscriber.next(self.value.borrow().clone());
    }
    self.subject.attach(subscriber);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;

  #[test]
  fn replays_the_current_value_on_subscribe() {
    let subject = BehaviorSubject::new(10);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    subject.subscribe(move |v| sink.borrow_mut().push(v));
    subject.next(20).unwrap();

    let sink = seen.clone();
    subject.subscribe(move |v| sink.borrow_mut().push(v));

    assert_eq!(*seen.borrow(), vec![10, 20, 20]);
    assert_eq!(subject.value().unwrap(), 20);
  }

  #[test]
  fn completed_subject_stops_replaying() {
    let subject = BehaviorSubject::new(1);
    subject.complete().unwrap();

    let got_value = Rc::new(RefCell::new(Vec::new()));
    let done = Rc::new(std::cell::Cell::new(false));
    let (g, d) = (got_value.clone(), done.clone());
    subject
      .observable()
      .subscribe_complete(move |v| g.borrow_mut().push(v), move || d.set(true));

    assert!(got_value.borrow().is_empty(), "no value replay after completion");
    assert!(done.get());
    // The last value is still readable after completion.
    assert_eq!(subject.value().unwrap(), 1);
  }

  #[test]
  fn value_after_error_returns_the_error() {
    let subject = BehaviorSubject::new(1);
    subject.error(message("broken")).unwrap();
    assert_eq!(subject.value().unwrap_err().to_string(), "broken");
  }
}
