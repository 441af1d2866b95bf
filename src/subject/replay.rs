//! Subject with a bounded memory of past values.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{ObjectUnsubscribedError, RxError};
use crate::observable::Observable;
use crate::scheduler::SchedulerRef;
use crate::subject::{Subject, SubjectState};
use crate::subscription::TeardownLogic;

/// Replays up to `count` recent values (optionally limited to a time
/// window on a scheduler's clock) to each new subscriber, then continues
/// live. The buffer is replayed even after the subject terminated, ahead
/// of the terminal event.
pub struct ReplaySubject<T> {
  subject: Subject<T>,
  buffer: Rc<RefCell<VecDeque<(Duration, T)>>>,
  count: usize,
  window: Option<(Duration, SchedulerRef)>,
}

impl<T> Clone for ReplaySubject<T> {
  fn clone(&self) -> Self {
    ReplaySubject {
      subject: self.subject.clone(),
      buffer: self.buffer.clone(),
      count: self.count,
      window: self.window.clone(),
    }
  }
}

impl<T: Clone + 'static> ReplaySubject<T> {
  /// Buffers the `count` most recent values.
  pub fn new(count: usize) -> Self {
    ReplaySubject {
      subject: Subject::new(),
      buffer: Rc::new(RefCell::new(VecDeque::new())),
      count,
      window: None,
    }
  }

  /// Buffers every value ever pushed.
  pub fn unbounded() -> Self {
    Self::new(usize::MAX)
  }

  /// Additionally expires buffered values older than `window`, measured on
  /// `scheduler`'s clock.
  pub fn with_window(count: usize, window: Duration, scheduler: SchedulerRef) -> Self {
    let mut s = Self::new(count);
    s.window = Some((window, scheduler));
    s
  }

  fn now(&self) -> Duration {
    match &self.window {
      Some((_, scheduler)) => scheduler.now(),
      None => Duration::ZERO,
    }
  }

  fn trim(&self) {
    let mut buffer = self.buffer.borrow_mut();
    while buffer.len() > self.count {
      buffer.pop_front();
    }
    if let Some((window, scheduler)) = &self.window {
      let now = scheduler.now();
      let horizon = now.saturating_sub(*window);
      while buffer.front().is_some_and(|(at, _)| *at < horizon) {
        buffer.pop_front();
      }
    }
  }

  pub fn next(&self, value: T) -> Result<(), ObjectUnsubscribedError> {
    if !self.subject.is_stopped() {
      self.buffer.borrow_mut().push_back((self.now(), value.clone()));
      self.trim();
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

  pub fn subscribed_size(&self) -> usize {
    self.subject.subscribed_size()
  }

  pub fn observable(&self) -> Observable<T> {
    let this = self.clone();
    Observable::new(move |sub| {
      this.replay_to(&sub);
      this.subject.attach(sub);
      TeardownLogic::None
    })
  }

  pub fn subscribe(&self, next: impl FnMut(T) + 'static) -> crate::subscription::Subscription {
    self.observable().subscribe(next)
  }

  fn replay_to(&self, subscriber: &crate::subscriber::Subscriber<T>) {
    if !matches!(self.subject.state(), SubjectState::Unsubscribed) {
      self.trim();
      let snapshot: Vec<T> = self.buffer.borrow().iter().map(|(_, v)| v.clone()).collect();
      for value in snapshot {
        subscriber.next(value);
      }
    }
  }
}

impl<T: Clone + 'static> crate::subject::SubjectLike<T> for ReplaySubject<T> {
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
    self.replay_to(&subscriber);
    self.subject.attach(subscriber);
  }
}
