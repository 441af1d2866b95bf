//! The guarded consumer wrapper.
//!
//! A [`Subscriber`] decorates a destination (closures or a boxed
//! [`Observer`]) with the delivery protocol: values flow only while the
//! subscriber is live, at most one terminal event is ever delivered, and a
//! terminal event unsubscribes the subscriber's own [`Subscription`] so
//! finalizers run. A subscriber IS-A subscription: unsubscribing it tears
//! down everything registered beneath it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::{self, DroppedNotification};
use crate::error::RxError;
use crate::notification::Notification;
use crate::observer::Observer;
use crate::subscription::{Subscription, SubscriptionLike};

pub(crate) type NextFn<T> = Box<dyn FnMut(T) -> Result<(), RxError>>;
pub(crate) type ErrorFn = Box<dyn FnMut(RxError)>;
pub(crate) type CompleteFn = Box<dyn FnMut()>;

pub(crate) enum Destination<T> {
  Fns {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
  },
  Observer(Box<dyn Observer<T>>),
}

/// A destination wrapped with guard state. Cheap to clone; clones share
/// the guard, the destination, and the subscription.
pub struct Subscriber<T> {
  dest: Rc<RefCell<Destination<T>>>,
  queue: Rc<RefCell<VecDeque<Notification<T>>>>,
  dispatching: Rc<Cell<bool>>,
  stopped: Rc<Cell<bool>>,
  subscription: Subscription,
}

impl<T> Clone for Subscriber<T> {
  fn clone(&self) -> Self {
    Subscriber {
      dest: self.dest.clone(),
      queue: self.queue.clone(),
      dispatching: self.dispatching.clone(),
      stopped: self.stopped.clone(),
      subscription: self.subscription.clone(),
    }
  }
}

impl<T: 'static> Subscriber<T> {
  pub(crate) fn from_destination(dest: Destination<T>) -> Self {
    Subscriber {
      dest: Rc::new(RefCell::new(dest)),
      queue: Rc::new(RefCell::new(VecDeque::new())),
      dispatching: Rc::new(Cell::new(false)),
      stopped: Rc::new(Cell::new(false)),
      subscription: Subscription::new(),
    }
  }

  pub(crate) fn from_observer(observer: impl Observer<T> + 'static) -> Self {
    Self::from_destination(Destination::Observer(Box::new(observer)))
  }

  pub fn subscription(&self) -> &Subscription {
    &self.subscription
  }

  /// Stopped by a terminal event, or unsubscribed. Producers iterating a
  /// synchronous source must consult this between emissions.
  pub fn is_closed(&self) -> bool {
    self.stopped.get() || self.subscription.is_closed()
  }

  pub fn next(&self, value: T) {
    self.push(Notification::Next(value));
  }

  pub fn error(&self, err: RxError) {
    self.push(Notification::Error(err));
  }

  pub fn complete(&self) {
    self.push(Notification::Complete);
  }

  /// Queue-and-drain dispatch. A destination callback that re-enters the
  /// same subscriber only enqueues; the outer frame finishes the current
  /// delivery and then drains, so the destination is never re-entered.
  fn push(&self, notification: Notification<T>) {
    self.queue.borrow_mut().push_back(notification);
    if self.dispatching.get() {
      return;
    }
    self.dispatching.set(true);
    loop {
      let next = self.queue.borrow_mut().pop_front();
      match next {
        Some(n) => self.deliver(n),
        None => break,
      }
    }
    self.dispatching.set(false);
  }

  fn deliver(&self, notification: Notification<T>) {
    match notification {
      Notification::Next(value) => {
        if self.is_closed() {
          config::report_stopped(DroppedNotification::Next);
          return;
        }
        let result = {
          let mut dest = self.dest.borrow_mut();
          match &mut *dest {
            Destination::Fns { next: Some(f), .. } => f(value),
            Destination::Fns { next: None, .. } => Ok(()),
            Destination::Observer(o) => {
              o.next(value);
              Ok(())
            }
          }
        };
        // A failing consumer callback feeds the subscriber's own error
        // path instead of escaping the producer's call frame.
        if let Err(e) = result {
          self.deliver(Notification::Error(e));
        }
      }
      Notification::Error(err) => {
        if self.is_closed() {
          config::report_stopped(DroppedNotification::Error(err));
          return;
        }
        self.stopped.set(true);
        {
          let mut dest = self.dest.borrow_mut();
          match &mut *dest {
            Destination::Fns { error: Some(h), .. } => h(err),
            Destination::Fns { error: None, .. } => config::report_unhandled(err),
            Destination::Observer(o) => o.error(err),
          }
        }
        self.subscription.unsubscribe();
      }
      Notification::Complete => {
        if self.is_closed() {
          config::report_stopped(DroppedNotification::Complete);
          return;
        }
        self.stopped.set(true);
        {
          let mut dest = self.dest.borrow_mut();
          match &mut *dest {
            Destination::Fns { complete: Some(h), .. } => h(),
            Destination::Fns { complete: None, .. } => {}
            Destination::Observer(o) => o.complete(),
          }
        }
        self.subscription.unsubscribe();
      }
    }
  }
}

impl<T: 'static> Observer<T> for Subscriber<T> {
  fn next(&mut self, value: T) {
    Subscriber::next(self, value);
  }

  fn error(&mut self, err: RxError) {
    Subscriber::error(self, err);
  }

  fn complete(&mut self) {
    Subscriber::complete(self);
  }
}

impl<T: 'static> SubscriptionLike for Subscriber<T> {
  fn unsubscribe(&self) {
    self.stopped.set(true);
    self.subscription.unsubscribe();
  }

  fn is_closed(&self) -> bool {
    Subscriber::is_closed(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;

  fn fns<T: 'static>(
    log: Rc<RefCell<Vec<String>>>,
  ) -> Destination<T>
  where
    T: std::fmt::Debug,
  {
    let l1 = log.clone();
    let l2 = log.clone();
    let l3 = log;
    Destination::Fns {
      next: Some(Box::new(move |v: T| {
        l1.borrow_mut().push(format!("next {v:?}"));
        Ok(())
      })),
      error: Some(Box::new(move |e| l2.borrow_mut().push(format!("error {e}")))),
      complete: Some(Box::new(move || l3.borrow_mut().push("complete".into()))),
    }
  }

  #[test]
  fn at_most_one_terminal_event() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = Subscriber::from_destination(fns::<i32>(log.clone()));

    sub.next(1);
    sub.complete();
    sub.next(2);
    sub.error(message("late"));
    sub.complete();

    assert_eq!(*log.borrow(), vec!["next 1", "complete"]);
  }

  #[test]
  fn error_stops_the_stream() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = Subscriber::from_destination(fns::<i32>(log.clone()));

    sub.next(1);
    sub.error(message("boom"));
    sub.next(2);

    assert_eq!(*log.borrow(), vec!["next 1", "error boom"]);
    assert!(sub.is_closed());
  }

  #[test]
  fn unsubscribe_silences_everything() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = Subscriber::from_destination(fns::<i32>(log.clone()));

    sub.next(1);
    SubscriptionLike::unsubscribe(&sub);
    sub.next(2);
    sub.complete();

    assert_eq!(*log.borrow(), vec!["next 1"]);
  }

  #[test]
  fn terminal_event_runs_finalizers() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = Subscriber::from_destination(fns::<i32>(log.clone()));
    let l = log.clone();
    sub.subscription().add_fn(move || l.borrow_mut().push("teardown".into()));

    sub.complete();
    assert_eq!(*log.borrow(), vec!["complete", "teardown"]);
  }

  #[test]
  fn failing_next_callback_feeds_error_path() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l1 = log.clone();
    let l2 = log.clone();
    let sub = Subscriber::from_destination(Destination::Fns {
      next: Some(Box::new(move |v: i32| {
        l1.borrow_mut().push(format!("next {v}"));
        if v == 2 { Err(message("bad value")) } else { Ok(()) }
      })),
      error: Some(Box::new(move |e| l2.borrow_mut().push(format!("error {e}")))),
      complete: None,
    });

    sub.next(1);
    sub.next(2);
    sub.next(3);

    assert_eq!(*log.borrow(), vec!["next 1", "next 2", "error bad value"]);
  }

  #[test]
  fn reentrant_next_is_deferred_not_nested() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let slot: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::new(RefCell::new(None));
    let l = log.clone();
    let s = slot.clone();
    let sub = Subscriber::from_destination(Destination::Fns {
      next: Some(Box::new(move |v: i32| {
        l.borrow_mut().push(format!("enter {v}"));
        if v == 1 {
          s.borrow().as_ref().unwrap().next(2);
        }
        l.borrow_mut().push(format!("exit {v}"));
        Ok(())
      })),
      error: None,
      complete: None,
    });
    *slot.borrow_mut() = Some(sub.clone());

    sub.next(1);
    assert_eq!(*log.borrow(), vec!["enter 1", "exit 1", "enter 2", "exit 2"]);
    *slot.borrow_mut() = None;
  }
}
