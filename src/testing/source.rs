//! Diagram-driven sources that log their subscription windows.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use super::marbles::{SubscriptionWindow, TestNotification};
use crate::error::message;
use crate::observable::Observable;
use crate::scheduler::{Scheduler, VirtualTimeScheduler, FRAME};
use crate::subject::Subject;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

/// Shared record of every subscribe/unsubscribe window a source has seen.
#[derive(Clone, Default)]
pub struct SubscriptionLog {
  windows: Rc<RefCell<Vec<SubscriptionWindow>>>,
}

impl SubscriptionLog {
  fn begin(&self, frame: u64) -> usize {
    let mut windows = self.windows.borrow_mut();
    windows.push(SubscriptionWindow { subscribed: frame, unsubscribed: None });
    windows.len() - 1
  }

  fn end(&self, index: usize, frame: u64) {
    self.windows.borrow_mut()[index].unsubscribed = Some(frame);
  }

  pub fn windows(&self) -> Vec<SubscriptionWindow> {
    self.windows.borrow().clone()
  }
}

fn now_frame(scheduler: &Rc<VirtualTimeScheduler>) -> u64 {
  (scheduler.now().as_nanos() / FRAME.as_nanos()) as u64
}

fn deliver<T: Clone + 'static>(sub: &Subscriber<T>, notification: &TestNotification<T>) {
  match notification {
    TestNotification::Next(value) => sub.next(value.clone()),
    TestNotification::Error(text) => sub.error(message(text)),
    TestNotification::Complete => sub.complete(),
  }
}

/// An observable built from a marble diagram. Dereferences to the plain
/// [`Observable`] so the whole operator catalog applies directly.
pub struct TestSource<T> {
  observable: Observable<T>,
  log: SubscriptionLog,
}

impl<T> Deref for TestSource<T> {
  type Target = Observable<T>;

  fn deref(&self) -> &Observable<T> {
    &self.observable
  }
}

impl<T: Clone + 'static> TestSource<T> {
  /// Cold source: the diagram replays from frame zero for every
  /// subscriber independently.
  pub(super) fn cold(
    scheduler: Rc<VirtualTimeScheduler>,
    events: Vec<(u64, TestNotification<T>)>,
  ) -> Self {
    let log = SubscriptionLog::default();
    let producer_log = log.clone();
    let observable = Observable::new(move |sub: Subscriber<T>| {
      let index = producer_log.begin(now_frame(&scheduler));
      let teardown_log = producer_log.clone();
      let teardown_scheduler = scheduler.clone();
      sub
        .subscription()
        .add_fn(move || teardown_log.end(index, now_frame(&teardown_scheduler)));

      for (frame, notification) in events.clone() {
        let subscriber = sub.clone();
        let action = scheduler.schedule(
          FRAME * frame as u32,
          Box::new(move |_| {
            deliver(&subscriber, &notification);
            Ok(())
          }),
        );
        sub.subscription().add(action);
      }
      TeardownLogic::None
    });
    TestSource { observable, log }
  }

  /// Hot source: the diagram plays once on the shared timeline; each
  /// subscriber sees whatever happens while it is attached.
  pub(super) fn hot(
    scheduler: Rc<VirtualTimeScheduler>,
    events: Vec<(u64, TestNotification<T>)>,
  ) -> Self {
    let subject: Subject<T> = Subject::new();
    for (frame, notification) in events {
      let subject = subject.clone();
      scheduler.schedule(
        FRAME * frame as u32,
        Box::new(move |_| {
          match &notification {
            TestNotification::Next(value) => {
              let _ = subject.next(value.clone());
            }
            TestNotification::Error(text) => {
              let _ = subject.error(message(text));
            }
            TestNotification::Complete => {
              let _ = subject.complete();
            }
          }
          Ok(())
        }),
      );
    }

    let log = SubscriptionLog::default();
    let producer_log = log.clone();
    let inner = subject.observable();
    let observable = Observable::new(move |sub: Subscriber<T>| {
      let index = producer_log.begin(now_frame(&scheduler));
      let teardown_log = producer_log.clone();
      let teardown_scheduler = scheduler.clone();
      sub
        .subscription()
        .add_fn(move || teardown_log.end(index, now_frame(&teardown_scheduler)));
      inner.chain(sub.subscription(), sub.clone());
      TeardownLogic::None
    });
    TestSource { observable, log }
  }

  pub fn subscription_log(&self) -> SubscriptionLog {
    self.log.clone()
  }

  pub fn observable(&self) -> Observable<T> {
    self.observable.clone()
  }
}
