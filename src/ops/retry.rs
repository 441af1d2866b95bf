//! Resubscribe-on-error with a pluggable delay policy.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

/// How long to wait between a failure and the next attempt.
pub enum RetryDelay {
  /// Resubscribe immediately.
  None,
  /// Wait a fixed duration on the given scheduler.
  Fixed(Duration, SchedulerRef),
  /// Wait for the notifier's first emission. If the notifier completes
  /// without emitting, retrying stops and the pipeline completes; if it
  /// errors, that error propagates.
  Notifier(Observable<()>),
  /// Build a notifier per failure from the error and the attempt number.
  NotifierFn(Rc<dyn Fn(&RxError, usize) -> Observable<()>>),
}

/// Retry policy.
pub struct RetryConfig {
  /// Maximum number of resubscriptions; `None` retries forever.
  pub count: Option<usize>,
  pub delay: RetryDelay,
  /// Reset the attempt counter after any successful value.
  pub reset_on_success: bool,
}

impl RetryConfig {
  pub fn count(count: usize) -> Self {
    RetryConfig { count: Some(count), delay: RetryDelay::None, reset_on_success: false }
  }

  pub fn forever() -> Self {
    RetryConfig { count: None, delay: RetryDelay::None, reset_on_success: false }
  }

  pub fn with_delay(mut self, duration: Duration, scheduler: SchedulerRef) -> Self {
    self.delay = RetryDelay::Fixed(duration, scheduler);
    self
  }

  pub fn with_notifier(mut self, notifier: Observable<()>) -> Self {
    self.delay = RetryDelay::Notifier(notifier);
    self
  }

  pub fn with_notifier_fn(
    mut self,
    f: impl Fn(&RxError, usize) -> Observable<()> + 'static,
  ) -> Self {
    self.delay = RetryDelay::NotifierFn(Rc::new(f));
    self
  }

  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

struct RetryObserver<T> {
  source: Observable<T>,
  dest: Subscriber<T>,
  config: Rc<RetryConfig>,
  attempts: Rc<Cell<usize>>,
  slot: Rc<RefCell<Option<Subscription>>>,
}

fn subscribe_cycle<T: 'static>(
  source: Observable<T>,
  dest: Subscriber<T>,
  config: Rc<RetryConfig>,
  attempts: Rc<Cell<usize>>,
) {
  let slot = Rc::new(RefCell::new(None));
  let observer = RetryObserver {
    source: source.clone(),
    dest: dest.clone(),
    config,
    attempts,
    slot: slot.clone(),
  };
  let up = Subscriber::from_observer(observer);
  *slot.borrow_mut() = Some(up.subscription().clone());
  dest.subscription().add(up.subscription().clone());
  source.subscribe_subscriber(up);
}

/// Waits for a notifier before the next cycle.
struct NotifierObserver<T> {
  source: Observable<T>,
  dest: Subscriber<T>,
  config: Rc<RetryConfig>,
  attempts: Rc<Cell<usize>>,
  slot: Rc<RefCell<Option<Subscription>>>,
  fired: bool,
}

impl<T: 'static> Observer<()> for NotifierObserver<T> {
  fn next(&mut self, _value: ()) {
    if self.fired {
      return;
    }
    self.fired = true;
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    subscribe_cycle(
      self.source.clone(),
      self.dest.clone(),
      self.config.clone(),
      self.attempts.clone(),
    );
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // The delay policy giving up ends the whole pipeline gracefully.
    if !self.fired {
      self.dest.complete();
    }
  }
}

fn wait_for_notifier<T: 'static>(
  notifier: Observable<()>,
  source: Observable<T>,
  dest: Subscriber<T>,
  config: Rc<RetryConfig>,
  attempts: Rc<Cell<usize>>,
) {
  let slot = Rc::new(RefCell::new(None));
  let observer =
    NotifierObserver { source, dest: dest.clone(), config, attempts, slot: slot.clone(), fired: false };
  let up = Subscriber::from_observer(observer);
  *slot.borrow_mut() = Some(up.subscription().clone());
  dest.subscription().add(up.subscription().clone());
  notifier.subscribe_subscriber(up);
}

impl<T: 'static> Observer<T> for RetryObserver<T> {
  fn next(&mut self, value: T) {
    if self.config.reset_on_success {
      self.attempts.set(0);
    }
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    // Tear the failed cycle down before anything else so its finalizers
    // run ahead of the next cycle's first value.
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    let attempt = self.attempts.get() + 1;
    self.attempts.set(attempt);
    if let Some(max) = self.config.count {
      if attempt > max {
        self.dest.error(err);
        return;
      }
    }

    match &self.config.delay {
      RetryDelay::None => subscribe_cycle(
        self.source.clone(),
        self.dest.clone(),
        self.config.clone(),
        self.attempts.clone(),
      ),
      RetryDelay::Fixed(duration, scheduler) => {
        let source = self.source.clone();
        let dest = self.dest.clone();
        let config = self.config.clone();
        let attempts = self.attempts.clone();
        let action = scheduler.schedule(
          *duration,
          Box::new(move |_| {
            subscribe_cycle(source.clone(), dest.clone(), config.clone(), attempts.clone());
            Ok(())
          }),
        );
        self.dest.subscription().add(action);
      }
      RetryDelay::Notifier(notifier) => wait_for_notifier(
        notifier.clone(),
        self.source.clone(),
        self.dest.clone(),
        self.config.clone(),
        self.attempts.clone(),
      ),
      RetryDelay::NotifierFn(f) => {
        let notifier = f(&err, attempt);
        wait_for_notifier(
          notifier,
          self.source.clone(),
          self.dest.clone(),
          self.config.clone(),
          self.attempts.clone(),
        );
      }
    }
  }

  fn complete(&mut self) {
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Resubscribes to the source on error according to `config`.
  pub fn retry(self, config: RetryConfig) -> Observable<T> {
    let config = Rc::new(config);
    Observable::new(move |sub| {
      subscribe_cycle(self.clone(), sub.clone(), config.clone(), Rc::new(Cell::new(0)));
      TeardownLogic::None
    })
  }

  /// Unlimited retries gated by a per-failure notifier.
  pub fn retry_when(
    self,
    notifier: impl Fn(&RxError, usize) -> Observable<()> + 'static,
  ) -> Observable<T> {
    self.retry(RetryConfig::forever().with_notifier_fn(notifier))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::message;
  use crate::observable::{timer, Observable};
  use crate::scheduler::{Scheduler, VirtualTimeScheduler, FRAME};

  /// Emits 1 and 2, then fails, logging its lifecycle.
  fn flaky(log: Rc<RefCell<Vec<String>>>) -> Observable<i32> {
    Observable::create(move |sub| {
      log.borrow_mut().push("subscribed".into());
      let log = log.clone();
      sub.subscription().add_fn(move || log.borrow_mut().push("torn down".into()));
      sub.next(1);
      sub.next(2);
      Err(message("flaky failure"))
    })
  }

  #[test]
  fn exhausted_budget_propagates_the_error() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let errors = Rc::new(RefCell::new(Vec::new()));

    let sink = log.clone();
    let esink = errors.clone();
    flaky(log.clone()).retry(RetryConfig::count(2)).subscribe_err(
      move |v| sink.borrow_mut().push(format!("next {v}")),
      move |e| esink.borrow_mut().push(e.to_string()),
    );

    assert_eq!(*errors.borrow(), vec!["flaky failure"]);
    // 1 original + 2 retries.
    let subscribes = log.borrow().iter().filter(|l| *l == "subscribed").count();
    assert_eq!(subscribes, 3);
  }

  #[test]
  fn teardown_of_the_failed_cycle_precedes_the_next() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    flaky(log.clone())
      .retry(RetryConfig::count(1))
      .subscribe_err(move |v| sink.borrow_mut().push(format!("next {v}")), |_| {});

    let entries = log.borrow().clone();
    let second_subscribe = entries.iter().rposition(|l| l == "subscribed").unwrap();
    let first_teardown = entries.iter().position(|l| l == "torn down").unwrap();
    assert!(
      first_teardown < second_subscribe,
      "failed cycle must be torn down before the next starts: {entries:?}"
    );
  }

  #[test]
  fn fixed_delay_spaces_the_attempts() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    let times = Rc::new(RefCell::new(Vec::new()));

    let t = times.clone();
    let s = scheduler.clone();
    flaky(log.clone())
      .retry(RetryConfig::count(2).with_delay(FRAME * 4, scheduler.clone()))
      .subscribe_err(
        move |_| {
          let now = s.now();
          let mut t = t.borrow_mut();
          if t.last() != Some(&now) {
            t.push(now);
          }
        },
        |_| {},
      );

    scheduler.flush().unwrap();
    assert_eq!(*times.borrow(), vec![FRAME * 0, FRAME * 4, FRAME * 8]);
  }

  #[test]
  fn notifier_completion_ends_the_pipeline_gracefully() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    let done = Rc::new(std::cell::Cell::new(false));

    // First failure retries after 3 frames; the second notifier is empty,
    // which stops retrying and completes downstream.
    let sch = scheduler.clone();
    let d = done.clone();
    flaky(log.clone())
      .retry_when(move |_err, attempt| {
        if attempt == 1 {
          timer(FRAME * 3, sch.clone()).map_to(())
        } else {
          crate::observable::empty()
        }
      })
      .subscribe_complete(|_| {}, move || d.set(true));

    scheduler.flush().unwrap();
    assert!(done.get());
    let subscribes = log.borrow().iter().filter(|l| *l == "subscribed").count();
    assert_eq!(subscribes, 2);
  }
}
