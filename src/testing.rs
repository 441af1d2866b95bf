//! Deterministic marble-diagram testing over virtual time.
//!
//! ```
//! use rxflow::testing::TestScheduler;
//!
//! TestScheduler::run(|rt| {
//!   let source = rt.cold("-a-b-|", &[('a', 1), ('b', 2)]);
//!   let doubled = source.observable().map(|v| v * 2);
//!   rt.expect_observable(doubled).to_be("-a-b-|", &[('a', 2), ('b', 4)]);
//!   rt.expect_subscriptions(source.subscription_log()).to_be(&["^----!"]);
//! });
//! ```

mod marbles;
mod source;

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

pub use marbles::{parse_marbles, parse_subscription, SubscriptionWindow, TestNotification};
pub use source::{SubscriptionLog, TestSource};

use marbles::parse_unsubscribe_frame;
use crate::observable::Observable;
use crate::scheduler::{Scheduler, VirtualTimeScheduler, FRAME};
use crate::subscription::SubscriptionLike;

/// Default display text for `#` in expected diagrams.
const DEFAULT_ERROR: &str = "error";

type Check = Box<dyn FnOnce()>;

/// Marble test runtime: builds diagram-driven sources, records actual
/// notification sequences, and checks them against expected diagrams after
/// an implicit flush.
pub struct TestScheduler {
  scheduler: Rc<VirtualTimeScheduler>,
  checks: RefCell<Vec<Check>>,
}

impl TestScheduler {
  /// Runs `body` with a fresh runtime, then flushes virtual time and
  /// verifies every registered expectation.
  pub fn run<R>(body: impl FnOnce(&TestScheduler) -> R) -> R {
    let rt = TestScheduler {
      scheduler: Rc::new(VirtualTimeScheduler::new()),
      checks: RefCell::new(Vec::new()),
    };
    let out = body(&rt);
    rt.scheduler
      .flush()
      .unwrap_or_else(|e| panic!("virtual time flush failed: {e}"));
    for check in rt.checks.take() {
      check();
    }
    out
  }

  /// The underlying virtual clock, for operators that take a scheduler.
  pub fn scheduler(&self) -> Rc<VirtualTimeScheduler> {
    self.scheduler.clone()
  }

  /// Cold diagram-driven source; replays per subscriber.
  pub fn cold<T: Clone + 'static>(&self, diagram: &str, values: &[(char, T)]) -> TestSource<T> {
    TestSource::cold(self.scheduler.clone(), parse_marbles(diagram, values, DEFAULT_ERROR))
  }

  /// [`cold`](Self::cold) with every value character standing for itself.
  pub fn cold_chars(&self, diagram: &str) -> TestSource<char> {
    TestSource::cold(self.scheduler.clone(), self.char_events(diagram))
  }

  /// Hot diagram-driven source; plays once on the shared timeline.
  pub fn hot<T: Clone + 'static>(&self, diagram: &str, values: &[(char, T)]) -> TestSource<T> {
    TestSource::hot(self.scheduler.clone(), parse_marbles(diagram, values, DEFAULT_ERROR))
  }

  /// [`hot`](Self::hot) with every value character standing for itself.
  pub fn hot_chars(&self, diagram: &str) -> TestSource<char> {
    TestSource::hot(self.scheduler.clone(), self.char_events(diagram))
  }

  fn char_events(&self, diagram: &str) -> Vec<(u64, TestNotification<char>)> {
    let bindings: Vec<(char, char)> = diagram
      .chars()
      .filter(|c| !matches!(c, '-' | '|' | '#' | '(' | ')' | '^' | '!') && !c.is_whitespace())
      .map(|c| (c, c))
      .collect();
    parse_marbles(diagram, &bindings, DEFAULT_ERROR)
  }

  /// Subscribes now and records the materialized notification sequence
  /// for comparison after the flush.
  pub fn expect_observable<T>(&self, observable: Observable<T>) -> ExpectObservable<'_, T>
  where
    T: Clone + Debug + PartialEq + 'static,
  {
    self.expect_observable_inner(observable, None)
  }

  /// Like [`expect_observable`](Self::expect_observable), but unsubscribes
  /// at the `!` frame of `unsubscribe_diagram`.
  pub fn expect_observable_until<T>(
    &self,
    observable: Observable<T>,
    unsubscribe_diagram: &str,
  ) -> ExpectObservable<'_, T>
  where
    T: Clone + Debug + PartialEq + 'static,
  {
    self.expect_observable_inner(observable, Some(parse_unsubscribe_frame(unsubscribe_diagram)))
  }

  fn expect_observable_inner<T>(
    &self,
    observable: Observable<T>,
    unsubscribe_at: Option<u64>,
  ) -> ExpectObservable<'_, T>
  where
    T: Clone + Debug + PartialEq + 'static,
  {
    let actual: Rc<RefCell<Vec<(u64, TestNotification<T>)>>> = Rc::new(RefCell::new(Vec::new()));
    let scheduler = self.scheduler.clone();
    let frame = move || (scheduler.now().as_nanos() / FRAME.as_nanos()) as u64;

    let (next_sink, error_sink, complete_sink) = (actual.clone(), actual.clone(), actual.clone());
    let (f1, f2, f3) = (frame.clone(), frame.clone(), frame);
    let subscription = observable.subscribe_all(
      move |v| next_sink.borrow_mut().push((f1(), TestNotification::Next(v))),
      move |e| error_sink
        .borrow_mut()
        .push((f2(), TestNotification::Error(e.to_string()))),
      move || complete_sink.borrow_mut().push((f3(), TestNotification::Complete)),
    );

    if let Some(at) = unsubscribe_at {
      let target = subscription.clone();
      self.scheduler.schedule(
        FRAME * at as u32,
        Box::new(move |_| {
          target.unsubscribe();
          Ok(())
        }),
      );
    }

    ExpectObservable { rt: self, actual }
  }

  /// Compares a source's recorded subscription windows after the flush.
  pub fn expect_subscriptions(&self, log: SubscriptionLog) -> ExpectSubscriptions<'_> {
    ExpectSubscriptions { rt: self, log }
  }
}

pub struct ExpectObservable<'rt, T> {
  rt: &'rt TestScheduler,
  actual: Rc<RefCell<Vec<(u64, TestNotification<T>)>>>,
}

impl<T: Clone + Debug + PartialEq + 'static> ExpectObservable<'_, T> {
  /// Expects the recorded sequence to equal `diagram`, with `#` standing
  /// for an error whose display text is `"error"`.
  pub fn to_be(self, diagram: &str, values: &[(char, T)]) {
    self.to_be_with_error(diagram, values, DEFAULT_ERROR);
  }

  /// [`to_be`](Self::to_be) with an explicit expected error display text.
  pub fn to_be_with_error(self, diagram: &str, values: &[(char, T)], error_message: &str) {
    let expected = parse_marbles(diagram, values, error_message);
    let actual = self.actual;
    let diagram = diagram.to_string();
    self.rt.checks.borrow_mut().push(Box::new(move || {
      assert_eq!(
        *actual.borrow(),
        expected,
        "observable did not match diagram {diagram:?}"
      );
    }));
  }
}

pub struct ExpectSubscriptions<'rt> {
  rt: &'rt TestScheduler,
  log: SubscriptionLog,
}

impl ExpectSubscriptions<'_> {
  pub fn to_be(self, diagrams: &[&str]) {
    let expected: Vec<SubscriptionWindow> =
      diagrams.iter().map(|d| parse_subscription(d)).collect();
    let log = self.log;
    self.rt.checks.borrow_mut().push(Box::new(move || {
      assert_eq!(log.windows(), expected, "subscription windows did not match");
    }));
  }
}
