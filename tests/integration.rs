//! End-to-end behavior of the runtime: subscription lifecycle, multicast,
//! scheduling discipline, and the marble scenarios the operator contracts
//! promise.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use once_cell::sync::Lazy;
use rxflow::ops::RetryConfig;
use rxflow::prelude::*;
use rxflow::testing::TestScheduler;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
});

fn setup() {
  Lazy::force(&TRACING);
}

#[test]
fn unsubscribe_is_idempotent() {
  setup();
  let torn_down = Rc::new(Cell::new(0));

  let counter = torn_down.clone();
  let source: Observable<i32> = Observable::new(move |sub| {
    let counter = counter.clone();
    sub.subscription().add_fn(move || counter.set(counter.get() + 1));
    TeardownLogic::None
  });

  let subscription = source.subscribe(|_| {});
  subscription.unsubscribe();
  subscription.unsubscribe();

  assert!(subscription.is_closed());
  assert_eq!(torn_down.get(), 1, "teardown must run exactly once");
}

#[test]
fn at_most_one_terminal_notification_reaches_the_consumer() {
  setup();
  let log = Rc::new(RefCell::new(Vec::new()));

  let sink = log.clone();
  let source = Observable::new(move |sub: Subscriber<i32>| {
    sub.next(1);
    sub.complete();
    // A misbehaving producer keeps pushing past the terminal.
    sub.next(2);
    sub.error(message("late"));
    sub.complete();
    TeardownLogic::None
  });

  let (l1, l2) = (log.clone(), log.clone());
  source.subscribe_all(
    move |v| sink.borrow_mut().push(format!("next {v}")),
    move |e| l1.borrow_mut().push(format!("error {e}")),
    move || l2.borrow_mut().push("complete".into()),
  );

  assert_eq!(*log.borrow(), vec!["next 1", "complete"]);
}

#[test]
fn cold_observables_reexecute_per_subscription() {
  setup();
  let runs = Rc::new(Cell::new(0));

  let counter = runs.clone();
  let source = defer(move || {
    counter.set(counter.get() + 1);
    of(1)
  });

  let seen = Rc::new(RefCell::new(Vec::new()));
  let (s1, s2) = (seen.clone(), seen.clone());
  source.subscribe(move |v| s1.borrow_mut().push(v));
  source.subscribe(move |v| s2.borrow_mut().push(v));

  assert_eq!(runs.get(), 2);
  assert_eq!(*seen.borrow(), vec![1, 1]);
}

#[test]
fn refcounted_multicast_connects_once_per_cycle() {
  setup();
  let connects = Rc::new(Cell::new(0));
  let live: Subject<i32> = Subject::new();

  let counter = connects.clone();
  let feed = live.clone();
  let shared = defer(move || {
    counter.set(counter.get() + 1);
    feed.observable()
  })
  .share();

  // Three consumers added while the connection stays live share one
  // producer run.
  let seen = Rc::new(Cell::new(0));
  let (s1, s2, s3) = (seen.clone(), seen.clone(), seen.clone());
  let a = shared.subscribe(move |_| s1.set(s1.get() + 1));
  let b = shared.subscribe(move |_| s2.set(s2.get() + 1));
  let c = shared.subscribe(move |_| s3.set(s3.get() + 1));
  live.next(7).unwrap();

  assert_eq!(connects.get(), 1, "one producer run for three consumers");
  assert_eq!(seen.get(), 3);

  // Dropping every consumer ends the cycle; the next subscriber starts a
  // fresh one.
  a.unsubscribe();
  b.unsubscribe();
  c.unsubscribe();
  let d = shared.subscribe(|_| {});
  assert_eq!(connects.get(), 2, "a new connect cycle runs the producer again");
  d.unsubscribe();
}

#[test]
fn a_bodyless_observable_behaves_as_never() {
  setup();
  TestScheduler::run(|rt| {
    let silent: Observable<char> = Observable::new(|_| TeardownLogic::None);
    rt.expect_observable(silent).to_be("-", &[]);
    rt.expect_observable(never::<char>()).to_be("-", &[]);
  });
}

#[test]
fn empty_is_a_singleton_that_completes_synchronously() {
  setup();
  assert!(empty::<i32>().ptr_eq(&empty::<i32>()));

  let completed = Rc::new(Cell::new(false));
  let flag = completed.clone();
  empty::<i32>().subscribe_complete(|_| {}, move || flag.set(true));
  assert!(completed.get(), "completion must fire before subscribe returns");
}

#[test]
fn audit_emits_the_latest_value_per_window() {
  setup();
  TestScheduler::run(|rt| {
    let source = rt.cold_chars("-a-xy-----b--x--cxyz-|");
    let window = rt.cold_chars("----i");
    let window = window.observable();
    let audited = source.observable().audit(move |_| window.clone());
    rt.expect_observable(audited)
      .to_be("-----y--------x-----z|", &[('y', 'y'), ('x', 'x'), ('z', 'z')]);
  });
}

#[test]
fn unbounded_retry_with_numeric_delay_truncated_by_unsubscribe() {
  setup();
  TestScheduler::run(|rt| {
    let source = rt.cold_chars("---a---b---#");
    let retried = source
      .observable()
      .retry(RetryConfig::forever().with_delay(FRAME * 4, rt.scheduler()));
    let unsubscribe = format!("{}!", "-".repeat(50));
    rt.expect_observable_until(retried, &unsubscribe).to_be(
      "---a---b----------a---b----------a---b----------a--",
      &[('a', 'a'), ('b', 'b')],
    );
  });
}

#[test]
fn equal_due_times_flush_in_insertion_order() {
  setup();
  let scheduler = virtual_time();
  let log = Rc::new(RefCell::new(Vec::new()));

  for name in ["first", "second", "third"] {
    let log = log.clone();
    scheduler.schedule_fn(FRAME * 5, move |_| {
      log.borrow_mut().push(name);
    });
  }

  scheduler.flush().unwrap();
  assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn repeat_and_retry_finalize_each_cycle_before_the_next() {
  setup();
  let log = Rc::new(RefCell::new(Vec::new()));

  let producer_log = log.clone();
  let completing = Observable::create(move |sub| {
    let log = producer_log.clone();
    sub.subscription().add_fn(move || log.borrow_mut().push("down"));
    sub.next("v");
    sub.complete();
    Ok(TeardownLogic::None)
  });
  let sink = log.clone();
  completing.repeat(2).subscribe(move |v| sink.borrow_mut().push(v));
  assert_eq!(*log.borrow(), vec!["v", "down", "v", "down"]);

  let log = Rc::new(RefCell::new(Vec::new()));
  let producer_log = log.clone();
  let failing = Observable::create(move |sub| {
    let log = producer_log.clone();
    sub.subscription().add_fn(move || log.borrow_mut().push("down"));
    sub.next("v");
    Err(message("nope"))
  });
  let sink = log.clone();
  failing
    .retry(RetryConfig::count(1))
    .subscribe_err(move |v| sink.borrow_mut().push(v), |_| {});
  assert_eq!(*log.borrow(), vec!["v", "down", "v", "down"]);
}

#[test]
fn timeout_and_source_race_cleanly_both_ways() {
  setup();
  use rxflow::ops::TimeoutConfig;

  // Source first: no timeout error may surface.
  TestScheduler::run(|rt| {
    let source = rt.cold_chars("--a------|");
    let guarded = source
      .observable()
      .timeout(TimeoutConfig::first(FRAME * 5, rt.scheduler()));
    rt.expect_observable(guarded).to_be("--a------|", &[('a', 'a')]);
  });

  // Deadline first: the source is dropped at the deadline frame.
  TestScheduler::run(|rt| {
    let source = rt.cold_chars("--------a|");
    let guarded = source
      .observable()
      .timeout(TimeoutConfig::first(FRAME * 5, rt.scheduler()));
    rt.expect_observable(guarded).to_be_with_error(
      "-----#",
      &[],
      "timeout: 0 value(s) seen before the deadline",
    );
    rt.expect_subscriptions(source.subscription_log()).to_be(&["^----!"]);
  });
}

#[test]
fn switch_map_cuts_the_previous_inner_at_the_next_outer_value() {
  setup();
  TestScheduler::run(|rt| {
    let inner = rt.cold("x-y-z|", &[('x', 1), ('y', 2), ('z', 3)]);
    let inner_obs = inner.observable();
    let outer = rt.cold_chars("-a--b----|");
    let switched = outer.observable().switch_map(move |_| inner_obs.clone());
    rt.expect_observable(switched)
      .to_be("-x-yx-y-z|", &[('x', 1), ('y', 2), ('z', 3)]);
    rt.expect_subscriptions(inner.subscription_log()).to_be(&["-^--!", "----^----!"]);
  });
}

#[test]
fn concat_map_runs_inners_strictly_one_at_a_time() {
  setup();
  TestScheduler::run(|rt| {
    let inner = rt.cold_chars("x--|");
    let inner_obs = inner.observable();
    let outer = rt.cold_chars("ab------|");
    let sequential = outer.observable().concat_map(move |_| inner_obs.clone());
    rt.expect_observable(sequential).to_be("x--x----|", &[('x', 'x')]);
    rt.expect_subscriptions(inner.subscription_log()).to_be(&["^--!", "---^--!"]);
  });
}

#[test]
fn pipe_with_no_operators_is_the_identity() {
  setup();
  let source = of(5);
  let same = pipe!(source.clone());
  assert!(source.ptr_eq(&same));

  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink = seen.clone();
  let doubled_evens = pipe!(from_iter(1..=4) => filter(|v| v % 2 == 0), map(|v| v * 10));
  doubled_evens.subscribe(move |v| sink.borrow_mut().push(v));
  assert_eq!(*seen.borrow(), vec![20, 40]);
}

#[test]
fn subject_misuse_after_unsubscribe_is_loud_but_late_values_are_quiet() {
  setup();
  let subject: Subject<i32> = Subject::new();
  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink = seen.clone();
  subject.observable().subscribe(move |v| sink.borrow_mut().push(v));

  subject.next(1).unwrap();
  subject.complete().unwrap();
  // Post-terminal pushes are swallowed, not errors.
  subject.next(2).unwrap();

  subject.unsubscribe();
  assert!(subject.next(3).is_err(), "a dead subject must refuse its own API");
  assert_eq!(*seen.borrow(), vec![1]);
}
