//! Creation functions for synchronous sources.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::thread::LocalKey;

use crate::error::RxError;
use crate::observable::Observable;
use crate::subscription::TeardownLogic;

/// Emits a single value and completes.
pub fn of<T: Clone + 'static>(value: T) -> Observable<T> {
  Observable::new(move |sub| {
    sub.next(value.clone());
    sub.complete();
    TeardownLogic::None
  })
}

/// Emits the value produced by `f` and completes.
pub fn of_fn<T: 'static>(f: impl Fn() -> T + 'static) -> Observable<T> {
  Observable::new(move |sub| {
    sub.next(f());
    sub.complete();
    TeardownLogic::None
  })
}

/// Emits the inner value when `Some`, otherwise just completes.
pub fn of_option<T: Clone + 'static>(value: Option<T>) -> Observable<T> {
  Observable::new(move |sub| {
    if let Some(v) = value.clone() {
      sub.next(v);
    }
    sub.complete();
    TeardownLogic::None
  })
}

/// Emits every item of the iterator, then completes. The producer checks
/// for closure between items so `take`-style downstream cancellation stops
/// a long iteration promptly.
pub fn from_iter<I>(iter: I) -> Observable<I::Item>
where
  I: IntoIterator + Clone + 'static,
  I::Item: 'static,
{
  Observable::new(move |sub| {
    for value in iter.clone() {
      if sub.is_closed() {
        break;
      }
      sub.next(value);
    }
    sub.complete();
    TeardownLogic::None
  })
}

/// Emits `count` consecutive integers starting at `start`.
pub fn range(start: i64, count: usize) -> Observable<i64> {
  from_iter((0..count as i64).map(move |i| start + i))
}

/// Drives an explicit state machine: seed, continue-condition, successor,
/// and a projection from state to emitted value.
pub fn generate<S, T>(
  initial: S,
  condition: impl Fn(&S) -> bool + 'static,
  iterate: impl Fn(S) -> S + 'static,
  result: impl Fn(&S) -> T + 'static,
) -> Observable<T>
where
  S: Clone + 'static,
  T: 'static,
{
  Observable::new(move |sub| {
    let mut state = initial.clone();
    while condition(&state) {
      if sub.is_closed() {
        break;
      }
      sub.next(result(&state));
      state = iterate(state);
    }
    sub.complete();
    TeardownLogic::None
  })
}

/// Calls the factory at subscribe time and subscribes to its result, so
/// side effects in the factory are deferred per subscriber.
pub fn defer<T: 'static>(factory: impl Fn() -> Observable<T> + 'static) -> Observable<T> {
  Observable::new(move |sub| {
    factory().subscribe_subscriber(sub);
    TeardownLogic::None
  })
}

/// Errors immediately with a clone of `err`.
pub fn throw_error<T: 'static>(err: RxError) -> Observable<T> {
  Observable::create(move |_sub| Err(err.clone()))
}

thread_local! {
  static EMPTY: RefCell<HashMap<TypeId, Box<dyn Any>>> = RefCell::new(HashMap::new());
  static NEVER: RefCell<HashMap<TypeId, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

fn cached<T: 'static>(
  cache: &'static LocalKey<RefCell<HashMap<TypeId, Box<dyn Any>>>>,
  make: fn() -> Observable<T>,
) -> Observable<T> {
  cache.with(|c| {
    let mut map = c.borrow_mut();
    let entry = map.entry(TypeId::of::<T>()).or_insert_with(|| Box::new(make()));
    entry
      .downcast_ref::<Observable<T>>()
      .expect("cache entry keyed by its own TypeId")
      .clone()
  })
}

/// Completes immediately without emitting. Repeated calls on one thread
/// return the same instance, so `empty::<T>().ptr_eq(&empty())` holds.
pub fn empty<T: 'static>() -> Observable<T> {
  cached(&EMPTY, || {
    Observable::new(|sub| {
      sub.complete();
      TeardownLogic::None
    })
  })
}

/// Never emits and never terminates. Shares one instance per type per
/// thread, like [`empty`].
pub fn never<T: 'static>() -> Observable<T> {
  cached(&NEVER, || Observable::new(|_sub| TeardownLogic::None))
}
