//! Synchronous state access for binding layers.
//!
//! A binding layer (a UI framework, a render loop) needs three things from
//! a stream: a subscription, the latest value without waiting for the next
//! emission, and a way to know how many consumers are attached. This module
//! provides the latter two over a shared stream; subscription itself is the
//! ordinary [`Observable`] contract.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

/// Snapshot of a stream's progress, readable at any moment.
#[derive(Clone, Debug)]
pub enum StateValue<T> {
  /// The most recent value.
  Ready(T),
  /// Nothing has been produced yet in the current connection cycle.
  Pending,
  /// The stream failed; the error is retained for synchronous readers.
  Errored(RxError),
}

impl<T> StateValue<T> {
  pub fn is_ready(&self) -> bool {
    matches!(self, StateValue::Ready(_))
  }

  pub fn is_pending(&self) -> bool {
    matches!(self, StateValue::Pending)
  }
}

struct MirrorObserver<T> {
  dest: Subscriber<T>,
  value: Rc<RefCell<StateValue<T>>>,
}

impl<T: Clone + 'static> Observer<T> for MirrorObserver<T> {
  fn next(&mut self, value: T) {
    *self.value.borrow_mut() = StateValue::Ready(value.clone());
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    *self.value.borrow_mut() = StateValue::Errored(err.clone());
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // The last value stays readable after completion.
    self.dest.complete();
  }
}

/// A ref-counted shared stream with a synchronous accessor for its latest
/// state. The underlying source is subscribed while at least one consumer
/// is attached, exactly like [`Observable::share`].
#[derive(Clone)]
pub struct StateObservable<T> {
  shared: Observable<T>,
  value: Rc<RefCell<StateValue<T>>>,
  consumers: Rc<Cell<usize>>,
}

impl<T: Clone + 'static> StateObservable<T> {
  pub fn new(source: Observable<T>) -> Self {
    let value = Rc::new(RefCell::new(StateValue::Pending));
    let cell = value.clone();
    let mirrored = Observable::new(move |sub| {
      // A fresh connection cycle starts over from Pending.
      *cell.borrow_mut() = StateValue::Pending;
      source.chain(sub.subscription(), MirrorObserver { dest: sub.clone(), value: cell.clone() });
      TeardownLogic::None
    });
    StateObservable { shared: mirrored.share(), value, consumers: Rc::new(Cell::new(0)) }
  }

  /// Latest state without subscribing. `Pending` until the current
  /// connection cycle produces a value.
  pub fn get_value(&self) -> StateValue<T> {
    self.value.borrow().clone()
  }

  /// Number of currently attached consumers.
  pub fn ref_count(&self) -> usize {
    self.consumers.get()
  }

  /// The shared stream. Each subscription counts toward
  /// [`ref_count`](Self::ref_count) until it unsubscribes.
  pub fn observable(&self) -> Observable<T> {
    let shared = self.shared.clone();
    let consumers = self.consumers.clone();
    Observable::new(move |sub| {
      consumers.set(consumers.get() + 1);
      let consumers = consumers.clone();
      sub
        .subscription()
        .add_fn(move || consumers.set(consumers.get().saturating_sub(1)));
      shared.chain(sub.subscription(), sub.clone());
      TeardownLogic::None
    })
  }
}
