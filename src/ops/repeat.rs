use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{empty, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct RepeatObserver<T> {
  source: Observable<T>,
  dest: Subscriber<T>,
  count: usize,
  cycles: Rc<Cell<usize>>,
  slot: Rc<RefCell<Option<Subscription>>>,
}

fn subscribe_cycle<T: 'static>(
  source: Observable<T>,
  dest: Subscriber<T>,
  count: usize,
  cycles: Rc<Cell<usize>>,
) {
  let slot = Rc::new(RefCell::new(None));
  let observer = RepeatObserver {
    source: source.clone(),
    dest: dest.clone(),
    count,
    cycles,
    slot: slot.clone(),
  };
  let up = Subscriber::from_observer(observer);
  *slot.borrow_mut() = Some(up.subscription().clone());
  dest.subscription().add(up.subscription().clone());
  source.subscribe_subscriber(up);
}

impl<T: 'static> Observer<T> for RepeatObserver<T> {
  fn next(&mut self, value: T) {
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // The finished cycle is finalized before the next one starts.
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    if self.cycles.get() >= self.count {
      self.dest.complete();
      return;
    }
    self.cycles.set(self.cycles.get() + 1);
    subscribe_cycle(self.source.clone(), self.dest.clone(), self.count, self.cycles.clone());
  }
}

impl<T: 'static> Observable<T> {
  /// Replays the source `count` times in total, resubscribing after each
  /// completion. `repeat(0)` is [`empty`]; errors are not repeated.
  pub fn repeat(self, count: usize) -> Observable<T> {
    if count == 0 {
      return empty();
    }
    Observable::new(move |sub| {
      subscribe_cycle(self.clone(), sub.clone(), count, Rc::new(Cell::new(1)));
      TeardownLogic::None
    })
  }
}
