use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct RaceObserver<T> {
  dest: Subscriber<T>,
  decided: Rc<Cell<bool>>,
  won: bool,
  rival: Rc<RefCell<Option<Subscription>>>,
}

impl<T: 'static> RaceObserver<T> {
  /// First notification from either side claims the race; the loser is
  /// unsubscribed on the spot.
  fn claim(&mut self) -> bool {
    if self.won {
      return true;
    }
    if self.decided.get() {
      return false;
    }
    self.decided.set(true);
    self.won = true;
    if let Some(rival) = self.rival.borrow_mut().take() {
      rival.unsubscribe();
    }
    true
  }
}

impl<T: 'static> Observer<T> for RaceObserver<T> {
  fn next(&mut self, value: T) {
    if self.claim() {
      self.dest.next(value);
    }
  }

  fn error(&mut self, err: RxError) {
    if self.claim() {
      self.dest.error(err);
    }
  }

  fn complete(&mut self) {
    if self.claim() {
      self.dest.complete();
    }
  }
}

impl<T: 'static> Observable<T> {
  /// Mirrors whichever input notifies first; the other is dropped.
  pub fn race(self, other: Observable<T>) -> Observable<T> {
    Observable::new(move |sub| {
      let decided = Rc::new(Cell::new(false));
      let left_slot = Rc::new(RefCell::new(None));
      let right_slot = Rc::new(RefCell::new(None));

      let left = Subscriber::from_observer(RaceObserver {
        dest: sub.clone(),
        decided: decided.clone(),
        won: false,
        rival: right_slot.clone(),
      });
      *left_slot.borrow_mut() = Some(left.subscription().clone());
      sub.subscription().add(left.subscription().clone());
      self.subscribe_subscriber(left);

      // A synchronous winner settles the race before the second entrant
      // would even subscribe.
      if !decided.get() && !sub.is_closed() {
        let right = Subscriber::from_observer(RaceObserver {
          dest: sub.clone(),
          decided: decided.clone(),
          won: false,
          rival: left_slot,
        });
        *right_slot.borrow_mut() = Some(right.subscription().clone());
        sub.subscription().add(right.subscription().clone());
        other.subscribe_subscriber(right);
      }
      TeardownLogic::None
    })
  }
}
