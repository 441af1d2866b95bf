use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::TeardownLogic;

struct ZipState<T, U> {
  left: VecDeque<T>,
  right: VecDeque<U>,
  left_done: bool,
  right_done: bool,
}

impl<T, U> ZipState<T, U> {
  /// A side that is done with an empty queue can never pair again.
  fn exhausted(&self) -> bool {
    (self.left_done && self.left.is_empty()) || (self.right_done && self.right.is_empty())
  }
}

struct ZipLeft<T, U> {
  dest: Subscriber<(T, U)>,
  state: Rc<RefCell<ZipState<T, U>>>,
}

struct ZipRight<T, U> {
  dest: Subscriber<(T, U)>,
  state: Rc<RefCell<ZipState<T, U>>>,
}

impl<T: 'static, U: 'static> Observer<T> for ZipLeft<T, U> {
  fn next(&mut self, value: T) {
    let (pair, exhausted) = {
      let mut state = self.state.borrow_mut();
      let pair = match state.right.pop_front() {
        Some(r) => Some((value, r)),
        None => {
          state.left.push_back(value);
          None
        }
      };
      (pair, state.exhausted())
    };
    if let Some(pair) = pair {
      self.dest.next(pair);
    }
    if exhausted {
      self.dest.complete();
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let exhausted = {
      let mut state = self.state.borrow_mut();
      state.left_done = true;
      state.exhausted()
    };
    if exhausted {
      self.dest.complete();
    }
  }
}

impl<T: 'static, U: 'static> Observer<U> for ZipRight<T, U> {
  fn next(&mut self, value: U) {
    let (pair, exhausted) = {
      let mut state = self.state.borrow_mut();
      let pair = match state.left.pop_front() {
        Some(l) => Some((l, value)),
        None => {
          state.right.push_back(value);
          None
        }
      };
      (pair, state.exhausted())
    };
    if let Some(pair) = pair {
      self.dest.next(pair);
    }
    if exhausted {
      self.dest.complete();
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let exhausted = {
      let mut state = self.state.borrow_mut();
      state.right_done = true;
      state.exhausted()
    };
    if exhausted {
      self.dest.complete();
    }
  }
}

impl<T: 'static> Observable<T> {
  /// Pairs the nth value of each input, buffering the faster side.
  /// Completes as soon as either side can no longer contribute a pair.
  pub fn zip<U: 'static>(self, other: Observable<U>) -> Observable<(T, U)> {
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(ZipState {
        left: VecDeque::new(),
        right: VecDeque::new(),
        left_done: false,
        right_done: false,
      }));
      self.chain(sub.subscription(), ZipLeft { dest: sub.clone(), state: state.clone() });
      if !sub.is_closed() {
        other.chain(sub.subscription(), ZipRight { dest: sub.clone(), state });
      }
      TeardownLogic::None
    })
  }
}
