use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RxError;
use crate::observable::{timer, Observable};
use crate::observer::Observer;
use crate::scheduler::SchedulerRef;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

/// Which edge of the silence window carries the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleEdge {
  /// Emit the value that opens the window; drop the rest of the window.
  Leading,
  /// Collect silently and emit the latest value when the window closes.
  Trailing,
}

struct ThrottleState<T> {
  open: bool,
  pending: Option<T>,
  window: Option<Subscription>,
}

struct ThrottleWindowEnd<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<ThrottleState<T>>>,
  edge: ThrottleEdge,
}

impl<T: 'static> ThrottleWindowEnd<T> {
  fn close(&mut self) {
    let (pending, window) = {
      let mut state = self.state.borrow_mut();
      if !state.open {
        return;
      }
      state.open = false;
      (state.pending.take(), state.window.take())
    };
    if let Some(window) = window {
      window.unsubscribe();
    }
    if self.edge == ThrottleEdge::Trailing {
      if let Some(value) = pending {
        self.dest.next(value);
      }
    }
  }
}

impl<T: 'static> Observer<u64> for ThrottleWindowEnd<T> {
  fn next(&mut self, _tick: u64) {
    self.close();
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.close();
  }
}

struct ThrottleObserver<T> {
  dest: Subscriber<T>,
  state: Rc<RefCell<ThrottleState<T>>>,
  duration: Duration,
  scheduler: SchedulerRef,
  edge: ThrottleEdge,
}

impl<T: 'static> ThrottleObserver<T> {
  fn open_window(&self) {
    self.state.borrow_mut().open = true;
    let observer =
      ThrottleWindowEnd { dest: self.dest.clone(), state: self.state.clone(), edge: self.edge };
    let up = Subscriber::from_observer(observer);
    self.state.borrow_mut().window = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    timer(self.duration, self.scheduler.clone()).subscribe_subscriber(up);
  }
}

impl<T: 'static> Observer<T> for ThrottleObserver<T> {
  fn next(&mut self, value: T) {
    let open = self.state.borrow().open;
    match self.edge {
      ThrottleEdge::Leading => {
        if !open {
          self.dest.next(value);
          self.open_window();
        }
      }
      ThrottleEdge::Trailing => {
        self.state.borrow_mut().pending = Some(value);
        if !open {
          self.open_window();
        }
      }
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let pending = self.state.borrow_mut().pending.take();
    if let Some(value) = pending {
      self.dest.next(value);
    }
    self.dest.complete();
  }
}

impl<T: 'static> Observable<T> {
  /// Rate-limits the source to at most one value per `duration`, on the
  /// chosen edge of each window.
  pub fn throttle_time(
    self,
    duration: Duration,
    scheduler: SchedulerRef,
    edge: ThrottleEdge,
  ) -> Observable<T> {
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(ThrottleState { open: false, pending: None, window: None }));
      let observer = ThrottleObserver {
        dest: sub.clone(),
        state,
        duration,
        scheduler: scheduler.clone(),
        edge,
      };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }
}
