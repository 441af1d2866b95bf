//! Multicast with an explicit connection step.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subject::SubjectLike;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

struct ConnState<T> {
  subject: Option<Rc<dyn SubjectLike<T>>>,
  connection: Option<Subscription>,
  ref_count: usize,
}

/// Feeds source notifications into the cycle's subject.
struct SubjectObserver<T>(Rc<dyn SubjectLike<T>>);

impl<T: 'static> Observer<T> for SubjectObserver<T> {
  fn next(&mut self, value: T) {
    self.0.push_next(value);
  }

  fn error(&mut self, err: RxError) {
    self.0.push_error(err);
  }

  fn complete(&mut self) {
    self.0.push_complete();
  }
}

/// An observable that shares one underlying subscription to its source
/// through a subject, but only produces once [`connect`](Self::connect) is
/// called. Subscribing beforehand just parks the subscriber on the
/// subject.
pub struct ConnectableObservable<T> {
  source: Observable<T>,
  subject_factory: Rc<dyn Fn() -> Rc<dyn SubjectLike<T>>>,
  state: Rc<RefCell<ConnState<T>>>,
}

impl<T> Clone for ConnectableObservable<T> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      subject_factory: self.subject_factory.clone(),
      state: self.state.clone(),
    }
  }
}

impl<T: 'static> ConnectableObservable<T> {
  pub fn new<S: SubjectLike<T>>(
    source: Observable<T>,
    subject_factory: impl Fn() -> S + 'static,
  ) -> Self {
    ConnectableObservable {
      source,
      subject_factory: Rc::new(move || Rc::new(subject_factory()) as Rc<dyn SubjectLike<T>>),
      state: Rc::new(RefCell::new(ConnState { subject: None, connection: None, ref_count: 0 })),
    }
  }

  /// The subject for the current connection cycle; a fresh one is created
  /// after a finished cycle tore the old one down.
  fn subject(&self) -> Rc<dyn SubjectLike<T>> {
    let mut state = self.state.borrow_mut();
    state.subject.get_or_insert_with(|| (self.subject_factory)()).clone()
  }

  /// The shared output side. Subscribers receive nothing until the
  /// connectable is connected.
  pub fn observable(&self) -> Observable<T> {
    let this = self.clone();
    Observable::new(move |sub| {
      this.subject().attach_subscriber(sub);
      TeardownLogic::None
    })
  }

  /// Starts (or joins) the single subscription to the source. Returns the
  /// connection; unsubscribing it disconnects every subscriber's feed and
  /// ends the cycle.
  pub fn connect(&self) -> Subscription {
    if let Some(conn) = self.state.borrow().connection.clone() {
      if !conn.is_closed() {
        return conn;
      }
    }
    let subject = self.subject();
    let connection = self.source.subscribe_observer(SubjectObserver(subject));
    self.state.borrow_mut().connection = Some(connection.clone());

    // When the connection dies the cycle is over; the next connect starts
    // from a fresh subject.
    let state = Rc::downgrade(&self.state);
    connection.add_fn(move || {
      if let Some(state) = state.upgrade() {
        let mut state = state.borrow_mut();
        state.connection = None;
        state.subject = None;
      }
    });
    connection
  }

  /// Automatic connection management: connects when the subscriber count
  /// goes from zero to one, disconnects exactly when it returns to zero.
  pub fn ref_count(&self) -> Observable<T> {
    let this = self.clone();
    Observable::new(move |sub| {
      this.subject().attach_subscriber(sub);
      let first = {
        let mut state = this.state.borrow_mut();
        state.ref_count += 1;
        state.ref_count == 1
      };
      if first {
        this.connect();
      }

      let this = this.clone();
      TeardownLogic::from_fn(move || {
        let connection = {
          let mut state = this.state.borrow_mut();
          state.ref_count = state.ref_count.saturating_sub(1);
          if state.ref_count == 0 {
            state.connection.take()
          } else {
            None
          }
        };
        if let Some(connection) = connection {
          connection.unsubscribe();
        }
      })
    })
  }
}
