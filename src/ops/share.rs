//! Multicast adapters over [`ConnectableObservable`].

use crate::connectable::ConnectableObservable;
use crate::observable::Observable;
use crate::subject::{BehaviorSubject, ReplaySubject, Subject, SubjectLike};

impl<T: Clone + 'static> Observable<T> {
  /// Multicasts through a fresh subject per connection cycle.
  pub fn multicast<S>(self, subject_factory: impl Fn() -> S + 'static) -> ConnectableObservable<T>
  where
    S: SubjectLike<T> + 'static,
  {
    ConnectableObservable::new(self, subject_factory)
  }

  /// Multicast through a plain [`Subject`].
  pub fn publish(self) -> ConnectableObservable<T> {
    self.multicast(Subject::new)
  }

  /// Multicast through a [`BehaviorSubject`] seeded with `initial`, so
  /// late consumers immediately see the latest value.
  pub fn publish_behavior(self, initial: T) -> ConnectableObservable<T> {
    self.multicast(move || BehaviorSubject::new(initial.clone()))
  }

  /// Multicast through a [`ReplaySubject`] retaining the last `count`
  /// values for late consumers.
  pub fn publish_replay(self, count: usize) -> ConnectableObservable<T> {
    self.multicast(move || ReplaySubject::new(count))
  }

  /// [`publish`](Self::publish) plus automatic connection management:
  /// the source is subscribed while at least one consumer is attached.
  pub fn share(self) -> Observable<T> {
    self.publish().ref_count()
  }
}
