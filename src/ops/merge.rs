//! The merge/concat flattening family.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{from_iter, shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{SubscriptionLike, TeardownLogic};

struct MergeState<R> {
  active: usize,
  pending: VecDeque<Observable<R>>,
  outer_done: bool,
}

impl<R> MergeState<R> {
  fn new() -> Rc<RefCell<Self>> {
    Rc::new(RefCell::new(MergeState { active: 0, pending: VecDeque::new(), outer_done: false }))
  }
}

struct InnerObserver<R> {
  dest: Subscriber<R>,
  state: Rc<RefCell<MergeState<R>>>,
  slot: Rc<RefCell<Option<crate::subscription::Subscription>>>,
}

impl<R: 'static> Observer<R> for InnerObserver<R> {
  fn next(&mut self, value: R) {
    self.dest.next(value);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // Finalize this inner's resources strictly before the next queued
    // inner starts.
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    let (next_inner, all_done) = {
      let mut state = self.state.borrow_mut();
      state.active -= 1;
      let next_inner = state.pending.pop_front();
      let all_done = next_inner.is_none() && state.active == 0 && state.outer_done;
      (next_inner, all_done)
    };
    if let Some(inner) = next_inner {
      subscribe_inner(inner, &self.dest, &self.state);
    } else if all_done {
      self.dest.complete();
    }
  }
}

fn subscribe_inner<R: 'static>(
  inner: Observable<R>,
  dest: &Subscriber<R>,
  state: &Rc<RefCell<MergeState<R>>>,
) {
  state.borrow_mut().active += 1;
  let slot = Rc::new(RefCell::new(None));
  let observer = InnerObserver { dest: dest.clone(), state: state.clone(), slot: slot.clone() };
  let up = Subscriber::from_observer(observer);
  // Fill the slot before producing so a synchronously completing inner can
  // still tear itself down from inside its own notification.
  *slot.borrow_mut() = Some(up.subscription().clone());
  dest.subscription().add(up.subscription().clone());
  inner.subscribe_subscriber(up);
}

struct MergeMapObserver<R, F> {
  dest: Subscriber<R>,
  project: Rc<RefCell<F>>,
  state: Rc<RefCell<MergeState<R>>>,
  concurrent: usize,
}

impl<T, R: 'static, F: FnMut(T) -> Observable<R>> Observer<T> for MergeMapObserver<R, F> {
  fn next(&mut self, value: T) {
    let inner = (self.project.borrow_mut())(value);
    let overflow = {
      let mut state = self.state.borrow_mut();
      if state.active >= self.concurrent {
        state.pending.push_back(inner.clone());
        true
      } else {
        false
      }
    };
    if !overflow {
      subscribe_inner(inner, &self.dest, &self.state);
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.borrow_mut();
      state.outer_done = true;
      state.active == 0 && state.pending.is_empty()
    };
    if done {
      self.dest.complete();
    }
  }
}

impl<T: 'static> Observable<T> {
  /// Projects each value to an inner stream and merges up to `concurrent`
  /// inner streams at once; further inners queue in FIFO order.
  /// `usize::MAX` means no limit.
  pub fn merge_map<R, F>(self, project: F, concurrent: usize) -> Observable<R>
  where
    R: 'static,
    F: FnMut(T) -> Observable<R> + 'static,
  {
    let concurrent = concurrent.max(1);
    let project = shared_fn(project);
    Observable::new(move |sub| {
      let state = MergeState::new();
      let observer = MergeMapObserver {
        dest: sub.clone(),
        project: project.clone(),
        state,
        concurrent,
      };
      self.chain(sub.subscription(), observer);
      TeardownLogic::None
    })
  }

  /// One-at-a-time flattening: each inner runs to completion (and is torn
  /// down) before the next starts.
  pub fn concat_map<R, F>(self, project: F) -> Observable<R>
  where
    R: 'static,
    F: FnMut(T) -> Observable<R> + 'static,
  {
    self.merge_map(project, 1)
  }

  /// Interleaves this stream with `other`.
  pub fn merge(self, other: Observable<T>) -> Observable<T> {
    from_iter(vec![self, other]).merge_all(usize::MAX)
  }

  /// Runs this stream to completion, then `other`.
  pub fn concat(self, other: Observable<T>) -> Observable<T> {
    from_iter(vec![self, other]).merge_all(1)
  }
}

impl<R: 'static> Observable<Observable<R>> {
  /// Flattens a stream of streams with the given concurrency limit.
  pub fn merge_all(self, concurrent: usize) -> Observable<R> {
    self.merge_map(|inner| inner, concurrent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::{interval, of};
  use crate::scheduler::{VirtualTimeScheduler, FRAME};

  #[test]
  fn merges_synchronous_inners() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    from_iter(1..=3)
      .merge_map(|v| from_iter(vec![v * 10, v * 10 + 1]), usize::MAX)
      .subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![10, 11, 20, 21, 30, 31]);
  }

  #[test]
  fn concurrency_limit_queues_overflow_in_fifo_order() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let seen = Rc::new(RefCell::new(Vec::new()));

    // Three outer values at once; each inner emits its tag twice, 10
    // frames apart. With concurrency 2 the third inner waits for a slot.
    let sink = seen.clone();
    let sch = scheduler.clone();
    from_iter(vec!["a", "b", "c"])
      .merge_map(
        move |tag| {
          interval(FRAME * 10, sch.clone())
            .take(2)
            .map(move |i| format!("{tag}{i}"))
        },
        2,
      )
      .subscribe(move |v| sink.borrow_mut().push(v));

    scheduler.flush().unwrap();
    assert_eq!(
      *seen.borrow(),
      vec!["a0", "b0", "a1", "b1", "c0", "c1"],
      "the third inner starts only after a slot frees up"
    );
  }

  #[test]
  fn concat_runs_inners_in_sequence_with_teardown_between() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = log.clone();
    let make_inner = move |tag: char| {
      let l = l.clone();
      of(tag).finalize(move || l.borrow_mut().push(format!("finalized {tag}")))
    };

    let sink = log.clone();
    from_iter(vec!['x', 'y'])
      .concat_map(make_inner)
      .subscribe(move |v| sink.borrow_mut().push(format!("next {v}")));

    assert_eq!(
      *log.borrow(),
      vec!["next x", "finalized x", "next y", "finalized y"],
      "each inner is finalized before the next starts"
    );
  }

  #[test]
  fn completes_only_after_outer_and_every_inner() {
    let scheduler = Rc::new(VirtualTimeScheduler::new());
    let done = Rc::new(std::cell::Cell::new(false));

    let d = done.clone();
    let sch = scheduler.clone();
    from_iter(vec![1])
      .merge_map(move |_| interval(FRAME, sch.clone()).take(3), usize::MAX)
      .subscribe_complete(|_| {}, move || d.set(true));

    assert!(!done.get(), "outer finished but the inner is still running");
    scheduler.flush().unwrap();
    assert!(done.get());
  }
}
