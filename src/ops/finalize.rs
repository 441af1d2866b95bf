use crate::observable::{shared_fn, Observable};
use crate::subscription::TeardownLogic;

impl<T: 'static> Observable<T> {
  /// Runs `callback` when the subscription ends, whether by completion,
  /// error, or unsubscription. Registered after the upstream link, so
  /// upstream teardown runs first.
  pub fn finalize(self, callback: impl FnMut() + 'static) -> Observable<T> {
    let callback = shared_fn(callback);
    Observable::new(move |sub| {
      self.chain(sub.subscription(), sub.clone());
      let callback = callback.clone();
      sub.subscription().add_fn(move || (callback.borrow_mut())());
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::error::message;
  use crate::observable::{never, of, throw_error, Observable};
  use crate::subscription::{SubscriptionLike, TeardownLogic};
  use std::cell::RefCell;
  use std::rc::Rc;

  fn logging<T: 'static>(log: &Rc<RefCell<Vec<String>>>, source: Observable<T>) -> Observable<T> {
    let log = log.clone();
    source.finalize(move || log.borrow_mut().push("finalized".into()))
  }

  #[test]
  fn runs_once_on_complete() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    logging(&log, of(1)).subscribe(move |v| sink.borrow_mut().push(format!("next {v}")));
    assert_eq!(*log.borrow(), vec!["next 1", "finalized"]);
  }

  #[test]
  fn runs_on_error_too() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    logging(&log, throw_error::<i32>(message("x")))
      .subscribe_err(|_| {}, move |_| sink.borrow_mut().push("error".into()));
    assert_eq!(*log.borrow(), vec!["error", "finalized"]);
  }

  #[test]
  fn runs_after_upstream_teardown() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let source = Observable::new(move |_sub: crate::subscriber::Subscriber<i32>| {
      let l = l.clone();
      TeardownLogic::from_fn(move || l.borrow_mut().push("teardown".into()))
    });

    let sub = logging(&log, source).subscribe(|_| {});
    sub.unsubscribe();
    assert_eq!(*log.borrow(), vec!["teardown", "finalized"]);
  }

  #[test]
  fn does_not_run_while_still_subscribed() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let _sub = logging(&log, never::<i32>()).subscribe(|_| {});
    assert!(log.borrow().is_empty());
  }
}
