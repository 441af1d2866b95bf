//! Bridges from futures.

use futures::FutureExt;
use std::future::Future;

use crate::error::wrap;
use crate::observable::Observable;
use crate::scheduler::spawn;
use crate::subscription::TeardownLogic;

/// Emits the future's output and completes. The future is shared, so it is
/// polled once no matter how many subscribers arrive; delivery happens on
/// the thread's task pool.
pub fn from_future<F>(future: F) -> Observable<F::Output>
where
  F: Future + 'static,
  F::Output: Clone + 'static,
{
  let shared = future.shared();
  Observable::new(move |sub| {
    let shared = shared.clone();
    spawn(async move {
      let value = shared.await;
      if !sub.is_closed() {
        sub.next(value);
        sub.complete();
      }
    });
    TeardownLogic::None
  })
}

/// Like [`from_future`] for fallible futures: `Ok` emits and completes,
/// `Err` takes the error path.
pub fn from_future_result<F, T, E>(future: F) -> Observable<T>
where
  F: Future<Output = Result<T, E>> + 'static,
  T: Clone + 'static,
  E: std::error::Error + Clone + 'static,
{
  let shared = future.shared();
  Observable::new(move |sub| {
    let shared = shared.clone();
    spawn(async move {
      match shared.await {
        Ok(value) => {
          if !sub.is_closed() {
            sub.next(value);
            sub.complete();
          }
        }
        Err(e) => sub.error(wrap(e)),
      }
    });
    TeardownLogic::None
  })
}
