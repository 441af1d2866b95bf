//! Bridges from callback-style APIs.

use std::rc::Rc;

use crate::error::{CallbackError, RxError};
use crate::observable::Observable;
use crate::subscription::TeardownLogic;

/// Adapts a call-with-callback API: each subscribe invokes `invoke` with a
/// one-shot callback that emits the delivered value and completes.
pub fn bind_callback<T: 'static>(
  invoke: impl Fn(Box<dyn FnOnce(T)>) + 'static,
) -> Observable<T> {
  Observable::new(move |sub| {
    invoke(Box::new(move |value| {
      sub.next(value);
      sub.complete();
    }));
    TeardownLogic::None
  })
}

/// Like [`bind_callback`] for APIs whose callback reports success or
/// failure. A callback failure surfaces as a [`CallbackError`].
pub fn bind_node_callback<T: 'static>(
  invoke: impl Fn(Box<dyn FnOnce(Result<T, RxError>)>) + 'static,
) -> Observable<T> {
  Observable::new(move |sub| {
    invoke(Box::new(move |result| match result {
      Ok(value) => {
        sub.next(value);
        sub.complete();
      }
      Err(e) => sub.error(Rc::new(CallbackError(e))),
    }));
    TeardownLogic::None
  })
}

/// Adapts an add/remove-listener API. `add` installs the handler and
/// returns a registration token; `remove` uninstalls it at teardown. The
/// resulting stream never completes on its own.
pub fn from_event_pattern<T, H>(
  add: impl Fn(Rc<dyn Fn(T)>) -> H + 'static,
  remove: impl Fn(H) + 'static,
) -> Observable<T>
where
  T: 'static,
  H: 'static,
{
  let remove = Rc::new(remove);
  Observable::new(move |sub| {
    let handler: Rc<dyn Fn(T)> = Rc::new(move |value| sub.next(value));
    let token = add(handler);
    let remove = remove.clone();
    TeardownLogic::from_fn(move || remove(token))
  })
}
