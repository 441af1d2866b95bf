//! The most common imports in one place.

pub use crate::connectable::ConnectableObservable;
pub use crate::error::{message, wrap, RxError};
pub use crate::notification::Notification;
pub use crate::observable::{
  bind_callback, bind_node_callback, defer, empty, from_event_pattern, from_future,
  from_future_result, from_iter, generate, interval, never, of, of_fn, of_option, range,
  throw_error, timer, timer_at_interval, Observable,
};
pub use crate::observer::{FnObserver, Observer};
pub use crate::ops::{RetryConfig, RetryDelay, ThrottleEdge, TimeoutConfig};
pub use crate::pipe;
pub use crate::scheduler::{
  asap, immediate, queue, virtual_time, ActionHandle, Scheduler, SchedulerExt, SchedulerRef,
  VirtualTimeScheduler, FRAME,
};
#[cfg(feature = "timer")]
pub use crate::scheduler::{animation_frame, async_scheduler};
pub use crate::state::{StateObservable, StateValue};
pub use crate::subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject, SubjectLike};
pub use crate::subscriber::Subscriber;
pub use crate::subscription::{Subscription, SubscriptionGuard, SubscriptionLike, TeardownLogic};
