//! Operator catalog.
//!
//! Every operator is an inherent method on [`crate::observable::Observable`]
//! that wraps the source in a new observable. The wrapping producer chains
//! an operator-specific observer upstream and registers the upstream link
//! on the downstream subscription, so cancellation always propagates up
//! synchronously.

mod audit;
mod buffer_toggle;
mod combine_latest;
mod debounce;
mod default_if_empty;
mod delay;
mod distinct;
mod filter;
mod finalize;
mod map;
mod merge;
mod race;
mod repeat;
mod retry;
mod scan;
mod share;
mod start_with;
mod switch_map;
mod take;
mod take_until;
mod tap;
mod throttle;
mod timeout;
mod zip;

pub use retry::{RetryConfig, RetryDelay};
pub use throttle::ThrottleEdge;
pub use timeout::TimeoutConfig;
