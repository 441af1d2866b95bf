//! rxflow is a push-based reactive-streams runtime: cold observables,
//! subjects for multicast, a pluggable scheduler family, and a
//! virtual-time [`testing::TestScheduler`] driven by marble diagrams.
//!
//! A stream is a recipe. Subscribing runs the recipe, yielding any number
//! of values followed by at most one terminal event, and returns a
//! [`Subscription`] that cancels everything the recipe started:
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use rxflow::prelude::*;
//!
//! let evens = Rc::new(RefCell::new(Vec::new()));
//! let sink = evens.clone();
//! from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe(move |v| sink.borrow_mut().push(v));
//! assert_eq!(*evens.borrow(), vec![0, 20, 40, 60, 80]);
//! ```
//!
//! Time-based operators take an explicit [`scheduler::SchedulerRef`], so
//! the same pipeline runs on wall-clock time in production and on frozen
//! virtual time in tests:
//!
//! ```
//! use rxflow::prelude::*;
//! use rxflow::testing::TestScheduler;
//!
//! TestScheduler::run(|rt| {
//!   let source = rt.cold_chars("ab----c--|");
//!   let calmed = source.observable().debounce_time(FRAME * 3, rt.scheduler());
//!   rt.expect_observable(calmed)
//!     .to_be("----b----(c|)", &[('b', 'b'), ('c', 'c')]);
//! });
//! ```

pub mod config;
pub mod connectable;
pub mod error;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod state;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;

pub use prelude::*;
