//! Reusable observers for Braid optimization runs.
//!
//! - [`History`] keeps every evaluated point in memory and counts failures.
//! - [`Recorder`] writes one JSON line per evaluated point, the traceability
//!   record of a run.
//!
//! Both implement [`Observer`] for driver events. Because the driver takes its
//! observer by value, borrow one through a closure to inspect it afterwards:
//!
//! ```
//! use braid_driver::Event;
//! use braid_observers::History;
//! use braid_core::Observer;
//!
//! let mut history = History::new();
//! let observer = |event: &Event<'_>| history.observe(event);
//! # drop(observer);
//! ```
//!
//! [`Observer`]: braid_core::Observer

mod history;
mod record;
mod recorder;

pub use history::History;
pub use record::Record;
pub use recorder::Recorder;
