//! Periodic polling with request coalescing and short-lived result caching
//! for the capture pipeline's REST API.
//!
//! A [`Poller`] drives one data source: it fetches, delivers the result to a
//! callback, waits a fixed delay and repeats, never letting two fetches from
//! the same poller overlap. A shared [`ResultCache`] lets a newly started
//! poller show the last known payload before its own fetch returns.

pub mod api;
pub mod core;
pub mod poller;

pub use crate::core::cache::{EvictionPolicy, ResultCache};
pub use crate::core::errors::{ApiError, PollerError};
pub use crate::poller::{PauseGuard, PollRequest, PollState, Poller};
