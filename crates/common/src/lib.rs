//! Shared error definitions, the TTL cache, and time helpers used across all
//! switchboard crates.

pub mod cache;
pub mod error;
pub mod time;

pub use {
    cache::{Clock, SystemClock, TtlCache},
    error::{Error, Result},
    time::unix_now,
};
