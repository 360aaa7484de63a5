//! Message broker and routing engine.
//!
//! One inbound webhook becomes one canonical message (broker), which fans
//! out to the mapped target platforms (engine). Each leg runs isolated: a
//! failing target is recorded in the outcome and never blocks its siblings.

pub mod broker;
pub mod engine;
pub mod error;
pub mod guard;
pub mod outcome;

pub use {
    broker::MessageBroker,
    engine::RoutingEngine,
    error::{Error, Result},
    guard::should_process_message,
    outcome::{RoutingOutcome, TargetResult},
};
