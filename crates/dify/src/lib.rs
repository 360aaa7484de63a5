//! Dify platform adapter.
//!
//! Blocking chat-message client, response shaping (length caps, greeting
//! heuristic, array-answer quirk), and conversation continuity handling.

pub mod client;
pub mod forwarder;
pub mod shaping;

pub use {
    client::{ChatAnswer, DifyClient},
    forwarder::{DifyForwarder, DifyOptions},
    shaping::{ShapingConfig, shape_answer},
};
