//! Platform mappings: the administrator-defined routing rules linking a
//! Telegram bot to a Chatwoot account and/or Dify app, with a per-direction
//! enablement matrix.

pub mod error;
pub mod model;
pub mod service;
pub mod sqlite;
pub mod store;

pub use {
    error::{Error, Result},
    model::{AutoConnect, DirectionMatrix, PlatformMapping},
    service::{
        ConnectionTestReport, MappingService, NewMapping, ProbeResult, RoutingConfiguration,
        RoutingEntry, TargetSummary,
    },
    sqlite::SqliteMappingStore,
    store::MappingStore,
};
