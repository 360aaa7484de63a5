//! Gateway: webhook endpoints, admin API, and the SQLite-backed stores.
//!
//! Lifecycle:
//! 1. Open the database, run schema init
//! 2. Build platform clients and the registry
//! 3. Wire stores → mapping service → routing engine → broker
//! 4. Serve webhook + admin routes
//!
//! Routing semantics live in other crates; this one only adapts HTTP and
//! persistence.

pub mod instance_store;
pub mod link_store;
pub mod routes;
pub mod server;
pub mod state;

pub use {
    instance_store::SqliteInstanceStore,
    link_store::SqliteConversationLinkStore,
    server::serve,
    state::AppState,
};
