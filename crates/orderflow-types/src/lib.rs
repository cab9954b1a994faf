//! Shared domain types for the order workflow service.
//!
//! Everything that crosses a crate boundary lives here: the order record and
//! its confirmation flags, the documents and emails exchanged with the
//! collaborators, events published on the bus, storage keys and the
//! configuration validation framework used by every backend.

/// Request and response bodies of the HTTP API.
pub mod api;
/// Generated documents and outgoing email messages.
pub mod document;
/// Events published while orders move through the workflow.
pub mod events;
/// Orders, statuses, workflow flags and actions.
pub mod order;
/// Self-registration of backend implementations.
pub mod registry;
/// Redacted string wrapper for tokens and credentials.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Sample records shared by tests across the workspace.
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// Small formatting helpers.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

pub use api::*;
pub use document::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
