//! Core of the order workflow service.
//!
//! The [`workflow`] engine decides which documents an order may receive and
//! how its status follows from its confirmation flags. The [`controller`]
//! carries out those decisions against the collaborators: it generates the
//! document, emails it, and stores the new flags, surviving partial failure
//! between the email and the write. [`builder`] assembles a controller from
//! configuration.

pub mod builder;
pub mod controller;
pub mod event_bus;
pub mod state;
pub mod workflow;

pub use builder::{BuilderError, OrderflowBuilder, OrderflowFactories};
pub use controller::{ControllerSettings, OrderController, WorkflowError};
pub use event_bus::EventBus;
pub use workflow::{toggle_suspend, CurrentStep, Step, StepKind, WorkflowDefinition};
