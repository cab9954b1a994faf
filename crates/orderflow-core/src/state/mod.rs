//! Order persistence used by the controller.

pub mod order;

pub use order::OrderStore;
