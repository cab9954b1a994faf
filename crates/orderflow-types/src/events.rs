//! Events published on the workflow event bus.
//!
//! Consumers subscribe to observe order mutations without coupling to the
//! controller, e.g. the service logs every event it receives.

use crate::{DocumentKind, OrderStatus, WorkflowFlag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowEvent {
	/// A new order was stored.
	OrderCreated { order_id: String },
	/// An order was removed from the store.
	OrderDeleted { order_id: String },
	/// The generator produced a document.
	DocumentGenerated {
		order_id: String,
		kind: DocumentKind,
		filename: String,
	},
	/// The sender accepted the dispatch email.
	EmailSent {
		order_id: String,
		kind: DocumentKind,
		recipient: String,
	},
	/// Flags were durably written.
	FlagsCommitted {
		order_id: String,
		flags: Vec<WorkflowFlag>,
	},
	/// The email went out but the flags could not be persisted.
	CommitPending {
		order_id: String,
		kind: DocumentKind,
		error: String,
	},
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
}

impl WorkflowEvent {
	pub fn order_id(&self) -> &str {
		match self {
			WorkflowEvent::OrderCreated { order_id }
			| WorkflowEvent::OrderDeleted { order_id }
			| WorkflowEvent::DocumentGenerated { order_id, .. }
			| WorkflowEvent::EmailSent { order_id, .. }
			| WorkflowEvent::FlagsCommitted { order_id, .. }
			| WorkflowEvent::CommitPending { order_id, .. }
			| WorkflowEvent::StatusChanged { order_id, .. } => order_id,
		}
	}
}
