//! Order lifecycle controller.
//!
//! Sequences the side effects of every order mutation: the workflow engine
//! decides, the document generator and email sender act, the order store
//! records the result. Mutations of one order are serialized by a per-order
//! lock; different orders proceed independently.
//!
//! Dispatching a document is the only operation with a real-world effect
//! that cannot be undone. Once the email has been accepted the flag update
//! runs on its own task, so dropping the caller no longer cancels it. If the
//! store then refuses the write, the updated order is kept as a pending
//! commit: later reads of the order see it, and retrying the same dispatch
//! only retries the write.

use crate::event_bus::EventBus;
use crate::state::OrderStore;
use crate::workflow::{toggle_suspend, WorkflowDefinition};
use dashmap::DashMap;
use orderflow_auth::AuthService;
use orderflow_documents::{DocumentError, DocumentService};
use orderflow_email::{EmailError, EmailService};
use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{
	truncate_id, Document, DocumentKind, Order, OrderDetails, OrderResponse, OrderStats,
	OrderStatus, Workflow, WorkflowEvent, WorkflowFlag,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

#[derive(Debug, Error)]
pub enum WorkflowError {
	#[error("Action not permitted: {0}")]
	ActionNotPermitted(String),
	#[error("Not authenticated, please sign in")]
	Unauthenticated,
	#[error("Document generation failed: {0}")]
	DocumentGenerationFailed(String),
	#[error("Email delivery failed: {0}")]
	EmailDeliveryFailed(String),
	/// The email went out but the resulting flags were not stored.
	#[error("Email sent but status not saved: {0}")]
	PersistenceFailed(String),
	#[error("Cannot confirm {flag}: order is at {current}")]
	InvalidFlagTransition { flag: WorkflowFlag, current: String },
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	/// A read or a write without external side effect failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<DocumentError> for WorkflowError {
	fn from(err: DocumentError) -> Self {
		match err {
			DocumentError::Credentials(_) => WorkflowError::Unauthenticated,
			other => WorkflowError::DocumentGenerationFailed(other.to_string()),
		}
	}
}

impl From<EmailError> for WorkflowError {
	fn from(err: EmailError) -> Self {
		match err {
			EmailError::Credentials(_) => WorkflowError::Unauthenticated,
			other => WorkflowError::EmailDeliveryFailed(other.to_string()),
		}
	}
}

impl From<StorageError> for WorkflowError {
	fn from(err: StorageError) -> Self {
		WorkflowError::Storage(err.to_string())
	}
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
	/// Upper bound for one document generation.
	pub document_timeout: Duration,
	/// Upper bound for handing one email to the transport.
	pub email_timeout: Duration,
	pub allow_suspend_concluded: bool,
}

impl Default for ControllerSettings {
	fn default() -> Self {
		Self {
			document_timeout: Duration::from_secs(60),
			email_timeout: Duration::from_secs(30),
			allow_suspend_concluded: false,
		}
	}
}

/// An order whose dispatch emails went out but whose flags are not stored.
#[derive(Debug, Clone)]
struct PendingCommit {
	/// Documents already emailed.
	kinds: BTreeSet<DocumentKind>,
	/// The order as last stored.
	before: Order,
	/// The order as it should be stored.
	order: Order,
}

/// The authoritative state of an order before a mutation.
struct Snapshot {
	/// As stored.
	base: Order,
	/// As stored plus any pending commit.
	view: Order,
	pending: BTreeSet<DocumentKind>,
}

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive access to one order. The map entry goes away with the last
/// holder, so ids that are never touched again leave nothing behind.
struct OrderLock {
	guard: Option<OwnedMutexGuard<()>>,
	locks: Arc<LockMap>,
	order_id: String,
}

impl Drop for OrderLock {
	fn drop(&mut self) {
		self.guard.take();
		// Waiters hold a clone of the mutex; only the map's own reference may remain.
		self.locks
			.remove_if(&self.order_id, |_, lock| Arc::strong_count(lock) == 1);
	}
}

/// State shared with commit tasks.
struct Shared {
	store: OrderStore,
	pending: DashMap<String, PendingCommit>,
	event_bus: EventBus,
}

impl Shared {
	/// Writes `updated` and publishes what changed relative to `before`.
	async fn persist(&self, before: &Order, updated: Order) -> Result<Order, StorageError> {
		let order = self.store.upsert(updated).await?;
		self.pending.remove(&order.id);

		let flags: Vec<WorkflowFlag> = order
			.workflow
			.flags()
			.filter(|flag| !before.workflow.is_set(*flag))
			.collect();
		if !flags.is_empty() {
			tracing::info!(order_id = %truncate_id(&order.id), flags = ?flags, "Flags committed");
			self.event_bus
				.publish(WorkflowEvent::FlagsCommitted {
					order_id: order.id.clone(),
					flags,
				})
				.ok();
		}
		if before.status != order.status {
			tracing::info!(
				order_id = %truncate_id(&order.id),
				from = %before.status,
				to = %order.status,
				"Status changed"
			);
			self.event_bus
				.publish(WorkflowEvent::StatusChanged {
					order_id: order.id.clone(),
					from: before.status,
					to: order.status,
				})
				.ok();
		}
		Ok(order)
	}

	/// Stores the outcome of a dispatch; on failure keeps it pending.
	async fn commit_dispatch(&self, commit: PendingCommit) -> Result<Order, WorkflowError> {
		match self.persist(&commit.before, commit.order.clone()).await {
			Ok(order) => Ok(order),
			Err(e) => {
				let order_id = commit.order.id.clone();
				tracing::error!(
					order_id = %truncate_id(&order_id),
					error = %e,
					"Email sent but flags not saved"
				);
				for kind in &commit.kinds {
					self.event_bus
						.publish(WorkflowEvent::CommitPending {
							order_id: order_id.clone(),
							kind: *kind,
							error: e.to_string(),
						})
						.ok();
				}
				Err(WorkflowError::PersistenceFailed(e.to_string()))
			},
		}
	}
}

pub struct OrderController {
	definition: WorkflowDefinition,
	settings: ControllerSettings,
	shared: Arc<Shared>,
	documents: Arc<DocumentService>,
	email: Arc<EmailService>,
	auth: Arc<AuthService>,
	locks: Arc<LockMap>,
}

impl OrderController {
	pub fn new(
		definition: WorkflowDefinition,
		settings: ControllerSettings,
		storage: Arc<StorageService>,
		documents: Arc<DocumentService>,
		email: Arc<EmailService>,
		auth: Arc<AuthService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			definition,
			settings,
			shared: Arc::new(Shared {
				store: OrderStore::new(storage),
				pending: DashMap::new(),
				event_bus,
			}),
			documents,
			email,
			auth,
			locks: Arc::new(DashMap::new()),
		}
	}

	pub fn definition(&self) -> &WorkflowDefinition {
		&self.definition
	}

	pub fn auth(&self) -> &Arc<AuthService> {
		&self.auth
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.shared.event_bus
	}

	pub(crate) fn store(&self) -> &OrderStore {
		&self.shared.store
	}

	async fn lock(&self, order_id: &str) -> OrderLock {
		let lock = self.locks.entry(order_id.to_string()).or_default().value().clone();
		OrderLock {
			guard: Some(lock.lock_owned().await),
			locks: self.locks.clone(),
			order_id: order_id.to_string(),
		}
	}

	/// Number of orders with a live lock entry.
	#[cfg(test)]
	pub(crate) fn lock_entries(&self) -> usize {
		self.locks.len()
	}

	async fn snapshot(&self, order_id: &str) -> Result<Snapshot, WorkflowError> {
		let pending = self.shared.pending.get(order_id).map(|p| p.value().clone());
		if let Some(pending) = pending {
			return Ok(Snapshot {
				base: pending.before,
				view: pending.order,
				pending: pending.kinds,
			});
		}

		let base = self
			.shared
			.store
			.get(order_id)
			.await?
			.ok_or_else(|| WorkflowError::OrderNotFound(order_id.to_string()))?;
		Ok(Snapshot {
			view: base.clone(),
			base,
			pending: BTreeSet::new(),
		})
	}

	/// Generates the document of `kind`, emails it to the order's contact and
	/// records the dispatch.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id), document = %kind))]
	pub async fn advance(&self, order: &Order, kind: DocumentKind) -> Result<Order, WorkflowError> {
		let guard = self.lock(&order.id).await;
		let snapshot = self.snapshot(&order.id).await?;

		if snapshot.pending.contains(&kind) {
			tracing::info!("Email already sent, retrying the status update only");
			let commit = PendingCommit {
				kinds: snapshot.pending,
				before: snapshot.base,
				order: snapshot.view,
			};
			return self.spawn_commit(guard, commit).await;
		}

		let current = snapshot.view;
		let action = kind.action();
		if current.is_suspended() {
			return Err(WorkflowError::ActionNotPermitted(format!(
				"{} refused: order is suspended",
				action
			)));
		}
		if !self.definition.can_perform(&current.workflow, action) {
			return Err(WorkflowError::ActionNotPermitted(format!(
				"{} refused at {}",
				action,
				self.definition.current_step(&current.workflow)
			)));
		}
		if !self.auth.is_authenticated().await {
			return Err(WorkflowError::Unauthenticated);
		}

		let document = self.generate(&current, kind).await?;

		let message = self.email.compose(&current, document);
		tokio::time::timeout(self.settings.email_timeout, self.email.send(&message))
			.await
			.map_err(|_| {
				WorkflowError::EmailDeliveryFailed(format!(
					"timed out after {}s",
					self.settings.email_timeout.as_secs()
				))
			})??;
		tracing::info!(recipient = %message.to, subject = %message.subject, "Email sent");
		self.shared
			.event_bus
			.publish(WorkflowEvent::EmailSent {
				order_id: current.id.clone(),
				kind,
				recipient: message.to.clone(),
			})
			.ok();

		let mut workflow = current.workflow.clone();
		for flag in self.definition.flags_for_document(kind) {
			workflow.set(flag);
		}
		let status = self
			.definition
			.next_status(&current.workflow, &workflow, current.status);
		let mut kinds = snapshot.pending;
		kinds.insert(kind);

		let commit = PendingCommit {
			kinds,
			before: snapshot.base,
			order: Order {
				workflow,
				status,
				..current
			},
		};
		self.spawn_commit(guard, commit).await
	}

	/// Generates the document of `kind` for printing or download. Gated like
	/// [`advance`](Self::advance) but sends nothing and changes no flag.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), document = %kind))]
	pub async fn generate_document(
		&self,
		order_id: &str,
		kind: DocumentKind,
	) -> Result<Document, WorkflowError> {
		let current = self.snapshot(order_id).await?.view;
		let action = kind.action();
		if !self.definition.can_perform(&current.workflow, action) {
			return Err(WorkflowError::ActionNotPermitted(format!(
				"{} not available at {}",
				kind,
				self.definition.current_step(&current.workflow)
			)));
		}
		if !self.auth.is_authenticated().await {
			return Err(WorkflowError::Unauthenticated);
		}

		let document = self.generate(&current, kind).await?;
		tracing::info!(filename = %document.filename, "Document generated for download");
		Ok(document)
	}

	/// Runs the generator under the configured timeout and announces the result.
	async fn generate(&self, order: &Order, kind: DocumentKind) -> Result<Document, WorkflowError> {
		let document = tokio::time::timeout(
			self.settings.document_timeout,
			self.documents.generate(order, kind),
		)
		.await
		.map_err(|_| {
			WorkflowError::DocumentGenerationFailed(format!(
				"timed out after {}s",
				self.settings.document_timeout.as_secs()
			))
		})??;
		self.shared
			.event_bus
			.publish(WorkflowEvent::DocumentGenerated {
				order_id: order.id.clone(),
				kind,
				filename: document.filename.clone(),
			})
			.ok();
		Ok(document)
	}

	/// Runs the commit on its own task, holding the order's lock until done.
	///
	/// The commit is recorded as pending first; only a successful write
	/// clears it, so a task that dies midway still leaves it retryable.
	async fn spawn_commit(
		&self,
		guard: OrderLock,
		commit: PendingCommit,
	) -> Result<Order, WorkflowError> {
		self.shared
			.pending
			.insert(commit.order.id.clone(), commit.clone());
		let shared = self.shared.clone();
		tokio::spawn(async move {
			let _guard = guard;
			shared.commit_dispatch(commit).await
		})
		.await
		.map_err(|e| WorkflowError::PersistenceFailed(e.to_string()))?
	}

	/// Records a customer confirmation (`contractAccepted`,
	/// `manualAcknowledged`). Only the flag of the current step is accepted.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id), flag = %flag))]
	pub async fn set_manual_confirmation(
		&self,
		order: &Order,
		flag: WorkflowFlag,
	) -> Result<Order, WorkflowError> {
		if !self.definition.confirmation_flags().contains(&flag) {
			return Err(WorkflowError::ActionNotPermitted(format!(
				"{} is not a manual confirmation",
				flag
			)));
		}

		let _guard = self.lock(&order.id).await;
		let Snapshot { base, view, .. } = self.snapshot(&order.id).await?;
		if view.is_suspended() {
			return Err(WorkflowError::ActionNotPermitted(format!(
				"cannot confirm {}: order is suspended",
				flag
			)));
		}

		let step = self.definition.current_step(&view.workflow);
		if step.flag() != Some(flag) {
			return Err(WorkflowError::InvalidFlagTransition {
				flag,
				current: step.to_string(),
			});
		}

		let workflow = view.workflow.clone().with(flag);
		let status = self
			.definition
			.next_status(&view.workflow, &workflow, view.status);
		let order = self
			.shared
			.persist(
				&base,
				Order {
					workflow,
					status,
					..view
				},
			)
			.await?;
		Ok(order)
	}

	/// Puts an order on hold or resumes it. Flags are untouched; resuming an
	/// order whose terminal flag is set yields `CONCLUDED`, not `IN_PROGRESS`.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn toggle_suspension(&self, order: &Order) -> Result<Order, WorkflowError> {
		let _guard = self.lock(&order.id).await;
		let Snapshot { base, view, .. } = self.snapshot(&order.id).await?;

		if view.status == OrderStatus::Concluded && !self.settings.allow_suspend_concluded {
			return Err(WorkflowError::ActionNotPermitted(
				"concluded orders cannot be suspended".into(),
			));
		}

		let mut status = toggle_suspend(view.status);
		if status == OrderStatus::InProgress
			&& view.workflow.is_set(self.definition.terminal_flag())
		{
			status = OrderStatus::Concluded;
		}

		let order = self
			.shared
			.persist(&base, Order { status, ..view })
			.await?;
		Ok(order)
	}

	/// Stores a new order with a fresh id, no flags and `IN_PROGRESS`.
	#[instrument(skip_all)]
	pub async fn create_order(&self, details: OrderDetails) -> Result<Order, WorkflowError> {
		let order = Order::new(uuid::Uuid::new_v4().to_string(), details);
		let order = self.shared.store.upsert(order).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			company = %order.details.company_name,
			"Order created"
		);
		self.shared
			.event_bus
			.publish(WorkflowEvent::OrderCreated {
				order_id: order.id.clone(),
			})
			.ok();
		Ok(order)
	}

	/// Replaces the descriptive fields; id, status and flags are kept.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update_order(
		&self,
		order_id: &str,
		details: OrderDetails,
	) -> Result<Order, WorkflowError> {
		let _guard = self.lock(order_id).await;
		let Snapshot { base, view, .. } = self.snapshot(order_id).await?;
		let order = self
			.shared
			.persist(&base, Order { details, ..view })
			.await?;
		Ok(order)
	}

	/// Replaces the flags by hand. Flags may be cleared; the status follows
	/// the terminal flag.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn edit_workflow(
		&self,
		order_id: &str,
		workflow: Workflow,
	) -> Result<Order, WorkflowError> {
		let _guard = self.lock(order_id).await;
		let Snapshot { base, view, .. } = self.snapshot(order_id).await?;
		let status = self.definition.reconcile_status(&workflow, view.status);
		tracing::debug!(flags = ?workflow.flags().collect::<Vec<_>>(), "Editing workflow");
		let order = self
			.shared
			.persist(
				&base,
				Order {
					workflow,
					status,
					..view
				},
			)
			.await?;
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn delete_order(&self, order_id: &str) -> Result<(), WorkflowError> {
		let guard = self.lock(order_id).await;
		self.snapshot(order_id).await?;

		self.shared.store.delete(order_id).await?;
		self.shared.pending.remove(order_id);
		drop(guard);

		tracing::info!("Order deleted");
		self.shared
			.event_bus
			.publish(WorkflowEvent::OrderDeleted {
				order_id: order_id.to_string(),
			})
			.ok();
		Ok(())
	}

	/// The stored order, or the order as a pending commit will store it.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, WorkflowError> {
		Ok(self.snapshot(order_id).await?.view)
	}

	/// Every order, newest first, with pending commits applied.
	pub async fn list_orders(&self) -> Result<Vec<Order>, WorkflowError> {
		let mut orders = self.shared.store.list().await?;
		for order in orders.iter_mut() {
			if let Some(pending) = self.shared.pending.get(&order.id) {
				*order = pending.value().order.clone();
			}
		}
		Ok(orders)
	}

	/// Dashboard counters over the orders as [`list_orders`](Self::list_orders)
	/// shows them.
	pub async fn stats(&self) -> Result<OrderStats, WorkflowError> {
		let orders = self.list_orders().await?;
		Ok(OrderStats::from_orders(&orders))
	}

	/// Retries storing a pending commit without generating or sending again.
	/// Without one, returns the stored order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn commit_pending(&self, order_id: &str) -> Result<Order, WorkflowError> {
		let guard = self.lock(order_id).await;
		let pending = self.shared.pending.get(order_id).map(|p| p.value().clone());
		match pending {
			Some(commit) => self.spawn_commit(guard, commit).await,
			None => self.get_order(order_id).await,
		}
	}

	/// Orders whose emails went out but whose flags are not stored yet, as
	/// they will be stored.
	pub fn pending_commits(&self) -> Vec<Order> {
		self.shared
			.pending
			.iter()
			.map(|entry| entry.value().order.clone())
			.collect()
	}

	/// `order` together with its position in the workflow.
	pub fn describe(&self, order: Order) -> OrderResponse {
		let step = self.definition.current_step(&order.workflow);
		OrderResponse {
			commit_pending: self.shared.pending.contains_key(&order.id),
			current_step: step.index(),
			next_flag: step.flag(),
			order,
		}
	}
}

#[cfg(test)]
mod tests;
