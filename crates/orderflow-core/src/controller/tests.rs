use super::*;
use async_trait::async_trait;
use orderflow_auth::implementations::session::SessionAuth;
use orderflow_documents::implementations::template::TemplateDocumentsSchema;
use orderflow_documents::DocumentInterface;
use orderflow_email::implementations::outbox::OutboxEmailSchema;
use orderflow_email::EmailInterface;
use orderflow_storage::implementations::memory::{MemoryStorage, MemoryStorageSchema};
use orderflow_storage::StorageInterface;
use orderflow_types::testing::sample_order;
use orderflow_types::{ConfigSchema, Document, EmailMessage, SecretString, PDF_MIME_TYPE};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use WorkflowFlag::*;

#[derive(Clone, Default)]
struct Switch(Arc<AtomicBool>);

impl Switch {
	fn set(&self, on: bool) {
		self.0.store(on, Ordering::SeqCst);
	}

	fn is_on(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

struct CountingDocuments {
	calls: Arc<AtomicUsize>,
	fail: Switch,
	delay: Duration,
}

#[async_trait]
impl DocumentInterface for CountingDocuments {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TemplateDocumentsSchema)
	}

	async fn generate(
		&self,
		order: &Order,
		kind: DocumentKind,
		_: &SecretString,
	) -> Result<Document, DocumentError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(self.delay).await;
		if self.fail.is_on() {
			return Err(DocumentError::Export("export service unavailable".into()));
		}
		Ok(Document {
			kind,
			filename: format!("{}-{}.pdf", kind, order.id),
			mime_type: PDF_MIME_TYPE.into(),
			content: b"%PDF".to_vec(),
		})
	}
}

struct CountingEmail {
	sent: Arc<StdMutex<Vec<EmailMessage>>>,
	fail: Switch,
	delay: Duration,
}

#[async_trait]
impl EmailInterface for CountingEmail {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(OutboxEmailSchema)
	}

	async fn send(&self, message: &EmailMessage, _: &SecretString) -> Result<(), EmailError> {
		tokio::time::sleep(self.delay).await;
		if self.fail.is_on() {
			return Err(EmailError::Delivery("mailbox unavailable".into()));
		}
		self.sent.lock().unwrap().push(message.clone());
		Ok(())
	}
}

/// Memory storage whose writes can be switched off, or made to crash.
struct FlakyStorage {
	inner: MemoryStorage,
	fail_writes: Switch,
	panic_writes: Switch,
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		if self.panic_writes.is_on() {
			panic!("storage backend crashed");
		}
		if self.fail_writes.is_on() {
			return Err(StorageError::Backend("disk full".into()));
		}
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		self.inner.list_keys(prefix).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

#[derive(Default)]
struct Options {
	extended: bool,
	allow_suspend_concluded: bool,
	signed_out: bool,
	document_delay: Duration,
	email_delay: Duration,
}

struct Harness {
	controller: OrderController,
	generated: Arc<AtomicUsize>,
	sent: Arc<StdMutex<Vec<EmailMessage>>>,
	fail_documents: Switch,
	fail_email: Switch,
	fail_writes: Switch,
	panic_writes: Switch,
}

impl Harness {
	fn sent_count(&self) -> usize {
		self.sent.lock().unwrap().len()
	}

	async fn seed(&self, order: Order) -> Order {
		self.controller.store().upsert(order).await.unwrap()
	}

	async fn stored(&self, id: &str) -> Order {
		self.controller.store().get(id).await.unwrap().unwrap()
	}
}

async fn harness(options: Options) -> Harness {
	let generated = Arc::new(AtomicUsize::new(0));
	let sent = Arc::new(StdMutex::new(Vec::new()));
	let fail_documents = Switch::default();
	let fail_email = Switch::default();
	let fail_writes = Switch::default();
	let panic_writes = Switch::default();

	let auth = Arc::new(AuthService::new(Box::new(SessionAuth::new())));
	if !options.signed_out {
		auth.store_token("tok".into(), Duration::from_secs(3600))
			.await
			.unwrap();
	}

	let documents = DocumentService::new(
		Box::new(CountingDocuments {
			calls: generated.clone(),
			fail: fail_documents.clone(),
			delay: options.document_delay,
		}),
		auth.clone(),
	);
	let email = EmailService::new(
		Box::new(CountingEmail {
			sent: sent.clone(),
			fail: fail_email.clone(),
			delay: options.email_delay,
		}),
		auth.clone(),
		"office@example.com",
		true,
	);
	let storage = StorageService::new(Box::new(FlakyStorage {
		inner: MemoryStorage::new(),
		fail_writes: fail_writes.clone(),
		panic_writes: panic_writes.clone(),
	}));

	let definition = if options.extended {
		WorkflowDefinition::extended()
	} else {
		WorkflowDefinition::standard()
	};
	let settings = ControllerSettings {
		document_timeout: Duration::from_secs(5),
		email_timeout: Duration::from_secs(5),
		allow_suspend_concluded: options.allow_suspend_concluded,
	};

	Harness {
		controller: OrderController::new(
			definition,
			settings,
			Arc::new(storage),
			Arc::new(documents),
			Arc::new(email),
			auth,
			EventBus::new(64),
		),
		generated,
		sent,
		fail_documents,
		fail_email,
		fail_writes,
		panic_writes,
	}
}

fn order_with(id: &str, flags: &[WorkflowFlag]) -> Order {
	let mut order = sample_order(id);
	order.workflow = flags.iter().copied().collect();
	order
}

#[tokio::test]
async fn test_advance_contract_on_new_order() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;

	let updated = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();

	assert!(updated.workflow.is_set(ContractSent));
	assert_eq!(updated.workflow.flags().count(), 1);
	assert_eq!(updated.status, OrderStatus::InProgress);
	assert_eq!(h.stored("o-1").await.workflow, updated.workflow);
	assert_eq!(h.generated.load(Ordering::SeqCst), 1);

	let sent = h.sent.lock().unwrap();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].to, "ufficio@acquechiare.it");
	assert_eq!(sent[0].attachments[0].kind, DocumentKind::Contract);
}

#[tokio::test]
async fn test_manual_requires_accepted_contract() {
	let h = harness(Options::default()).await;
	let order = h.seed(order_with("o-1", &[ContractSent])).await;

	let err = h
		.controller
		.advance(&order, DocumentKind::Manual)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::ActionNotPermitted(_)));
	assert_eq!(h.generated.load(Ordering::SeqCst), 0);
	assert_eq!(h.sent_count(), 0);
	assert_eq!(h.stored("o-1").await.workflow, order.workflow);
}

#[tokio::test]
async fn test_warranty_concludes_order() {
	let h = harness(Options::default()).await;
	let order = h
		.seed(order_with(
			"o-1",
			&[ContractSent, ContractAccepted, ManualSent, ManualAcknowledged],
		))
		.await;
	let mut events = h.controller.event_bus().subscribe();

	let updated = h
		.controller
		.advance(&order, DocumentKind::Warranty)
		.await
		.unwrap();

	assert!(updated.workflow.is_set(WarrantyReleased));
	assert_eq!(updated.status, OrderStatus::Concluded);
	assert_eq!(h.stored("o-1").await.status, OrderStatus::Concluded);

	let mut received = Vec::new();
	while let Ok(event) = events.try_recv() {
		received.push(event);
	}
	assert!(matches!(
		received[0],
		WorkflowEvent::DocumentGenerated {
			kind: DocumentKind::Warranty,
			..
		}
	));
	assert!(matches!(received[1], WorkflowEvent::EmailSent { .. }));
	assert_eq!(
		received[2],
		WorkflowEvent::FlagsCommitted {
			order_id: "o-1".into(),
			flags: vec![WarrantyReleased],
		}
	);
	assert_eq!(
		received[3],
		WorkflowEvent::StatusChanged {
			order_id: "o-1".into(),
			from: OrderStatus::InProgress,
			to: OrderStatus::Concluded,
		}
	);
}

#[tokio::test]
async fn test_resume_suspended_order() {
	let h = harness(Options::default()).await;
	let mut order = order_with("o-1", &[ContractSent, ContractAccepted]);
	order.status = OrderStatus::Suspended;
	let order = h.seed(order).await;

	let resumed = h.controller.toggle_suspension(&order).await.unwrap();

	assert_eq!(resumed.status, OrderStatus::InProgress);
	assert_eq!(resumed.workflow, order.workflow);
	assert_eq!(h.stored("o-1").await.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_generation_failure_leaves_no_trace() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;
	h.fail_documents.set(true);

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::DocumentGenerationFailed(_)));
	assert!(!h.stored("o-1").await.workflow.is_set(ContractSent));
	assert_eq!(h.sent_count(), 0);

	h.fail_documents.set(false);
	let updated = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();
	assert_eq!(
		updated.workflow,
		Workflow::from_iter([ContractSent])
	);
	assert_eq!(updated.status, OrderStatus::InProgress);
	assert_eq!(h.sent_count(), 1);
}

#[tokio::test]
async fn test_delivery_failure_leaves_no_trace() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;
	h.fail_email.set(true);

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::EmailDeliveryFailed(_)));
	assert_eq!(h.stored("o-1").await.workflow, Workflow::new());
	assert!(h.controller.pending_commits().is_empty());
}

#[tokio::test]
async fn test_retry_after_persistence_failure_does_not_resend() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;
	h.fail_writes.set(true);

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::PersistenceFailed(_)));
	assert_eq!(h.sent_count(), 1);
	assert!(!h.stored("o-1").await.workflow.is_set(ContractSent));

	let pending = h.controller.pending_commits();
	assert_eq!(pending.len(), 1);
	assert!(pending[0].workflow.is_set(ContractSent));
	assert!(h.controller.describe(order.clone()).commit_pending);
	let viewed = h.controller.get_order("o-1").await.unwrap();
	assert!(viewed.workflow.is_set(ContractSent));

	h.fail_writes.set(false);
	let updated = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();

	assert!(updated.workflow.is_set(ContractSent));
	assert!(h.stored("o-1").await.workflow.is_set(ContractSent));
	assert_eq!(h.generated.load(Ordering::SeqCst), 1);
	assert_eq!(h.sent_count(), 1);
	assert!(h.controller.pending_commits().is_empty());
}

#[tokio::test]
async fn test_commit_pending_retries_write_only() {
	let h = harness(Options::default()).await;
	let order = h
		.seed(order_with(
			"o-1",
			&[ContractSent, ContractAccepted, ManualSent, ManualAcknowledged],
		))
		.await;
	h.fail_writes.set(true);
	h.controller
		.advance(&order, DocumentKind::Warranty)
		.await
		.unwrap_err();

	let err = h.controller.commit_pending("o-1").await.unwrap_err();
	assert!(matches!(err, WorkflowError::PersistenceFailed(_)));

	h.fail_writes.set(false);
	let committed = h.controller.commit_pending("o-1").await.unwrap();
	assert_eq!(committed.status, OrderStatus::Concluded);
	assert_eq!(h.sent_count(), 1);

	let again = h.controller.commit_pending("o-1").await.unwrap();
	assert_eq!(again.workflow, committed.workflow);
}

#[tokio::test]
async fn test_confirmation_builds_on_pending_commit() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;
	h.fail_writes.set(true);
	h.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();
	h.fail_writes.set(false);

	let accepted = h
		.controller
		.set_manual_confirmation(&order, ContractAccepted)
		.await
		.unwrap();

	assert!(accepted.workflow.is_set(ContractSent));
	assert!(accepted.workflow.is_set(ContractAccepted));
	assert!(h.controller.pending_commits().is_empty());
}

#[tokio::test]
async fn test_signed_out_operator_cannot_advance() {
	let h = harness(Options {
		signed_out: true,
		..Default::default()
	})
	.await;
	let order = h.seed(sample_order("o-1")).await;

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::Unauthenticated));
	assert_eq!(h.generated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_suspended_order_cannot_advance() {
	let h = harness(Options::default()).await;
	let mut order = sample_order("o-1");
	order.status = OrderStatus::Suspended;
	let order = h.seed(order).await;

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::ActionNotPermitted(_)));
	assert_eq!(h.generated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_caller_copy_is_ignored() {
	let h = harness(Options::default()).await;
	let stale = sample_order("o-1");
	h.seed(order_with("o-1", &[ContractSent])).await;

	let err = h
		.controller
		.set_manual_confirmation(&stale, ManualAcknowledged)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::InvalidFlagTransition { .. }));

	let accepted = h
		.controller
		.set_manual_confirmation(&stale, ContractAccepted)
		.await
		.unwrap();
	assert!(accepted.workflow.is_set(ContractSent));
}

#[tokio::test]
async fn test_confirmation_rules() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;

	let err = h
		.controller
		.set_manual_confirmation(&order, ContractSent)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::ActionNotPermitted(_)));

	let err = h
		.controller
		.set_manual_confirmation(&order, ContractAccepted)
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		WorkflowError::InvalidFlagTransition {
			flag: ContractAccepted,
			..
		}
	));

	h.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();
	let accepted = h
		.controller
		.set_manual_confirmation(&order, ContractAccepted)
		.await
		.unwrap();
	assert!(accepted.workflow.is_set(ContractAccepted));
	assert_eq!(accepted.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_concluded_order_suspension() {
	let mut concluded = order_with("o-1", &WorkflowFlag::CANONICAL);
	concluded.status = OrderStatus::Concluded;

	let h = harness(Options::default()).await;
	let order = h.seed(concluded.clone()).await;
	let err = h.controller.toggle_suspension(&order).await.unwrap_err();
	assert!(matches!(err, WorkflowError::ActionNotPermitted(_)));

	let h = harness(Options {
		allow_suspend_concluded: true,
		..Default::default()
	})
	.await;
	let order = h.seed(concluded).await;
	let suspended = h.controller.toggle_suspension(&order).await.unwrap();
	assert_eq!(suspended.status, OrderStatus::Suspended);
	let resumed = h.controller.toggle_suspension(&order).await.unwrap();
	assert_eq!(resumed.status, OrderStatus::Concluded);
}

#[tokio::test]
async fn test_extended_variant_marks_creation() {
	let h = harness(Options {
		extended: true,
		..Default::default()
	})
	.await;
	let order = h.seed(sample_order("o-1")).await;

	let updated = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();

	assert_eq!(
		updated.workflow,
		Workflow::from_iter([ContractCreated, ContractSent])
	);
	let view = h.controller.describe(updated);
	assert_eq!(view.current_step, Some(3));
	assert_eq!(view.next_flag, Some(ContractAccepted));
}

#[tokio::test(start_paused = true)]
async fn test_slow_generation_times_out() {
	let h = harness(Options {
		document_delay: Duration::from_secs(120),
		..Default::default()
	})
	.await;
	let order = h.seed(sample_order("o-1")).await;

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::DocumentGenerationFailed(ref msg) if msg.contains("timed out")));
	assert_eq!(h.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_delivery_times_out() {
	let h = harness(Options {
		email_delay: Duration::from_secs(120),
		..Default::default()
	})
	.await;
	let order = h.seed(sample_order("o-1")).await;

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::EmailDeliveryFailed(_)));
	assert_eq!(h.stored("o-1").await.workflow, Workflow::new());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_delivery_discards_everything() {
	let h = harness(Options {
		email_delay: Duration::from_secs(2),
		..Default::default()
	})
	.await;
	let order = h.seed(sample_order("o-1")).await;

	let outcome = tokio::time::timeout(
		Duration::from_secs(1),
		h.controller.advance(&order, DocumentKind::Contract),
	)
	.await;
	assert!(outcome.is_err());

	tokio::time::sleep(Duration::from_secs(5)).await;
	assert_eq!(h.sent_count(), 0);
	assert_eq!(h.stored("o-1").await.workflow, Workflow::new());
	assert!(h.controller.pending_commits().is_empty());
}

#[tokio::test]
async fn test_order_crud() {
	let h = harness(Options::default()).await;
	let mut events = h.controller.event_bus().subscribe();

	let created = h
		.controller
		.create_order(sample_order("ignored").details)
		.await
		.unwrap();
	assert_ne!(created.id, "ignored");
	assert_eq!(created.status, OrderStatus::InProgress);
	assert_eq!(
		events.try_recv().unwrap(),
		WorkflowEvent::OrderCreated {
			order_id: created.id.clone()
		}
	);

	let mut details = created.details.clone();
	details.city = "Bergamo".into();
	h.controller
		.edit_workflow(&created.id, Workflow::from_iter([ContractSent]))
		.await
		.unwrap();
	let updated = h
		.controller
		.update_order(&created.id, details)
		.await
		.unwrap();
	assert_eq!(updated.details.city, "Bergamo");
	assert!(updated.workflow.is_set(ContractSent));

	h.controller.delete_order(&created.id).await.unwrap();
	assert!(matches!(
		h.controller.get_order(&created.id).await,
		Err(WorkflowError::OrderNotFound(_))
	));
	assert!(matches!(
		h.controller.delete_order(&created.id).await,
		Err(WorkflowError::OrderNotFound(_))
	));
}

#[tokio::test]
async fn test_edit_workflow_recomputes_conclusion() {
	let h = harness(Options::default()).await;
	h.seed(sample_order("o-1")).await;

	let done = h
		.controller
		.edit_workflow("o-1", WorkflowFlag::CANONICAL.into_iter().collect())
		.await
		.unwrap();
	assert_eq!(done.status, OrderStatus::Concluded);

	let reset = h
		.controller
		.edit_workflow("o-1", Workflow::from_iter([ContractSent]))
		.await
		.unwrap();
	assert_eq!(reset.status, OrderStatus::InProgress);
	assert!(!reset.workflow.is_set(WarrantyReleased));
}

#[tokio::test]
async fn test_stats_count_statuses() {
	let h = harness(Options::default()).await;
	h.seed(sample_order("a")).await;
	let mut suspended = sample_order("b");
	suspended.status = OrderStatus::Suspended;
	h.seed(suspended).await;
	let mut concluded = order_with("c", &WorkflowFlag::CANONICAL);
	concluded.status = OrderStatus::Concluded;
	h.seed(concluded).await;

	let stats = h.controller.stats().await.unwrap();
	assert_eq!(
		stats,
		OrderStats {
			total: 3,
			in_progress: 1,
			suspended: 1,
			concluded: 1,
		}
	);
	assert_eq!(h.controller.list_orders().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
	let h = harness(Options::default()).await;
	assert!(matches!(
		h.controller
			.update_order("missing", sample_order("x").details)
			.await,
		Err(WorkflowError::OrderNotFound(_))
	));
}

#[tokio::test]
async fn test_advance_after_delete_sends_nothing() {
	let h = harness(Options::default()).await;
	h.seed(sample_order("o-1")).await;
	let fetched = h.controller.get_order("o-1").await.unwrap();
	h.controller.delete_order("o-1").await.unwrap();

	let err = h
		.controller
		.advance(&fetched, DocumentKind::Contract)
		.await
		.unwrap_err();

	assert!(matches!(err, WorkflowError::OrderNotFound(_)));
	assert_eq!(h.generated.load(Ordering::SeqCst), 0);
	assert_eq!(h.sent_count(), 0);
	assert!(h.controller.store().get("o-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_lock_entries_released_after_use() {
	let h = harness(Options::default()).await;
	for i in 0..500 {
		let id = format!("missing-{}", i);
		h.controller.commit_pending(&id).await.unwrap_err();
		h.controller
			.update_order(&id, sample_order("x").details)
			.await
			.unwrap_err();
	}
	assert_eq!(h.controller.lock_entries(), 0);

	let order = h.seed(sample_order("o-1")).await;
	let (first, second) = tokio::join!(
		h.controller.toggle_suspension(&order),
		h.controller.toggle_suspension(&order),
	);
	first.unwrap();
	second.unwrap();
	assert_eq!(h.stored("o-1").await.status, OrderStatus::InProgress);

	h.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap();
	assert_eq!(h.controller.lock_entries(), 0);
}

#[tokio::test]
async fn test_stats_follow_pending_commit() {
	let h = harness(Options::default()).await;
	let order = h
		.seed(order_with(
			"o-1",
			&[ContractSent, ContractAccepted, ManualSent, ManualAcknowledged],
		))
		.await;
	h.fail_writes.set(true);
	h.controller
		.advance(&order, DocumentKind::Warranty)
		.await
		.unwrap_err();

	let listed = h.controller.list_orders().await.unwrap();
	assert_eq!(listed[0].status, OrderStatus::Concluded);
	assert_eq!(
		h.controller.stats().await.unwrap(),
		OrderStats {
			total: 1,
			in_progress: 0,
			suspended: 0,
			concluded: 1,
		}
	);
}

#[tokio::test]
async fn test_crashed_commit_stays_pending() {
	let h = harness(Options::default()).await;
	let order = h.seed(sample_order("o-1")).await;
	h.panic_writes.set(true);

	let err = h
		.controller
		.advance(&order, DocumentKind::Contract)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::PersistenceFailed(_)));
	assert_eq!(h.controller.pending_commits().len(), 1);
	assert!(!h.stored("o-1").await.workflow.is_set(ContractSent));

	h.panic_writes.set(false);
	let committed = h.controller.commit_pending("o-1").await.unwrap();
	assert!(committed.workflow.is_set(ContractSent));
	assert_eq!(h.sent_count(), 1);
	assert!(h.controller.pending_commits().is_empty());
}

#[tokio::test]
async fn test_generate_document_sends_nothing() {
	let h = harness(Options::default()).await;
	h.seed(sample_order("o-1")).await;

	let document = h
		.controller
		.generate_document("o-1", DocumentKind::Contract)
		.await
		.unwrap();

	assert_eq!(document.kind, DocumentKind::Contract);
	assert_eq!(document.content, b"%PDF".to_vec());
	assert_eq!(h.generated.load(Ordering::SeqCst), 1);
	assert_eq!(h.sent_count(), 0);
	assert_eq!(h.stored("o-1").await.workflow, Workflow::new());
}

#[tokio::test]
async fn test_generate_document_is_gated() {
	let h = harness(Options::default()).await;
	h.seed(sample_order("o-1")).await;

	let err = h
		.controller
		.generate_document("o-1", DocumentKind::Manual)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::ActionNotPermitted(_)));
	assert_eq!(h.generated.load(Ordering::SeqCst), 0);

	h.controller.auth().clear().await;
	let err = h
		.controller
		.generate_document("o-1", DocumentKind::Contract)
		.await
		.unwrap_err();
	assert!(matches!(err, WorkflowError::Unauthenticated));

	assert!(matches!(
		h.controller
			.generate_document("missing", DocumentKind::Contract)
			.await,
		Err(WorkflowError::OrderNotFound(_))
	));
}
