//! Builder wiring configuration into an [`OrderController`].
//!
//! Every collaborator section of the configuration names a primary backend
//! and the tables of one or more implementations. Each configured
//! implementation is created through its registered factory, which
//! validates its own table; the primary one is kept.

use crate::controller::{ControllerSettings, OrderController};
use crate::event_bus::EventBus;
use crate::workflow::WorkflowDefinition;
use orderflow_auth::{AuthError, AuthInterface, AuthService};
use orderflow_config::{BackendConfig, Config, WorkflowVariant};
use orderflow_documents::{DocumentError, DocumentInterface, DocumentService};
use orderflow_email::{EmailError, EmailInterface, EmailService};
use orderflow_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Capacity of the workflow event channel.
const EVENT_BUS_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every collaborator, keyed by implementation name.
pub struct OrderflowFactories<SF, DF, EF, AF> {
	pub storage_factories: HashMap<String, SF>,
	pub document_factories: HashMap<String, DF>,
	pub email_factories: HashMap<String, EF>,
	pub auth_factories: HashMap<String, AF>,
}

pub struct OrderflowBuilder {
	config: Config,
}

impl OrderflowBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<SF, DF, EF, AF>(
		self,
		factories: OrderflowFactories<SF, DF, EF, AF>,
	) -> Result<OrderController, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		DF: Fn(&toml::Value) -> Result<Box<dyn DocumentInterface>, DocumentError>,
		EF: Fn(&toml::Value) -> Result<Box<dyn EmailInterface>, EmailError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>,
	{
		let storage = load_primary(
			"storage",
			&self.config.storage,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage));

		let auth = load_primary("auth", &self.config.auth, &factories.auth_factories)?;
		let auth = Arc::new(AuthService::new(auth));

		let documents = load_primary(
			"documents",
			&self.config.documents,
			&factories.document_factories,
		)?;
		let documents = Arc::new(DocumentService::new(documents, auth.clone()));

		let email = load_primary(
			"email",
			&self.config.email.backend,
			&factories.email_factories,
		)?;
		let email = Arc::new(EmailService::new(
			email,
			auth.clone(),
			self.config.email.sender.clone(),
			self.config.email.bcc_sender,
		));

		let definition = match self.config.workflow.variant {
			WorkflowVariant::Standard => WorkflowDefinition::standard(),
			WorkflowVariant::Extended => WorkflowDefinition::extended(),
		};
		let settings = ControllerSettings {
			document_timeout: Duration::from_secs(self.config.service.document_timeout_seconds),
			email_timeout: Duration::from_secs(self.config.service.email_timeout_seconds),
			allow_suspend_concluded: self.config.workflow.allow_suspend_concluded,
		};
		tracing::info!(
			component = "workflow",
			variant = ?self.config.workflow.variant,
			steps = definition.steps().len(),
			allow_suspend_concluded = settings.allow_suspend_concluded,
			"Loaded"
		);

		Ok(OrderController::new(
			definition,
			settings,
			storage,
			documents,
			email,
			auth,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}

/// Creates every configured implementation of one component and returns the
/// primary one.
fn load_primary<T, E, F>(
	component: &str,
	section: &BackendConfig,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in &section.implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(
				component = component,
				implementation = %name,
				"Unknown implementation, skipping"
			);
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = &section.primary == name;
				tracing::info!(component = component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component = component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	loaded.remove(&section.primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, section.primary
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_config::builders::ConfigBuilder;
	use orderflow_types::testing::sample_details;
	use orderflow_types::{DocumentKind, WorkflowFlag};
	use tempfile::TempDir;

	fn factories() -> OrderflowFactories<
		orderflow_storage::StorageFactory,
		orderflow_documents::DocumentFactory,
		orderflow_email::EmailFactory,
		orderflow_auth::AuthFactory,
	> {
		OrderflowFactories {
			storage_factories: orderflow_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			document_factories: orderflow_documents::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			email_factories: orderflow_email::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			auth_factories: orderflow_auth::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_built_controller_dispatches_to_outbox() {
		let dir = TempDir::new().unwrap();
		let templates = dir.path().join("templates");
		let outbox = dir.path().join("outbox");
		std::fs::create_dir_all(&templates).unwrap();
		std::fs::write(
			templates.join("usage_agreement.txt"),
			"Accordo per {{companyName}}, P.IVA {{vatNumber}}",
		)
		.unwrap();

		let config = ConfigBuilder::new()
			.variant(WorkflowVariant::Extended)
			.template_dir(templates.display().to_string())
			.outbox_dir(outbox.display().to_string())
			.build();
		let controller = OrderflowBuilder::new(config).build(factories()).unwrap();
		controller
			.auth()
			.store_token("tok".into(), Duration::from_secs(60))
			.await
			.unwrap();

		let order = controller.create_order(sample_details()).await.unwrap();
		let updated = controller
			.advance(&order, DocumentKind::Contract)
			.await
			.unwrap();

		assert!(updated.workflow.is_set(WorkflowFlag::ContractCreated));
		assert!(updated.workflow.is_set(WorkflowFlag::ContractSent));
		assert_eq!(std::fs::read_dir(&outbox).unwrap().count(), 1);
	}

	#[test]
	fn test_primary_must_load() {
		let mut config = ConfigBuilder::new().build();
		config.storage.primary = "file".into();

		let err = OrderflowBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::Config(ref msg) if msg.contains("file")));
	}

	#[test]
	fn test_invalid_backend_table_is_rejected() {
		let mut config = ConfigBuilder::new().build();
		config.email.backend.implementations.insert(
			"outbox".into(),
			toml::Value::Table(toml::Table::new()),
		);

		let err = OrderflowBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::Config(ref msg) if msg.contains("email")));
	}

	#[test]
	fn test_no_known_implementation() {
		let mut config = ConfigBuilder::new().build();
		config.auth.implementations = HashMap::from([(
			"oauth".to_string(),
			toml::Value::Table(toml::Table::new()),
		)]);
		config.auth.primary = "oauth".into();

		let err = OrderflowBuilder::new(config)
			.build(factories())
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}
}
