//! Registry of every backend implementation compiled into the binary.
//!
//! Each collaborator crate lists its implementations through
//! `get_all_implementations`; the registry collects them once so the
//! configuration can select backends by name.

use orderflow_auth::AuthFactory;
use orderflow_config::Config;
use orderflow_core::{OrderController, OrderflowBuilder, OrderflowFactories};
use orderflow_documents::DocumentFactory;
use orderflow_email::EmailFactory;
use orderflow_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub documents: HashMap<String, DocumentFactory>,
	pub email: HashMap<String, EmailFactory>,
	pub auth: HashMap<String, AuthFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			documents: HashMap::new(),
			email: HashMap::new(),
			auth: HashMap::new(),
		}
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// The registry, populated on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in orderflow_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}
		for (name, factory) in orderflow_documents::get_all_implementations() {
			tracing::debug!("Registering documents implementation: {}", name);
			registry.documents.insert(name.to_string(), factory);
		}
		for (name, factory) in orderflow_email::get_all_implementations() {
			tracing::debug!("Registering email implementation: {}", name);
			registry.email.insert(name.to_string(), factory);
		}
		for (name, factory) in orderflow_auth::get_all_implementations() {
			tracing::debug!("Registering auth implementation: {}", name);
			registry.auth.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Selects the registered factories named in a configuration section.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the order controller for `config` from the registered backends.
pub fn build_controller_from_config(
	config: Config,
) -> Result<OrderController, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let document_factories = build_factories!(
		registry,
		config.documents.implementations,
		documents,
		"documents"
	);
	let email_factories = build_factories!(
		registry,
		config.email.backend.implementations,
		email,
		"email"
	);
	let auth_factories = build_factories!(registry, config.auth.implementations, auth, "auth");

	let factories = OrderflowFactories {
		storage_factories,
		document_factories,
		email_factories,
		auth_factories,
	};

	Ok(OrderflowBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_config::builders::ConfigBuilder;

	#[test]
	fn test_registry_lists_every_backend() {
		let registry = get_registry();

		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
		assert!(registry.documents.contains_key("template"));
		assert!(registry.documents.contains_key("http"));
		assert!(registry.email.contains_key("outbox"));
		assert!(registry.email.contains_key("http"));
		assert!(registry.auth.contains_key("session"));
	}

	#[test]
	fn test_build_controller_with_minimal_config() {
		let dir = tempfile::tempdir().unwrap();
		let config = ConfigBuilder::new()
			.template_dir(dir.path().display().to_string())
			.outbox_dir(dir.path().join("outbox").display().to_string())
			.build();

		let controller = build_controller_from_config(config);
		assert!(controller.is_ok(), "Failed to build: {:?}", controller.err());
	}

	#[test]
	fn test_unknown_implementation_names_alternatives() {
		let mut config = ConfigBuilder::new().build();
		config.storage.implementations.insert(
			"postgres".to_string(),
			toml::Value::Table(toml::Table::new()),
		);

		let err = build_controller_from_config(config).err().unwrap();
		let message = err.to_string();
		assert!(message.contains("postgres"));
		assert!(message.contains("file, memory"));
	}
}
