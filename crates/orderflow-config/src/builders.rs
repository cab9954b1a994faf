//! Fluent construction of [`Config`] values for tests.

use crate::{BackendConfig, Config, EmailConfig, ServiceConfig, WorkflowConfig, WorkflowVariant};
use std::collections::HashMap;

/// Builds a [`Config`] with in-process backends: memory storage, template
/// documents, outbox email and a session token.
///
/// The template and outbox directories have no default and must be set by
/// tests that build the collaborators.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	document_timeout_seconds: u64,
	email_timeout_seconds: u64,
	workflow: WorkflowConfig,
	template_dir: String,
	outbox_dir: String,
	sender: String,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "orderflow-test".to_string(),
			document_timeout_seconds: 5,
			email_timeout_seconds: 5,
			workflow: WorkflowConfig::default(),
			template_dir: "./templates".to_string(),
			outbox_dir: "./outbox".to_string(),
			sender: "office@example.com".to_string(),
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn timeouts(mut self, document_seconds: u64, email_seconds: u64) -> Self {
		self.document_timeout_seconds = document_seconds;
		self.email_timeout_seconds = email_seconds;
		self
	}

	pub fn variant(mut self, variant: WorkflowVariant) -> Self {
		self.workflow.variant = variant;
		self
	}

	pub fn allow_suspend_concluded(mut self, allow: bool) -> Self {
		self.workflow.allow_suspend_concluded = allow;
		self
	}

	pub fn template_dir(mut self, dir: impl Into<String>) -> Self {
		self.template_dir = dir.into();
		self
	}

	pub fn outbox_dir(mut self, dir: impl Into<String>) -> Self {
		self.outbox_dir = dir.into();
		self
	}

	pub fn sender(mut self, sender: impl Into<String>) -> Self {
		self.sender = sender.into();
		self
	}

	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
				document_timeout_seconds: self.document_timeout_seconds,
				email_timeout_seconds: self.email_timeout_seconds,
			},
			workflow: self.workflow,
			storage: single_backend("memory", toml::Table::new()),
			documents: single_backend("template", table("template_dir", self.template_dir)),
			email: EmailConfig {
				backend: single_backend("outbox", table("directory", self.outbox_dir)),
				sender: self.sender,
				bcc_sender: true,
			},
			auth: single_backend("session", toml::Table::new()),
			api: None,
		}
	}
}

fn table(key: &str, value: String) -> toml::Table {
	let mut table = toml::Table::new();
	table.insert(key.to_string(), toml::Value::String(value));
	table
}

fn single_backend(name: &str, config: toml::Table) -> BackendConfig {
	BackendConfig {
		primary: name.to_string(),
		implementations: HashMap::from([(name.to_string(), toml::Value::Table(config))]),
	}
}
