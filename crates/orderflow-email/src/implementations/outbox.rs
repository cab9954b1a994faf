//! Outbox backend: every message becomes a JSON file in a directory.
//!
//! Nothing leaves the machine. Used in development and by tests that need
//! to look at what would have been sent.

use crate::wire::WireMessage;
use crate::{EmailError, EmailFactory, EmailInterface, EmailRegistry};
use async_trait::async_trait;
use orderflow_types::{
	current_timestamp, ConfigSchema, EmailMessage, Field, FieldType, ImplementationRegistry,
	Schema, SecretString, ValidationError,
};
use std::path::PathBuf;
use tokio::fs;

pub struct OutboxEmail {
	directory: PathBuf,
}

impl OutboxEmail {
	pub fn new(directory: impl Into<PathBuf>) -> Self {
		Self {
			directory: directory.into(),
		}
	}
}

#[async_trait]
impl EmailInterface for OutboxEmail {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(OutboxEmailSchema)
	}

	async fn send(
		&self,
		message: &EmailMessage,
		_access_token: &SecretString,
	) -> Result<(), EmailError> {
		fs::create_dir_all(&self.directory)
			.await
			.map_err(|e| EmailError::Delivery(e.to_string()))?;

		let body = serde_json::to_vec_pretty(&WireMessage::from(message))
			.map_err(|e| EmailError::Delivery(e.to_string()))?;
		let path = self.directory.join(format!(
			"{}-{}.json",
			current_timestamp(),
			uuid::Uuid::new_v4().simple()
		));
		fs::write(&path, body)
			.await
			.map_err(|e| EmailError::Delivery(e.to_string()))?;

		tracing::debug!(path = %path.display(), to = %message.to, "Message written to outbox");
		Ok(())
	}
}

pub struct OutboxEmailSchema;

impl ConfigSchema for OutboxEmailSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![Field::new("directory", FieldType::String)], vec![]).validate(config)
	}
}

/// Configuration:
/// - `directory`: where message files are written (required)
pub fn create_email(config: &toml::Value) -> Result<Box<dyn EmailInterface>, EmailError> {
	OutboxEmailSchema
		.validate(config)
		.map_err(|e| EmailError::Configuration(e.to_string()))?;

	let directory = config
		.get("directory")
		.and_then(|v| v.as_str())
		.ok_or_else(|| EmailError::Configuration("directory is required".into()))?;
	Ok(Box::new(OutboxEmail::new(directory)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "outbox";
	type Factory = EmailFactory;

	fn factory() -> Self::Factory {
		create_email
	}
}

impl EmailRegistry for Registry {}
