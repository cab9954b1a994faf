//! HTTP backend: posts each message as JSON to a mail API.
//!
//! The request carries the operator's token as a bearer credential and the
//! attachments base64-encoded. Any 2xx answer counts as accepted.

use crate::wire::WireMessage;
use crate::{EmailError, EmailFactory, EmailInterface, EmailRegistry};
use async_trait::async_trait;
use orderflow_types::{
	ConfigSchema, EmailMessage, Field, FieldType, ImplementationRegistry, Schema, SecretString,
	ValidationError,
};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub struct HttpEmail {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpEmail {
	pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EmailError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| EmailError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}
}

fn classify(err: reqwest::Error) -> EmailError {
	if err.is_timeout() {
		EmailError::Timeout
	} else {
		EmailError::Delivery(err.to_string())
	}
}

#[async_trait]
impl EmailInterface for HttpEmail {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpEmailSchema)
	}

	async fn send(
		&self,
		message: &EmailMessage,
		access_token: &SecretString,
	) -> Result<(), EmailError> {
		let response = self
			.client
			.post(&self.endpoint)
			.bearer_auth(access_token.expose_secret())
			.json(&WireMessage::from(message))
			.send()
			.await
			.map_err(classify)?;

		let status = response.status();
		if status.is_success() {
			return Ok(());
		}

		let body = response.text().await.unwrap_or_default();
		tracing::warn!(status = %status, to = %message.to, "Mail API refused message");
		Err(EmailError::Delivery(format!("mail API returned {}: {}", status, body)))
	}
}

pub struct HttpEmailSchema;

impl ConfigSchema for HttpEmailSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("endpoint must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(600),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Configuration:
/// - `endpoint`: URL messages are posted to (required)
/// - `timeout_seconds`: per-request timeout (default 30)
pub fn create_email(config: &toml::Value) -> Result<Box<dyn EmailInterface>, EmailError> {
	HttpEmailSchema
		.validate(config)
		.map_err(|e| EmailError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| EmailError::Configuration("endpoint is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpEmail::new(
		endpoint,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = EmailFactory;

	fn factory() -> Self::Factory {
		create_email
	}
}

impl EmailRegistry for Registry {}
