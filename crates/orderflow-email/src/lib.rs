//! Email sender for the order workflow service.
//!
//! Dispatches a generated document to the order's contact address. Backends
//! implement [`EmailInterface`]; [`EmailService`] composes the message,
//! attaches the sender's blind copy and supplies the operator's access token.

use async_trait::async_trait;
use orderflow_auth::{AuthError, AuthService};
use orderflow_types::{
	truncate_id, ConfigSchema, Document, EmailMessage, ImplementationRegistry, Order, SecretString,
};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod http;
	pub mod outbox;
}

mod wire;

#[derive(Debug, Error)]
pub enum EmailError {
	/// The transport answered and refused the message.
	#[error("Delivery failed: {0}")]
	Delivery(String),
	/// The transport did not answer in time; the message may or may not
	/// have been sent.
	#[error("Delivery timed out")]
	Timeout,
	#[error("Credentials unavailable: {0}")]
	Credentials(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<AuthError> for EmailError {
	fn from(err: AuthError) -> Self {
		EmailError::Credentials(err.to_string())
	}
}

#[async_trait]
pub trait EmailInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Hands the message to the transport. Returns once the transport has
	/// accepted it.
	async fn send(
		&self,
		message: &EmailMessage,
		access_token: &SecretString,
	) -> Result<(), EmailError>;
}

pub type EmailFactory = fn(&toml::Value) -> Result<Box<dyn EmailInterface>, EmailError>;

pub trait EmailRegistry: ImplementationRegistry<Factory = EmailFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, EmailFactory)> {
	use implementations::{http, outbox};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(outbox::Registry::NAME, outbox::Registry::factory()),
	]
}

pub struct EmailService {
	implementation: Box<dyn EmailInterface>,
	auth: Arc<AuthService>,
	sender: String,
	bcc_sender: bool,
}

impl EmailService {
	pub fn new(
		implementation: Box<dyn EmailInterface>,
		auth: Arc<AuthService>,
		sender: impl Into<String>,
		bcc_sender: bool,
	) -> Self {
		Self {
			implementation,
			auth,
			sender: sender.into(),
			bcc_sender,
		}
	}

	/// Builds the dispatch email for `document`.
	pub fn compose(&self, order: &Order, document: Document) -> EmailMessage {
		let bcc = if self.bcc_sender {
			vec![self.sender.clone()]
		} else {
			Vec::new()
		};
		EmailMessage::for_document(order, document, self.sender.clone(), bcc)
	}

	pub async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
		let token = self.auth.access_token().await?;
		self.implementation.send(message, &token).await?;
		Ok(())
	}

	/// Composes and sends the dispatch email for `document`.
	pub async fn send_document(&self, order: &Order, document: Document) -> Result<(), EmailError> {
		let message = self.compose(order, document);
		self.send(&message).await?;
		tracing::info!(
			order_id = %truncate_id(&order.id),
			recipient = %message.to,
			subject = %message.subject,
			"Email sent"
		);
		Ok(())
	}
}
