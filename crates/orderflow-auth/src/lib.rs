//! Credential provider for the order workflow service.
//!
//! Document export and email delivery run on behalf of a signed-in operator.
//! The provider holds the operator's access token and answers whether it is
//! still valid; an expired token reads as signed out.

use async_trait::async_trait;
use orderflow_types::{ConfigSchema, ImplementationRegistry, SecretString};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod session;
}

#[derive(Debug, Error)]
pub enum AuthError {
	/// No token has been stored, or it was cleared.
	#[error("Not authenticated")]
	Unauthenticated,
	#[error("Access token expired")]
	Expired,
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait AuthInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// True while a token is stored and not yet expired.
	async fn is_authenticated(&self) -> bool;

	/// The current token, or why there is none.
	async fn access_token(&self) -> Result<SecretString, AuthError>;

	/// Replaces the stored token; it expires `expires_in` from now.
	async fn store_token(&self, token: SecretString, expires_in: Duration)
		-> Result<(), AuthError>;

	/// Forgets the stored token.
	async fn clear(&self);
}

pub type AuthFactory = fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>;

pub trait AuthRegistry: ImplementationRegistry<Factory = AuthFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, AuthFactory)> {
	use implementations::session;

	vec![(session::Registry::NAME, session::Registry::factory())]
}

pub struct AuthService {
	implementation: Box<dyn AuthInterface>,
}

impl AuthService {
	pub fn new(implementation: Box<dyn AuthInterface>) -> Self {
		Self { implementation }
	}

	pub async fn is_authenticated(&self) -> bool {
		self.implementation.is_authenticated().await
	}

	pub async fn access_token(&self) -> Result<SecretString, AuthError> {
		self.implementation.access_token().await
	}

	pub async fn store_token(
		&self,
		token: SecretString,
		expires_in: Duration,
	) -> Result<(), AuthError> {
		self.implementation.store_token(token, expires_in).await?;
		tracing::info!(expires_in_secs = expires_in.as_secs(), "Stored access token");
		Ok(())
	}

	pub async fn clear(&self) {
		self.implementation.clear().await;
		tracing::info!("Cleared access token");
	}
}
