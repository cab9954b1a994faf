//! Session token backend.
//!
//! Keeps a single bearer token in memory together with its expiry instant.
//! A token can be seeded from configuration for unattended deployments;
//! otherwise the operator signs in through the API.

use crate::{AuthError, AuthFactory, AuthInterface, AuthRegistry};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use orderflow_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Lifetime of a token seeded from configuration when none is given.
const DEFAULT_SEEDED_LIFETIME: Duration = Duration::from_secs(3600);

struct SessionToken {
	token: SecretString,
	expires_at: Instant,
}

impl SessionToken {
	fn is_expired(&self) -> bool {
		Instant::now() >= self.expires_at
	}
}

#[derive(Default)]
pub struct SessionAuth {
	current: ArcSwapOption<SessionToken>,
}

impl SessionAuth {
	pub fn new() -> Self {
		Self::default()
	}

	fn put(&self, token: SecretString, expires_in: Duration) {
		self.current.store(Some(Arc::new(SessionToken {
			token,
			expires_at: Instant::now() + expires_in,
		})));
	}
}

#[async_trait]
impl AuthInterface for SessionAuth {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SessionAuthSchema)
	}

	async fn is_authenticated(&self) -> bool {
		self.current
			.load()
			.as_ref()
			.is_some_and(|session| !session.is_expired())
	}

	async fn access_token(&self) -> Result<SecretString, AuthError> {
		match self.current.load().as_ref() {
			None => Err(AuthError::Unauthenticated),
			Some(session) if session.is_expired() => Err(AuthError::Expired),
			Some(session) => Ok(session.token.clone()),
		}
	}

	async fn store_token(
		&self,
		token: SecretString,
		expires_in: Duration,
	) -> Result<(), AuthError> {
		if token.is_empty() {
			return Err(AuthError::InvalidToken("token is empty".into()));
		}
		if expires_in.is_zero() {
			return Err(AuthError::InvalidToken("token is already expired".into()));
		}
		self.put(token, expires_in);
		Ok(())
	}

	async fn clear(&self) {
		self.current.store(None);
	}
}

pub struct SessionAuthSchema;

impl ConfigSchema for SessionAuthSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("access_token", FieldType::String),
				Field::new(
					"expires_in_seconds",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Configuration:
/// - `access_token`: token to start with; empty or absent starts signed out
/// - `expires_in_seconds`: lifetime of that token (default 3600)
pub fn create_auth(config: &toml::Value) -> Result<Box<dyn AuthInterface>, AuthError> {
	SessionAuthSchema
		.validate(config)
		.map_err(|e| AuthError::Configuration(e.to_string()))?;

	let auth = SessionAuth::new();
	if let Some(token) = config
		.get("access_token")
		.and_then(|v| v.as_str())
		.filter(|t| !t.is_empty())
	{
		let lifetime = config
			.get("expires_in_seconds")
			.and_then(|v| v.as_integer())
			.map(|secs| Duration::from_secs(secs as u64))
			.unwrap_or(DEFAULT_SEEDED_LIFETIME);
		auth.put(SecretString::from(token), lifetime);
	}
	Ok(Box::new(auth))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "session";
	type Factory = AuthFactory;

	fn factory() -> Self::Factory {
		create_auth
	}
}

impl AuthRegistry for Registry {}
