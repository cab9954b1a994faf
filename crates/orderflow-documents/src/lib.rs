//! Document generator for the order workflow service.
//!
//! Turns an order into the contract, manual or warranty document that is
//! mailed to the customer. Every backend fills the same set of
//! `{{placeholder}}` values (see [`replacements`]) into a template chosen by
//! [`TemplateKey::for_order`].

use async_trait::async_trait;
use orderflow_auth::{AuthError, AuthService};
use orderflow_types::{
	truncate_id, ConfigSchema, ContractType, Document, DocumentKind, ImplementationRegistry, Order,
	SecretString,
};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod http;
	pub mod template;
}

pub mod replacements;

#[derive(Debug, Error)]
pub enum DocumentError {
	#[error("Template unavailable: {0}")]
	Template(String),
	#[error("Export failed: {0}")]
	Export(String),
	#[error("Export timed out")]
	Timeout,
	#[error("Credentials unavailable: {0}")]
	Credentials(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<AuthError> for DocumentError {
	fn from(err: AuthError) -> Self {
		DocumentError::Credentials(err.to_string())
	}
}

/// The four templates a deployment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
	ContractB2b,
	/// Contract variant for leasing customers.
	UsageAgreement,
	Manual,
	Warranty,
}

impl TemplateKey {
	/// Name of the template in backend configuration.
	pub fn as_str(&self) -> &'static str {
		match self {
			TemplateKey::ContractB2b => "contract_b2b",
			TemplateKey::UsageAgreement => "usage_agreement",
			TemplateKey::Manual => "manual",
			TemplateKey::Warranty => "warranty",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::ContractB2b,
			Self::UsageAgreement,
			Self::Manual,
			Self::Warranty,
		]
		.into_iter()
	}

	pub fn for_order(order: &Order, kind: DocumentKind) -> Self {
		match (kind, order.details.contract_type) {
			(DocumentKind::Contract, ContractType::Grenke) => TemplateKey::UsageAgreement,
			(DocumentKind::Contract, _) => TemplateKey::ContractB2b,
			(DocumentKind::Manual, _) => TemplateKey::Manual,
			(DocumentKind::Warranty, _) => TemplateKey::Warranty,
		}
	}
}

#[async_trait]
pub trait DocumentInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Produces the document of `kind` for `order`. Calling it twice for the
	/// same order yields the same content.
	async fn generate(
		&self,
		order: &Order,
		kind: DocumentKind,
		access_token: &SecretString,
	) -> Result<Document, DocumentError>;
}

pub type DocumentFactory = fn(&toml::Value) -> Result<Box<dyn DocumentInterface>, DocumentError>;

pub trait DocumentRegistry: ImplementationRegistry<Factory = DocumentFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, DocumentFactory)> {
	use implementations::{http, template};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(template::Registry::NAME, template::Registry::factory()),
	]
}

pub struct DocumentService {
	implementation: Box<dyn DocumentInterface>,
	auth: Arc<AuthService>,
}

impl DocumentService {
	pub fn new(implementation: Box<dyn DocumentInterface>, auth: Arc<AuthService>) -> Self {
		Self {
			implementation,
			auth,
		}
	}

	pub async fn generate(
		&self,
		order: &Order,
		kind: DocumentKind,
	) -> Result<Document, DocumentError> {
		let token = self.auth.access_token().await?;
		let document = self.implementation.generate(order, kind, &token).await?;
		tracing::info!(
			order_id = %truncate_id(&order.id),
			kind = %kind,
			filename = %document.filename,
			size = document.content.len(),
			"Document generated"
		);
		Ok(document)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_types::testing::sample_order;

	#[test]
	fn test_contract_template_follows_contract_type() {
		let mut order = sample_order("a");
		assert_eq!(
			TemplateKey::for_order(&order, DocumentKind::Contract),
			TemplateKey::UsageAgreement
		);
		order.details.contract_type = ContractType::New;
		assert_eq!(
			TemplateKey::for_order(&order, DocumentKind::Contract),
			TemplateKey::ContractB2b
		);
		assert_eq!(
			TemplateKey::for_order(&order, DocumentKind::Warranty),
			TemplateKey::Warranty
		);
	}
}
