//! HTTP backend: asks a remote export service to render a PDF.
//!
//! The service owns the templates; this backend sends the template id, the
//! document name and the placeholder values, and receives the exported bytes.

use crate::replacements::replacements;
use crate::{DocumentError, DocumentFactory, DocumentInterface, DocumentRegistry, TemplateKey};
use async_trait::async_trait;
use orderflow_types::{
	document_name, ConfigSchema, Document, DocumentKind, Field, FieldType, ImplementationRegistry,
	Order, Schema, SecretString, ValidationError, PDF_MIME_TYPE,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
	template_id: &'a str,
	name: &'a str,
	replacements: BTreeMap<&'static str, String>,
}

pub struct HttpDocuments {
	client: reqwest::Client,
	endpoint: String,
	templates: HashMap<TemplateKey, String>,
}

impl HttpDocuments {
	pub fn new(
		endpoint: impl Into<String>,
		templates: HashMap<TemplateKey, String>,
		timeout: Duration,
	) -> Result<Self, DocumentError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| DocumentError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
			templates,
		})
	}
}

fn classify(err: reqwest::Error) -> DocumentError {
	if err.is_timeout() {
		DocumentError::Timeout
	} else {
		DocumentError::Export(err.to_string())
	}
}

#[async_trait]
impl DocumentInterface for HttpDocuments {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpDocumentsSchema)
	}

	async fn generate(
		&self,
		order: &Order,
		kind: DocumentKind,
		access_token: &SecretString,
	) -> Result<Document, DocumentError> {
		let key = TemplateKey::for_order(order, kind);
		let template_id = self
			.templates
			.get(&key)
			.ok_or_else(|| DocumentError::Template(format!("no template id for {}", key.as_str())))?;
		let name = document_name(order, kind, chrono::Local::now().date_naive());

		let response = self
			.client
			.post(&self.endpoint)
			.bearer_auth(access_token.expose_secret())
			.json(&ExportRequest {
				template_id,
				name: &name,
				replacements: replacements(order),
			})
			.send()
			.await
			.map_err(classify)?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = %status, template = %key.as_str(), "Export service refused request");
			return Err(DocumentError::Export(format!(
				"export service returned {}: {}",
				status, body
			)));
		}

		let content = response.bytes().await.map_err(classify)?;
		if content.is_empty() {
			return Err(DocumentError::Export("export service returned no content".into()));
		}

		Ok(Document {
			kind,
			filename: format!("{}.pdf", name),
			mime_type: PDF_MIME_TYPE.to_string(),
			content: content.to_vec(),
		})
	}
}

pub struct HttpDocumentsSchema;

impl ConfigSchema for HttpDocumentsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let template_ids = TemplateKey::all()
			.map(|key| Field::new(key.as_str(), FieldType::String))
			.collect();

		let schema = Schema::new(
			vec![
				Field::new("endpoint", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("endpoint must be an http(s) URL".to_string()),
					}
				}),
				Field::new("templates", FieldType::Table(Schema::new(template_ids, vec![]))),
			],
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
/// - `endpoint`: URL of the export service (required)
/// - `templates`: template id per `contract_b2b`, `usage_agreement`,
///   `manual`, `warranty` (required)
/// - `timeout_seconds`: per-request timeout (default 60)
pub fn create_documents(config: &toml::Value) -> Result<Box<dyn DocumentInterface>, DocumentError> {
	HttpDocumentsSchema
		.validate(config)
		.map_err(|e| DocumentError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DocumentError::Configuration("endpoint is required".into()))?;
	let templates = config
		.get("templates")
		.ok_or_else(|| DocumentError::Configuration("templates is required".into()))?;
	let templates = TemplateKey::all()
		.filter_map(|key| {
			templates
				.get(key.as_str())
				.and_then(|v| v.as_str())
				.map(|id| (key, id.to_string()))
		})
		.collect();
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpDocuments::new(
		endpoint,
		templates,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = DocumentFactory;

	fn factory() -> Self::Factory {
		create_documents
	}
}

impl DocumentRegistry for Registry {}
