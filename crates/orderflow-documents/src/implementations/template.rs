//! Template backend: fills local template files.
//!
//! Each [`TemplateKey`] maps to a file in `template_dir`, `<key>.<extension>`
//! unless the `files` table names another one. The filled text is the
//! document content; its MIME type follows the file extension.

use crate::replacements::{fill, replacements};
use crate::{DocumentError, DocumentFactory, DocumentInterface, DocumentRegistry, TemplateKey};
use async_trait::async_trait;
use orderflow_types::{
	document_name, ConfigSchema, Document, DocumentKind, Field, FieldType, ImplementationRegistry,
	Order, Schema, SecretString, ValidationError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "txt";

pub struct TemplateDocuments {
	template_dir: PathBuf,
	extension: String,
	files: HashMap<TemplateKey, String>,
}

impl TemplateDocuments {
	pub fn new(template_dir: impl Into<PathBuf>) -> Self {
		Self {
			template_dir: template_dir.into(),
			extension: DEFAULT_EXTENSION.to_string(),
			files: HashMap::new(),
		}
	}

	pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
		self.extension = extension.into();
		self
	}

	pub fn with_file(mut self, key: TemplateKey, file: impl Into<String>) -> Self {
		self.files.insert(key, file.into());
		self
	}

	fn template_path(&self, key: TemplateKey) -> PathBuf {
		match self.files.get(&key) {
			Some(file) => self.template_dir.join(file),
			None => self
				.template_dir
				.join(format!("{}.{}", key.as_str(), self.extension)),
		}
	}
}

fn mime_type(path: &Path) -> &'static str {
	match path.extension().and_then(|e| e.to_str()) {
		Some("txt") => "text/plain",
		Some("md") => "text/markdown",
		Some("html") | Some("htm") => "text/html",
		Some("csv") => "text/csv",
		Some("xml") => "application/xml",
		_ => "application/octet-stream",
	}
}

#[async_trait]
impl DocumentInterface for TemplateDocuments {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TemplateDocumentsSchema)
	}

	async fn generate(
		&self,
		order: &Order,
		kind: DocumentKind,
		_access_token: &SecretString,
	) -> Result<Document, DocumentError> {
		let key = TemplateKey::for_order(order, kind);
		let path = self.template_path(key);
		let template = tokio::fs::read_to_string(&path).await.map_err(|e| {
			DocumentError::Template(format!("{} ({}): {}", key.as_str(), path.display(), e))
		})?;

		let content = fill(&template, &replacements(order));
		let extension = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or(DEFAULT_EXTENSION);
		let today = chrono::Local::now().date_naive();

		tracing::debug!(template = %path.display(), kind = %kind, "Template filled");
		Ok(Document {
			kind,
			filename: format!("{}.{}", document_name(order, kind, today), extension),
			mime_type: mime_type(&path).to_string(),
			content: content.into_bytes(),
		})
	}
}

pub struct TemplateDocumentsSchema;

impl ConfigSchema for TemplateDocumentsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let file_fields = TemplateKey::all()
			.map(|key| Field::new(key.as_str(), FieldType::String))
			.collect();

		let schema = Schema::new(
			vec![Field::new("template_dir", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some("") => Err("template_dir cannot be empty".to_string()),
					_ => Ok(()),
				}
			})],
			vec![
				Field::new("extension", FieldType::String),
				Field::new("files", FieldType::Table(Schema::new(vec![], file_fields))),
			],
		);
		schema.validate(config)
	}
}

/// Configuration:
/// - `template_dir`: directory holding the templates (required)
/// - `extension`: extension of default template file names (default "txt")
/// - `files`: optional per-template file names, keyed by
///   `contract_b2b`, `usage_agreement`, `manual`, `warranty`
pub fn create_documents(config: &toml::Value) -> Result<Box<dyn DocumentInterface>, DocumentError> {
	TemplateDocumentsSchema
		.validate(config)
		.map_err(|e| DocumentError::Configuration(e.to_string()))?;

	let template_dir = config
		.get("template_dir")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DocumentError::Configuration("template_dir is required".into()))?;

	let mut documents = TemplateDocuments::new(template_dir);
	if let Some(extension) = config.get("extension").and_then(|v| v.as_str()) {
		documents = documents.with_extension(extension.trim_start_matches('.'));
	}
	if let Some(files) = config.get("files") {
		for key in TemplateKey::all() {
			if let Some(file) = files.get(key.as_str()).and_then(|v| v.as_str()) {
				documents = documents.with_file(key, file);
			}
		}
	}
	Ok(Box::new(documents))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "template";
	type Factory = DocumentFactory;

	fn factory() -> Self::Factory {
		create_documents
	}
}

impl DocumentRegistry for Registry {}
