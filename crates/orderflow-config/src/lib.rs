//! Configuration for the order workflow service.
//!
//! Configuration is read from TOML. `${VAR}` and `${VAR:-default}` references
//! are resolved from the environment before parsing, and a file may pull in
//! other files with `include = ["storage.toml", ...]`. Each top-level section
//! must be defined exactly once across all included files.

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the input; keep the message only.
		ConfigError::Parse(err.message().to_string())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub service: ServiceConfig,
	#[serde(default)]
	pub workflow: WorkflowConfig,
	pub storage: BackendConfig,
	pub documents: BackendConfig,
	pub email: EmailConfig,
	pub auth: BackendConfig,
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Name of this deployment, used in logs.
	pub id: String,
	/// Upper bound for generating one document.
	#[serde(default = "default_document_timeout_seconds")]
	pub document_timeout_seconds: u64,
	/// Upper bound for handing one email to the transport.
	#[serde(default = "default_email_timeout_seconds")]
	pub email_timeout_seconds: u64,
}

fn default_document_timeout_seconds() -> u64 {
	60
}

fn default_email_timeout_seconds() -> u64 {
	30
}

/// Which step list the workflow engine runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowVariant {
	/// Five flags: contract sent/accepted, manual sent/acknowledged, warranty.
	#[default]
	Standard,
	/// Adds a "document created" step before every dispatch.
	Extended,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkflowConfig {
	#[serde(default)]
	pub variant: WorkflowVariant,
	/// Allows putting a concluded order back on hold.
	#[serde(default)]
	pub allow_suspend_concluded: bool,
}

/// A collaborator with pluggable backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Implementation the service uses.
	pub primary: String,
	/// Backend name to its raw configuration table.
	pub implementations: HashMap<String, toml::Value>,
}

impl BackendConfig {
	fn validate(&self, section: &str) -> Result<(), ConfigError> {
		if self.implementations.is_empty() {
			return Err(ConfigError::Validation(format!(
				"At least one {} implementation must be configured",
				section
			)));
		}
		if self.primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"{} primary implementation cannot be empty",
				section
			)));
		}
		if !self.implementations.contains_key(&self.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary {} '{}' not found in implementations",
				section, self.primary
			)));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
	#[serde(flatten)]
	pub backend: BackendConfig,
	/// From address of every dispatch.
	pub sender: String,
	/// Send a blind copy of every dispatch to the sender.
	#[serde(default = "default_bcc_sender")]
	pub bcc_sender: bool,
}

fn default_bcc_sender() -> bool {
	true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Replaces `${VAR}` with the value of `VAR`, or with `default` for
/// `${VAR:-default}` when the variable is unset.
///
/// Inputs above 1MB are rejected before the regex runs.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..whole.start()]);
		result.push_str(&value);
		last = whole.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads the configuration at `path` together with its includes.
	///
	/// Relative includes are resolved against the directory of `path`.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}
		for (name, value) in [
			("document_timeout_seconds", self.service.document_timeout_seconds),
			("email_timeout_seconds", self.service.email_timeout_seconds),
		] {
			if value == 0 || value > 600 {
				return Err(ConfigError::Validation(format!(
					"service.{} must be between 1 and 600",
					name
				)));
			}
		}

		self.storage.validate("storage")?;
		self.documents.validate("documents")?;
		self.email.backend.validate("email")?;
		self.auth.validate("auth")?;

		if !self.email.sender.contains('@') {
			return Err(ConfigError::Validation(format!(
				"email.sender '{}' is not an email address",
				self.email.sender
			)));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("api.port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
