//! File-based storage backend.
//!
//! Each record lives in `<storage_path>/<namespace>/<id>.json`. Writes go to a
//! temporary file that is renamed over the target, so a crash never leaves a
//! half-written record behind. An exclusive lock on `<storage_path>/.lock`
//! keeps a second process from writing to the same directory.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use orderflow_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::fs;

const EXTENSION: &str = "json";

pub struct FileStorage {
	base_path: PathBuf,
	/// Held for the lifetime of the backend; released on drop.
	_lock: File,
}

impl FileStorage {
	/// Opens (creating if needed) the storage directory and locks it.
	pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let base_path = base_path.into();
		std::fs::create_dir_all(&base_path).map_err(|e| StorageError::Backend(e.to_string()))?;

		let lock = File::create(base_path.join(".lock"))
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		lock.try_lock_exclusive().map_err(|_| {
			StorageError::Backend(format!(
				"storage directory {} is in use by another process",
				base_path.display()
			))
		})?;

		Ok(Self {
			base_path,
			_lock: lock,
		})
	}

	/// Maps `namespace:id` to its file, rejecting keys that would escape the
	/// namespace directory.
	fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
		let (namespace, id) = split_key(key)?;
		if id.is_empty() || !is_safe_segment(id) {
			return Err(StorageError::Backend(format!("invalid storage key '{}'", key)));
		}
		Ok(self
			.base_path
			.join(namespace)
			.join(format!("{}.{}", id, EXTENSION)))
	}
}

fn split_key(key: &str) -> Result<(&str, &str), StorageError> {
	match key.split_once(':') {
		Some((namespace, id)) if !namespace.is_empty() && is_safe_segment(namespace) => {
			Ok((namespace, id))
		},
		_ => Err(StorageError::Backend(format!("invalid storage key '{}'", key))),
	}
}

fn is_safe_segment(segment: &str) -> bool {
	segment != "." && segment != ".." && !segment.contains(['/', '\\', ':', '\0'])
}

fn backend(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

async fn write_atomic(path: &Path, value: &[u8]) -> Result<(), StorageError> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await.map_err(backend)?;
	}
	let temp_path = path.with_extension("tmp");
	fs::write(&temp_path, value).await.map_err(backend)?;
	fs::rename(&temp_path, path).await.map_err(backend)
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.path_for(key)?;
		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		write_atomic(&path, &value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.path_for(key)?;
		fs::try_exists(&path).await.map_err(backend)
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let (namespace, id_prefix) = split_key(prefix)?;
		let dir = self.base_path.join(namespace);

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend(e)),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend)? {
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
				continue;
			}
			match path.file_stem().and_then(|stem| stem.to_str()) {
				Some(id) if id.starts_with(id_prefix) => {
					keys.push(format!("{}:{}", namespace, id));
				},
				Some(_) => {},
				None => {
					tracing::debug!(path = %path.display(), "Skipping non UTF-8 file name");
				},
			}
		}
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if path.trim().is_empty() => {
						Err("storage_path cannot be empty".to_string())
					},
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Configuration:
/// - `storage_path`: directory holding the records (default `./data/storage`)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::open(storage_path)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
