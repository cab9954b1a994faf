//! Self-registration of backend implementations.

/// Implemented by every backend module so the builder can look it up by the
/// name used in configuration.
///
/// `NAME` matches the key under `implementations`, e.g. `"file"` for
/// `storage.implementations.file` or `"outbox"` for
/// `email.implementations.outbox`.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	/// Factory signature of the owning collaborator, such as `StorageFactory`.
	type Factory;

	fn factory() -> Self::Factory;
}
