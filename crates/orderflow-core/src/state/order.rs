//! Typed order persistence.
//!
//! Wraps the storage service with the orders namespace and stamps every
//! write with the time of the mutation.

use orderflow_storage::{StorageError, StorageService};
use orderflow_types::{current_timestamp, Order, StorageKey};
use std::sync::Arc;

/// The order store as the controller sees it: list, get, upsert, delete.
pub struct OrderStore {
	storage: Arc<StorageService>,
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get(&self, order_id: &str) -> Result<Option<Order>, StorageError> {
		self.storage
			.find(StorageKey::Orders.as_str(), order_id)
			.await
	}

	/// Every stored order, newest first by creation date.
	pub async fn list(&self) -> Result<Vec<Order>, StorageError> {
		let mut orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await?;
		orders.sort_by(|a, b| {
			b.details
				.created_on
				.cmp(&a.details.created_on)
				.then_with(|| b.updated_at.cmp(&a.updated_at))
				.then_with(|| a.id.cmp(&b.id))
		});
		Ok(orders)
	}

	/// Inserts or replaces `order` and returns it as written.
	pub async fn upsert(&self, mut order: Order) -> Result<Order, StorageError> {
		order.updated_at = current_timestamp();
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await?;
		Ok(order)
	}

	pub async fn delete(&self, order_id: &str) -> Result<(), StorageError> {
		self.storage
			.remove(StorageKey::Orders.as_str(), order_id)
			.await
	}
}
