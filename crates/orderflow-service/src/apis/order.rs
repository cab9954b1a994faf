//! Order endpoints.
//!
//! Requests name documents and flags by their wire names. Names the workflow
//! does not know are refused like any other action the workflow forbids.

use super::APIError;
use orderflow_core::{OrderController, WorkflowError};
use orderflow_types::{
	truncate_id, AdvanceRequest, ConfirmRequest, Document, DocumentKind, OrderDetails,
	OrderResponse, OrderStats, Workflow, WorkflowFlag,
};
use tracing::info;

pub async fn list_orders(controller: &OrderController) -> Result<Vec<OrderResponse>, APIError> {
	let orders = controller.list_orders().await?;
	Ok(orders
		.into_iter()
		.map(|order| controller.describe(order))
		.collect())
}

pub async fn create_order(
	controller: &OrderController,
	details: OrderDetails,
) -> Result<OrderResponse, APIError> {
	let order = controller.create_order(details).await?;
	info!(order_id = %truncate_id(&order.id), company = %order.details.company_name, "Created order");
	Ok(controller.describe(order))
}

pub async fn get_order(
	controller: &OrderController,
	order_id: &str,
) -> Result<OrderResponse, APIError> {
	let order = controller.get_order(order_id).await?;
	Ok(controller.describe(order))
}

pub async fn update_order(
	controller: &OrderController,
	order_id: &str,
	details: OrderDetails,
) -> Result<OrderResponse, APIError> {
	let order = controller.update_order(order_id, details).await?;
	Ok(controller.describe(order))
}

pub async fn delete_order(controller: &OrderController, order_id: &str) -> Result<(), APIError> {
	Ok(controller.delete_order(order_id).await?)
}

pub async fn edit_workflow(
	controller: &OrderController,
	order_id: &str,
	workflow: Workflow,
) -> Result<OrderResponse, APIError> {
	let order = controller.edit_workflow(order_id, workflow).await?;
	Ok(controller.describe(order))
}

/// Dispatches the requested document.
pub async fn advance(
	controller: &OrderController,
	order_id: &str,
	request: AdvanceRequest,
) -> Result<OrderResponse, APIError> {
	let kind: DocumentKind = request
		.document
		.parse()
		.map_err(WorkflowError::ActionNotPermitted)?;
	let order = controller.get_order(order_id).await?;

	let order = controller.advance(&order, kind).await?;
	info!(order_id = %truncate_id(order_id), document = %kind, status = %order.status, "Document dispatched");
	Ok(controller.describe(order))
}

/// Renders a document for printing or download without emailing it.
pub async fn download(
	controller: &OrderController,
	order_id: &str,
	kind: &str,
) -> Result<Document, APIError> {
	let kind: DocumentKind = kind.parse().map_err(WorkflowError::ActionNotPermitted)?;
	Ok(controller.generate_document(order_id, kind).await?)
}

/// Records a customer confirmation.
pub async fn confirm(
	controller: &OrderController,
	order_id: &str,
	request: ConfirmRequest,
) -> Result<OrderResponse, APIError> {
	let flag: WorkflowFlag = request
		.flag
		.parse()
		.map_err(WorkflowError::ActionNotPermitted)?;
	let order = controller.get_order(order_id).await?;

	let order = controller.set_manual_confirmation(&order, flag).await?;
	Ok(controller.describe(order))
}

pub async fn toggle_suspension(
	controller: &OrderController,
	order_id: &str,
) -> Result<OrderResponse, APIError> {
	let order = controller.get_order(order_id).await?;
	let order = controller.toggle_suspension(&order).await?;
	info!(order_id = %truncate_id(order_id), status = %order.status, "Suspension toggled");
	Ok(controller.describe(order))
}

/// Retries storing the flags of a dispatch whose email already went out.
pub async fn commit(
	controller: &OrderController,
	order_id: &str,
) -> Result<OrderResponse, APIError> {
	let order = controller.commit_pending(order_id).await?;
	Ok(controller.describe(order))
}

pub async fn stats(controller: &OrderController) -> Result<OrderStats, APIError> {
	Ok(controller.stats().await?)
}
