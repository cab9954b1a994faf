//! Request and response bodies of the HTTP API.

use crate::{Order, SecretString, WorkflowFlag};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/orders/{id}/advance`.
///
/// The document is kept as a raw string so an unknown name can be reported as
/// a refused action rather than a malformed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
	pub document: String,
}

/// Body of `POST /api/orders/{id}/confirm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
	pub flag: String,
}

/// Body of `POST /api/session`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
	pub access_token: SecretString,
	/// Token lifetime in seconds.
	pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
	pub authenticated: bool,
}

/// An order together with where it stands in the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
	#[serde(flatten)]
	pub order: Order,
	/// 1-based index of the current step, absent once the workflow is complete.
	pub current_step: Option<usize>,
	/// Flag the current step will set.
	pub next_flag: Option<WorkflowFlag>,
	/// True when an email went out but the resulting flags are not stored yet.
	pub commit_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine readable error code.
	pub error: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}
