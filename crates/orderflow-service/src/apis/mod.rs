//! Handlers of the HTTP API and the mapping of workflow errors onto HTTP
//! responses.

pub mod order;
pub mod session;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use orderflow_core::WorkflowError;
use orderflow_types::ErrorResponse;
use std::fmt;

/// An error returned by an API handler.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400)
	BadRequest { error_type: String, message: String },
	/// No valid credential for the external services (401)
	Unauthorized { error_type: String, message: String },
	/// Unknown order (404)
	NotFound { error_type: String, message: String },
	/// The workflow refuses the action in the order's current state (409)
	Conflict { error_type: String, message: String },
	/// A collaborator failed (502)
	BadGateway { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::Conflict { .. } => StatusCode::CONFLICT,
			APIError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest { error_type, message }
			| APIError::Unauthorized { error_type, message }
			| APIError::NotFound { error_type, message }
			| APIError::Conflict { error_type, message }
			| APIError::BadGateway { error_type, message }
			| APIError::InternalServerError { error_type, message } => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			details: None,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", self.status_code(), response.error, response.message)
	}
}

impl std::error::Error for APIError {}

impl From<WorkflowError> for APIError {
	fn from(err: WorkflowError) -> Self {
		let message = err.to_string();
		match err {
			WorkflowError::ActionNotPermitted(_) => APIError::Conflict {
				error_type: "ACTION_NOT_PERMITTED".to_string(),
				message,
			},
			WorkflowError::InvalidFlagTransition { .. } => APIError::Conflict {
				error_type: "INVALID_FLAG_TRANSITION".to_string(),
				message,
			},
			WorkflowError::Unauthenticated => APIError::Unauthorized {
				error_type: "UNAUTHENTICATED".to_string(),
				message,
			},
			WorkflowError::DocumentGenerationFailed(_) => APIError::BadGateway {
				error_type: "DOCUMENT_GENERATION_FAILED".to_string(),
				message,
			},
			WorkflowError::EmailDeliveryFailed(_) => APIError::BadGateway {
				error_type: "EMAIL_DELIVERY_FAILED".to_string(),
				message,
			},
			WorkflowError::PersistenceFailed(cause) => APIError::InternalServerError {
				error_type: "PERSISTENCE_FAILED".to_string(),
				message: format!(
					"Email sent but status not saved, verify before retrying: {}",
					cause
				),
			},
			WorkflowError::OrderNotFound(_) => APIError::NotFound {
				error_type: "ORDER_NOT_FOUND".to_string(),
				message,
			},
			WorkflowError::Storage(_) => APIError::InternalServerError {
				error_type: "STORAGE_ERROR".to_string(),
				message,
			},
		}
	}
}

impl IntoResponse for APIError {
	fn into_response(self) -> Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_types::WorkflowFlag;

	#[test]
	fn test_workflow_errors_map_to_status_codes() {
		let cases = [
			(
				WorkflowError::ActionNotPermitted("sendManual".into()),
				StatusCode::CONFLICT,
			),
			(
				WorkflowError::InvalidFlagTransition {
					flag: WorkflowFlag::ManualAcknowledged,
					current: "step 1 (contractSent)".into(),
				},
				StatusCode::CONFLICT,
			),
			(WorkflowError::Unauthenticated, StatusCode::UNAUTHORIZED),
			(
				WorkflowError::DocumentGenerationFailed("timeout".into()),
				StatusCode::BAD_GATEWAY,
			),
			(
				WorkflowError::EmailDeliveryFailed("rejected".into()),
				StatusCode::BAD_GATEWAY,
			),
			(
				WorkflowError::PersistenceFailed("disk full".into()),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
			(
				WorkflowError::OrderNotFound("o-1".into()),
				StatusCode::NOT_FOUND,
			),
			(
				WorkflowError::Storage("corrupt".into()),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
		];

		for (err, status) in cases {
			assert_eq!(APIError::from(err).status_code(), status);
		}
	}

	#[test]
	fn test_persistence_failure_warns_against_blind_retry() {
		let response =
			APIError::from(WorkflowError::PersistenceFailed("disk full".into())).to_error_response();

		assert_eq!(response.error, "PERSISTENCE_FAILED");
		assert!(response.message.contains("verify before retrying"));
		assert!(response.message.contains("disk full"));
	}
}
