//! Session endpoints: hand the service an access token for the document and
//! email backends, or revoke it.

use super::APIError;
use orderflow_auth::AuthService;
use orderflow_types::{SessionRequest, SessionResponse};
use std::time::Duration;

pub async fn sign_in(
	auth: &AuthService,
	request: SessionRequest,
) -> Result<SessionResponse, APIError> {
	auth.store_token(request.access_token, Duration::from_secs(request.expires_in))
		.await
		.map_err(|e| APIError::BadRequest {
			error_type: "INVALID_TOKEN".to_string(),
			message: e.to_string(),
		})?;

	Ok(SessionResponse {
		authenticated: auth.is_authenticated().await,
	})
}

pub async fn sign_out(auth: &AuthService) -> SessionResponse {
	auth.clear().await;
	SessionResponse {
		authenticated: false,
	}
}
