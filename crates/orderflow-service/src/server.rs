//! HTTP server for the order workflow API.
//!
//! Routes live under `/api`. Every handler resolves the order by id before
//! handing it to the controller, so the controller always works from the
//! stored record rather than a client's copy.

use crate::apis::{self, APIError};
use axum::{
	extract::{Path, State},
	http::{header, StatusCode},
	response::{IntoResponse, Json},
	routing::{get, post, put},
	Router,
};
use orderflow_config::ApiConfig;
use orderflow_core::OrderController;
use orderflow_types::{
	AdvanceRequest, ConfirmRequest, OrderDetails, OrderResponse, OrderStats, SessionRequest,
	SessionResponse, Workflow,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub controller: Arc<OrderController>,
}

/// Builds the API router with its middleware.
pub fn router(controller: Arc<OrderController>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", get(handle_list_orders).post(handle_create_order))
				.route(
					"/orders/{id}",
					get(handle_get_order)
						.put(handle_update_order)
						.delete(handle_delete_order),
				)
				.route("/orders/{id}/workflow", put(handle_edit_workflow))
				.route("/orders/{id}/advance", post(handle_advance))
				.route("/orders/{id}/documents/{kind}", get(handle_download))
				.route("/orders/{id}/confirm", post(handle_confirm))
				.route("/orders/{id}/suspension", post(handle_toggle_suspension))
				.route("/orders/{id}/commit", post(handle_commit))
				.route("/stats", get(handle_stats))
				.route("/session", post(handle_sign_in).delete(handle_sign_out)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { controller })
}

/// Serves the API until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	controller: Arc<OrderController>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(controller);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Orderflow API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Logs a failed request before it becomes a response.
fn log_failure(operation: &str, err: APIError) -> APIError {
	if err.status_code().is_server_error() {
		tracing::error!(operation = operation, error = %err, "Request failed");
	} else {
		tracing::warn!(operation = operation, error = %err, "Request refused");
	}
	err
}

async fn handle_list_orders(
	State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, APIError> {
	apis::order::list_orders(&state.controller)
		.await
		.map(Json)
		.map_err(|e| log_failure("list_orders", e))
}

async fn handle_create_order(
	State(state): State<AppState>,
	Json(details): Json<OrderDetails>,
) -> Result<(StatusCode, Json<OrderResponse>), APIError> {
	apis::order::create_order(&state.controller, details)
		.await
		.map(|order| (StatusCode::CREATED, Json(order)))
		.map_err(|e| log_failure("create_order", e))
}

async fn handle_get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::get_order(&state.controller, &id)
		.await
		.map(Json)
		.map_err(|e| log_failure("get_order", e))
}

async fn handle_update_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(details): Json<OrderDetails>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::update_order(&state.controller, &id, details)
		.await
		.map(Json)
		.map_err(|e| log_failure("update_order", e))
}

async fn handle_delete_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, APIError> {
	apis::order::delete_order(&state.controller, &id)
		.await
		.map(|_| StatusCode::NO_CONTENT)
		.map_err(|e| log_failure("delete_order", e))
}

async fn handle_edit_workflow(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(workflow): Json<Workflow>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::edit_workflow(&state.controller, &id, workflow)
		.await
		.map(Json)
		.map_err(|e| log_failure("edit_workflow", e))
}

async fn handle_advance(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<AdvanceRequest>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::advance(&state.controller, &id, request)
		.await
		.map(Json)
		.map_err(|e| log_failure("advance", e))
}

async fn handle_download(
	Path((id, kind)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<impl IntoResponse, APIError> {
	let document = apis::order::download(&state.controller, &id, &kind)
		.await
		.map_err(|e| log_failure("download", e))?;
	let disposition = format!("attachment; filename=\"{}\"", document.filename);
	Ok((
		[
			(header::CONTENT_TYPE, document.mime_type),
			(header::CONTENT_DISPOSITION, disposition),
		],
		document.content,
	))
}

async fn handle_confirm(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<ConfirmRequest>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::confirm(&state.controller, &id, request)
		.await
		.map(Json)
		.map_err(|e| log_failure("confirm", e))
}

async fn handle_toggle_suspension(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::toggle_suspension(&state.controller, &id)
		.await
		.map(Json)
		.map_err(|e| log_failure("toggle_suspension", e))
}

async fn handle_commit(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderResponse>, APIError> {
	apis::order::commit(&state.controller, &id)
		.await
		.map(Json)
		.map_err(|e| log_failure("commit", e))
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<OrderStats>, APIError> {
	apis::order::stats(&state.controller)
		.await
		.map(Json)
		.map_err(|e| log_failure("stats", e))
}

async fn handle_sign_in(
	State(state): State<AppState>,
	Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, APIError> {
	apis::session::sign_in(state.controller.auth(), request)
		.await
		.map(Json)
		.map_err(|e| log_failure("sign_in", e))
}

async fn handle_sign_out(State(state): State<AppState>) -> Json<SessionResponse> {
	Json(apis::session::sign_out(state.controller.auth()).await)
}
