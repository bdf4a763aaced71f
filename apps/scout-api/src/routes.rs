use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scout_domain::status::{Feedback, RunStatus};
use scout_service::{Error as ServiceError, NewRun, PageSlice, StartOutcome};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search/runs", post(create_run))
		.route("/v1/search/start", post(start))
		.route("/v1/search/page", post(read_page))
		.route("/v1/search/status", get(run_status))
		.route("/v1/search/stop", post(stop))
		.route("/v1/search/feedback", post(feedback))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct CreateRunRequest {
	query_id: Uuid,
	query_text: String,
	#[serde(default)]
	criteria: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateRunResponse {
	run_id: Uuid,
}

async fn create_run(
	State(state): State<AppState>,
	Json(payload): Json<CreateRunRequest>,
) -> Result<Json<CreateRunResponse>, ApiError> {
	let run_id = state
		.service
		.create_run(NewRun {
			id: Uuid::new_v4(),
			query_id: payload.query_id,
			query_text: payload.query_text,
			criteria: payload.criteria,
		})
		.await?;

	Ok(Json(CreateRunResponse { run_id }))
}

#[derive(Debug, Deserialize)]
struct StartRequest {
	run_id: Uuid,
	#[serde(default)]
	page_idx: i32,
}

async fn start(
	State(state): State<AppState>,
	Json(payload): Json<StartRequest>,
) -> Result<Json<StartOutcome>, ApiError> {
	let outcome = state.service.start(payload.run_id, payload.page_idx).await?;

	Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct PageRequest {
	run_id: Uuid,
	#[serde(default)]
	page_idx: i32,
}

async fn read_page(
	State(state): State<AppState>,
	Json(payload): Json<PageRequest>,
) -> Result<Json<PageSlice>, ApiError> {
	let slice = state.service.read_page(payload.run_id, payload.page_idx).await?;

	Ok(Json(slice))
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
	run_id: Uuid,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
	run_id: Uuid,
	status: RunStatus,
}

async fn run_status(
	State(state): State<AppState>,
	axum::extract::Query(query): axum::extract::Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
	let status = state.service.run_status(query.run_id).await?;

	Ok(Json(StatusResponse { run_id: query.run_id, status }))
}

#[derive(Debug, Deserialize)]
struct StopRequest {
	run_id: Uuid,
}

#[derive(Debug, Serialize)]
struct StopResponse {
	run_id: Uuid,
	stopped: bool,
}

async fn stop(
	State(state): State<AppState>,
	Json(payload): Json<StopRequest>,
) -> Result<Json<StopResponse>, ApiError> {
	state.service.stop(payload.run_id).await?;

	Ok(Json(StopResponse { run_id: payload.run_id, stopped: true }))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
	run_id: Uuid,
	feedback: Feedback,
}

async fn feedback(
	State(state): State<AppState>,
	Json(payload): Json<FeedbackRequest>,
) -> Result<StatusCode, ApiError> {
	state.service.set_feedback(payload.run_id, payload.feedback).await?;

	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::InvalidRequest { .. } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
			},
			ServiceError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "not_found", message),
			// User-initiated stop: distinct code so clients can suppress
			// error rendering.
			ServiceError::Canceled => Self::new(StatusCode::CONFLICT, "run_stopped", message),
			ServiceError::CompileFailure { .. } | ServiceError::Provider { .. } => {
				Self::new(StatusCode::BAD_GATEWAY, "provider_failure", message)
			},
			ServiceError::ExecutionTimeout
			| ServiceError::ExecutionSyntaxError { .. }
			| ServiceError::ExecutionFailure { .. } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "search_failed", message)
			},
			ServiceError::Storage { .. } | ServiceError::Internal { .. } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
