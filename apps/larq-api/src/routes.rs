use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};

use larq_service::{
	ArchiveStatusResponse, Error as ServiceError, GetEventsForTickRequest,
	GetEventsForTickResponse, GetTickDataRequest, GetTickDataResponse, GetTransactionRequest,
	GetTransactionResponse, GetTransactionsForTickRequest, GetTransactionsForTickResponse,
	ListTransactionsRequest, ListTransactionsResponse, QueryEventsRequest, QueryEventsResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/status", get(archive_status))
		.route("/v1/transactions/{tx_id}", get(transaction))
		.route("/v1/transactions/query", post(list_transactions))
		.route("/v1/ticks/{tick}/transactions", get(transactions_for_tick))
		.route("/v1/ticks/{tick}/data", get(tick_data))
		.route("/v1/ticks/{tick}/events", get(events_for_tick))
		.route("/v1/events/query", post(query_events))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn archive_status(
	State(state): State<AppState>,
) -> Result<Json<ArchiveStatusResponse>, ApiError> {
	Ok(Json(state.service.archive_status().await?))
}

async fn transaction(
	State(state): State<AppState>,
	Path(tx_id): Path<String>,
) -> Result<Json<GetTransactionResponse>, ApiError> {
	Ok(Json(state.service.transaction(GetTransactionRequest { tx_id }).await?))
}

async fn list_transactions(
	State(state): State<AppState>,
	Json(payload): Json<ListTransactionsRequest>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
	Ok(Json(state.service.list_transactions(payload).await?))
}

async fn transactions_for_tick(
	State(state): State<AppState>,
	Path(tick): Path<u64>,
) -> Result<Json<GetTransactionsForTickResponse>, ApiError> {
	let request = GetTransactionsForTickRequest { tick_number: tick };

	Ok(Json(state.service.transactions_for_tick(request).await?))
}

async fn tick_data(
	State(state): State<AppState>,
	Path(tick): Path<u64>,
) -> Result<Json<GetTickDataResponse>, ApiError> {
	Ok(Json(state.service.tick_data(GetTickDataRequest { tick_number: tick }).await?))
}

async fn events_for_tick(
	State(state): State<AppState>,
	Path(tick): Path<u64>,
) -> Result<Json<GetEventsForTickResponse>, ApiError> {
	let request = GetEventsForTickRequest { tick_number: tick };

	Ok(Json(state.service.events_for_tick(request).await?))
}

async fn query_events(
	State(state): State<AppState>,
	Json(payload): Json<QueryEventsRequest>,
) -> Result<Json<QueryEventsResponse>, ApiError> {
	Ok(Json(state.service.query_events(payload).await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	details: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
	details: Option<Value>,
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::InvalidArgument { .. } => Self {
				status: StatusCode::BAD_REQUEST,
				error_code: "invalid_argument",
				message,
				details: None,
			},
			ServiceError::NotFound { .. } => Self {
				status: StatusCode::NOT_FOUND,
				error_code: "not_found",
				message,
				details: None,
			},
			ServiceError::TickNotProcessed { last_processed_tick, .. } => Self {
				status: StatusCode::PRECONDITION_FAILED,
				error_code: "tick_not_processed",
				message,
				details: Some(json!({ "lastProcessedTick": last_processed_tick })),
			},
			ServiceError::TickSkipped { next_available_tick, .. } => Self {
				status: StatusCode::RANGE_NOT_SATISFIABLE,
				error_code: "tick_skipped",
				message,
				details: Some(json!({ "nextAvailableTick": next_available_tick })),
			},
			// Technical errors have already been sanitized to `Internal` by
			// the service pipeline; the remaining variants land here too.
			_ => Self {
				status: StatusCode::INTERNAL_SERVER_ERROR,
				error_code: "internal",
				message: ServiceError::Internal.to_string(),
				details: None,
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code.to_string(),
			message: self.message,
			details: self.details,
		};

		(self.status, Json(body)).into_response()
	}
}
