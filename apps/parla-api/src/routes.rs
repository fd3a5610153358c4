use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parla_service::{
	CreateNoteRequest, CreateNoteResponse, ListActionItemsRequest, ListActionItemsResponse,
	ListNotesRequest, ListNotesResponse, NoteFetchRequest, NoteView, RemoveActionItemRequest,
	RemoveActionItemResponse, ServiceError, SimilarNotesRequest, SimilarNotesResponse,
	TermLookupRequest, TermLookupResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", post(create_note).get(list_notes))
		.route("/v1/notes/{note_id}", get(fetch_note))
		.route("/v1/notes/search", post(search_notes))
		.route("/v1/notes/lookup", post(lookup_term))
		.route("/v1/action_items", get(list_action_items))
		.route("/v1/action_items/remove", post(remove_action_item))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
	user_id: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_note(
	State(state): State<AppState>,
	Json(payload): Json<CreateNoteRequest>,
) -> Result<Json<CreateNoteResponse>, ApiError> {
	let response = state.service.create_note(payload).await?;

	Ok(Json(response))
}

async fn fetch_note(
	State(state): State<AppState>,
	Path(note_id): Path<Uuid>,
	Query(owner): Query<OwnerQuery>,
) -> Result<Json<NoteView>, ApiError> {
	let response =
		state.service.fetch_note(NoteFetchRequest { note_id, user_id: owner.user_id }).await?;

	Ok(Json(response))
}

async fn list_notes(
	State(state): State<AppState>,
	Query(owner): Query<OwnerQuery>,
) -> Result<Json<ListNotesResponse>, ApiError> {
	let response = state.service.list_notes(ListNotesRequest { user_id: owner.user_id }).await?;

	Ok(Json(response))
}

async fn search_notes(
	State(state): State<AppState>,
	Json(payload): Json<SimilarNotesRequest>,
) -> Result<Json<SimilarNotesResponse>, ApiError> {
	let response = state.service.search_notes(payload).await?;

	Ok(Json(response))
}

async fn lookup_term(
	State(state): State<AppState>,
	Json(payload): Json<TermLookupRequest>,
) -> Result<Json<TermLookupResponse>, ApiError> {
	let response = state.service.lookup_term(payload).await?;

	Ok(Json(response))
}

async fn list_action_items(
	State(state): State<AppState>,
	Query(owner): Query<OwnerQuery>,
) -> Result<Json<ListActionItemsResponse>, ApiError> {
	let response = state
		.service
		.list_action_items(ListActionItemsRequest { user_id: owner.user_id })
		.await?;

	Ok(Json(response))
}

async fn remove_action_item(
	State(state): State<AppState>,
	Json(payload): Json<RemoveActionItemRequest>,
) -> Result<Json<RemoveActionItemResponse>, ApiError> {
	let response = state.service.remove_action_item(payload).await?;

	Ok(Json(response))
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

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
			ServiceError::Qdrant { .. } => (StatusCode::BAD_GATEWAY, "qdrant_error"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
		};

		Self { status, error_code: error_code.to_string(), message: err.to_string() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
