use axum::{
	Json, Router,
	extract::{FromRequestParts, Path, Query, State},
	http::{StatusCode, request::Parts},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnemo_config::Message;
use mnemo_service::{
	AddRequest, AddResponse, DeleteRequest, DeleteResponse, Error, ListRequest, ListResponse,
	MemoryItem, PromptResponse, SearchItem, SearchRequest, SetPromptRequest, UpdateRequest,
	UpdateResponse,
};

use crate::state::AppState;

/// Header carrying the organization resolved by the upstream auth layer.
pub const ORG_HEADER: &str = "x-mnemo-org-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/memories", post(add).get(list))
		.route("/v1/memories/search", post(search))
		.route("/v1/memories/{id}", get(get_memory).patch(update).delete(delete))
		.route(
			"/v1/prompts/fact-extraction",
			get(get_prompt).put(set_prompt).delete(reset_prompt),
		)
		.with_state(state)
}

/// Trusted organization id taken from [`ORG_HEADER`].
pub struct OrgId(pub String);

impl<S> FromRequestParts<S> for OrgId
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
		let org_id = parts
			.headers
			.get(ORG_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.ok_or_else(|| {
				json_error(
					StatusCode::BAD_REQUEST,
					"invalid_request",
					format!("{ORG_HEADER} header is required."),
				)
			})?;

		Ok(Self(org_id.to_string()))
	}
}

#[derive(Debug, Deserialize)]
pub struct AddBody {
	pub user_id: String,
	#[serde(default)]
	pub agent_id: Option<String>,
	pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
	pub query: String,
	pub user_id: String,
	#[serde(default)]
	pub agent_id: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
	pub user_id: Option<String>,
	pub agent_id: Option<String>,
	pub limit: Option<i64>,
	pub starting_after: Option<Uuid>,
	pub ending_before: Option<Uuid>,
	pub include_total: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
	pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptBody {
	pub messages: Vec<Message>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn add(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Json(payload): Json<AddBody>,
) -> Result<Json<AddResponse>, ApiError> {
	let AddBody { user_id, agent_id, messages } = payload;
	let response = state.service.add(AddRequest { user_id, org_id, agent_id, messages }).await?;

	Ok(Json(response))
}

async fn list(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
	let response = state
		.service
		.list(ListRequest {
			org_id,
			user_id: params.user_id,
			agent_id: params.agent_id,
			limit: params.limit,
			starting_after: params.starting_after,
			ending_before: params.ending_before,
			include_total: params.include_total.unwrap_or(false),
		})
		.await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Json(payload): Json<SearchBody>,
) -> Result<Json<Vec<SearchItem>>, ApiError> {
	let SearchBody { query, user_id, agent_id, limit } = payload;
	let response =
		state.service.search(SearchRequest { query, user_id, org_id, agent_id, limit }).await?;

	Ok(Json(response))
}

async fn get_memory(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Path(id): Path<Uuid>,
) -> Result<Json<MemoryItem>, ApiError> {
	let item = state.service.get(&org_id, id).await?.ok_or_else(|| {
		json_error(StatusCode::NOT_FOUND, "not_found", format!("Memory {id} not found."))
	})?;

	Ok(Json(item))
}

async fn update(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Path(id): Path<Uuid>,
	Json(payload): Json<UpdateBody>,
) -> Result<Json<UpdateResponse>, ApiError> {
	let response = state.service.update(UpdateRequest { org_id, id, text: payload.text }).await?;

	Ok(Json(response))
}

async fn delete(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let response = state.service.delete(DeleteRequest { org_id, id }).await?;

	Ok(Json(response))
}

async fn get_prompt(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
) -> Result<Json<PromptResponse>, ApiError> {
	let response = state.service.get_prompt(&org_id).await?;

	Ok(Json(response))
}

async fn set_prompt(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
	Json(payload): Json<PromptBody>,
) -> Result<Json<PromptResponse>, ApiError> {
	let response =
		state.service.set_prompt(SetPromptRequest { org_id, messages: payload.messages }).await?;

	Ok(Json(response))
}

async fn reset_prompt(
	State(state): State<AppState>,
	OrgId(org_id): OrgId,
) -> Result<Json<PromptResponse>, ApiError> {
	let response = state.service.reset_prompt(&org_id).await?;

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
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::NotFound { message } => json_error(StatusCode::NOT_FOUND, "not_found", message),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider failure.");

				json_error(StatusCode::BAD_GATEWAY, "provider_error", message)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage failure.")
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

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
