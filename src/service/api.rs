use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{SecondsFormat, Utc};
use playground_common::{
    DIMENSIONS_CONFIG_KEY, HealthResponse, IdeaFilters, IdeaPatch, IdeasResponse, MessageResponse,
    NewIdea, ReorderRequest, ValidateTitleRequest, default_dimensions_registry,
};

use super::db::StoreHandle;
#[cfg(test)]
use super::db::IdeaStore;
use crate::config::Environment;
use crate::errors::PlaygroundError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: StoreHandle,
    pub environment: Environment,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<PlaygroundError>() {
            Some(PlaygroundError::InvalidInput(msg)) => ApiError::BadRequest(msg.clone()),
            Some(PlaygroundError::DuplicateTitle { .. }) => {
                ApiError::BadRequest("Title already exists".to_string())
            }
            Some(PlaygroundError::NotFound { .. }) => {
                ApiError::NotFound("Idea not found".to_string())
            }
            _ => ApiError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::PayloadTooLarge(msg) => {
                tracing::warn!(status = status.as_u16(), error = %msg, "Request rejected");
                msg
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                msg
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/ideas", get(list_ideas).post(create_idea))
        .route("/api/ideas/reorder", put(reorder_ideas))
        .route("/api/ideas/validate-title", post(validate_title))
        .route(
            "/api/ideas/{id}",
            get(get_idea).put(update_idea).delete(delete_idea),
        )
        .route("/api/dimensions", get(get_dimensions))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.environment.to_string(),
    })
}

async fn list_ideas(
    State(state): State<SharedState>,
    filters: Result<Query<IdeaFilters>, QueryRejection>,
) -> Result<Json<IdeasResponse>, ApiError> {
    let Query(filters) = filters?;
    let records = state.store.call(move |s| s.list_ideas(&filters)).await?;
    let ideas = records.into_iter().map(|r| (r.id, r.idea)).collect();
    Ok(Json(IdeasResponse { ideas }))
}

async fn get_idea(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.store.call(move |s| s.get_idea(&id)).await?;
    match record {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound("Idea not found".to_string())),
    }
}

async fn get_dimensions(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .store
        .call(|s| s.get_config(DIMENSIONS_CONFIG_KEY))
        .await?;
    Ok(Json(stored.unwrap_or_else(default_dimensions_registry)))
}

async fn create_idea(
    State(state): State<SharedState>,
    payload: Result<Json<NewIdea>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload?;
    let record = state.store.call(move |s| s.create_idea(new)).await?;
    tracing::info!(id = %record.id, order = record.idea.order, "Idea created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_idea(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<IdeaPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = payload?;
    let record = state.store.call(move |s| s.update_idea(&id, patch)).await?;
    tracing::debug!(id = %record.id, "Idea updated");
    Ok(Json(record))
}

async fn delete_idea(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    state.store.call(move |s| s.delete_idea(&target)).await?;
    tracing::info!(id = %id, "Idea deleted");
    Ok(Json(MessageResponse {
        message: "Idea deleted successfully".to_string(),
    }))
}

async fn reorder_ideas(
    State(state): State<SharedState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let ids = req.reordered_ids;
    let count = state.store.call(move |s| s.reorder_ideas(&ids)).await?;
    tracing::debug!(count, "Ideas reordered");
    Ok(Json(MessageResponse {
        message: "Ideas reordered successfully".to_string(),
    }))
}

async fn validate_title(
    State(state): State<SharedState>,
    payload: Result<Json<ValidateTitleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let result = state
        .store
        .call(move |s| s.validate_title(&req.title, req.exclude_id.as_deref()))
        .await?;
    Ok(Json(result))
}

// ── Tests ─────────────────────────────────────────────────────────────
