//! # API Endpoint Handlers
//!
//! Index calls are synchronous and may hit the disk, so each one runs on
//! the blocking pool through [`with_engine`].

use super::{
    AppState,
    types::{ApiError, HealthResponse, trid_from_body, validate_trid},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use trixel_tags_core::{TagEngine, TagError};

/// Run `f` against the engine on the blocking pool.
async fn with_engine<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TagEngine) -> Result<T, TagError> + Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "index task failed");
            ApiError::internal("index task failed")
        })?
        .map_err(ApiError::from)
}

fn path_trid(trid: &str) -> Result<String, ApiError> {
    validate_trid(trid)
        .map(str::to_string)
        .map_err(|e| ApiError::not_found(e.to_string()))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// TRID HANDLERS
// =============================================================================

/// `GET /trids/{trid}`: tags carried by a trixel.
pub async fn tags_of_handler(
    State(state): State<AppState>,
    Path(trid): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let trid = path_trid(&trid)?;
    let tags = with_engine(&state, move |engine| engine.tags_of(&trid)).await?;
    Ok(Json(tags))
}

/// `DELETE /trids/{trid}/tag/{tag}`: remove one association.
pub async fn untag_handler(
    State(state): State<AppState>,
    Path((trid, tag)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let trid = path_trid(&trid)?;
    with_engine(&state, move |engine| engine.dissociate(&trid, &tag)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TAG HANDLERS
// =============================================================================

/// `GET /tags/`: every tag in use.
pub async fn all_tags_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let tags = with_engine(&state, |engine| engine.all_tags()).await?;
    Ok(Json(tags))
}

/// `GET /tags/{tag}`: trixels carrying a tag.
pub async fn ids_of_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let ids = with_engine(&state, move |engine| engine.ids_of(&tag)).await?;
    Ok(Json(ids))
}

/// `POST /tags/{tag}` with the trid as body: add one association.
pub async fn tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    body: String,
) -> Result<StatusCode, ApiError> {
    associate_body(&state, tag, &body).await
}

/// `POST /tags/` with the trid as body: associate the empty tag.
pub async fn empty_tag_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    associate_body(&state, String::new(), &body).await
}

async fn associate_body(state: &AppState, tag: String, body: &str) -> Result<StatusCode, ApiError> {
    let trid = trid_from_body(body)
        .map(str::to_string)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    with_engine(state, move |engine| engine.associate(&trid, &tag)).await?;
    Ok(StatusCode::NO_CONTENT)
}
