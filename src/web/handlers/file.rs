//! File handlers for the Web API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::service::{FileSummary, ShareGrant};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// POST /api/files - Upload a file.
///
/// Expects a multipart form with a `file` field; other fields are ignored.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileSummary>), ApiError> {
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        filename = field.file_name().map(|s| s.to_string());
        content_type = field.content_type().map(|s| s.to_string());
        content = Some(
            field
                .bytes()
                .await
                .map_err(|e| {
                    tracing::error!("Failed to read file content: {}", e);
                    ApiError::bad_request("Failed to read file content")
                })?
                .to_vec(),
        );
    }

    let filename = filename.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    let content = content.ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    let record = state
        .service
        .upload(claims.sub, &filename, content_type.as_deref(), &content)
        .await?;
    let summary = state.service.summarize(record).await;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/files - List the caller's files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let files = state.service.list(claims.sub).await?;
    Ok(Json(files))
}

/// GET /api/files/search?q= - Search the caller's files by name.
pub async fn search_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let query = params.q.unwrap_or_default();
    let files = state.service.search(claims.sub, &query).await?;
    Ok(Json(files))
}

/// POST /api/files/{id}/share - Make a file publicly shareable.
pub async fn share_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ShareGrant>, ApiError> {
    let grant = state.service.share(claims.sub, file_id).await?;
    Ok(Json(grant))
}

/// DELETE /api/files/{id} - Delete a file record.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(claims.sub, file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
