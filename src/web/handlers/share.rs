//! Public share link resolution.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /share/{token} - Redirect to the shared file.
///
/// Unauthenticated. Responds 302 with the retrieval URL in Location;
/// unknown, expired and revoked tokens all produce the same 404.
pub async fn resolve_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let url = state.service.resolve_shared(&token).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
