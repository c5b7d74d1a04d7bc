use axum::{
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use common::{error::AppError, storage::store::is_safe_relative};
use mime_guess::from_path;

use crate::{api_state::ApiState, error::ApiError};

/// Serve a stored document at the public URL notes reference.
pub async fn serve_file(
    State(state): State<ApiState>,
    Path(location): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if location.is_empty() || !is_safe_relative(&location) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let data = state.storage.get(&location).await.map_err(AppError::from)?;
    let content_type = from_path(&location)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(([(CONTENT_TYPE, content_type)], data))
}
