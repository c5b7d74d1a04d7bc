use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_LENGTH, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::{file_info::FileInfo, user::User},
    utils::config::FailurePolicy,
};
use ingestion_pipeline::{
    utils::file_text_extraction::{extract_text, DocumentFormat},
    IngestionOutcome, IngestionRequest,
};
use serde::Deserialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{api_state::ApiState, error::ApiError};

const DEFAULT_TITLE: &str = "Untitled";

#[derive(Debug, Deserialize)]
pub struct CreateNoteParams {
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SummariseParams {
    pub text: String,
}

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    pub title: Option<String>,
    #[form_data(limit = "unlimited")]
    pub document: FieldData<NamedTempFile>,
}

fn title_or(title: Option<String>, fallback: &str) -> String {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn outcome_response(outcome: &IngestionOutcome) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({
            "note_id": outcome.note_id,
            "status": outcome.status,
            "report": outcome.report.summary(),
        })),
    )
}

/// Ingest typed text as a new note.
pub async fn create_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Json(params): Json<CreateNoteParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        user_id = %user.id,
        text_chars = params.text.chars().count(),
        "Received text note"
    );

    let outcome = state
        .pipeline
        .ingest(IngestionRequest {
            owner_id: user.id,
            title: title_or(params.title, DEFAULT_TITLE),
            source_text: params.text,
            content_ref: None,
        })
        .await?;

    Ok(outcome_response(&outcome))
}

/// Summary of `text` without creating a note.
pub async fn summarise(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Json(params): Json<SummariseParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        user_id = %user.id,
        text_chars = params.text.chars().count(),
        "Received summary preview request"
    );

    let summary = state.pipeline.preview_summary(&params.text).await?;

    Ok(Json(json!({ "summary": summary })))
}

/// Store an uploaded document, extract its text and ingest it.
///
/// The stored document URL replaces the extracted text on the note.
pub async fn upload_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let declared_len = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > state.config.ingest_max_body_bytes) {
        return Err(ApiError::PayloadTooLarge(format!(
            "Upload exceeds {} bytes",
            state.config.ingest_max_body_bytes
        )));
    }

    let TypedMultipart(input) = TypedMultipart::<UploadParams>::from_request(request, &state)
        .await
        .map_err(multipart_rejection)?;

    let file_name = input
        .document
        .metadata
        .file_name
        .clone()
        .ok_or_else(|| ApiError::ValidationError("Document has no file name".to_string()))?;
    let format = DocumentFormat::from_file_name(&file_name)?;

    let data = Bytes::from(
        tokio::fs::read(input.document.contents.path())
            .await
            .map_err(AppError::from)?,
    );

    info!(
        user_id = %user.id,
        file_name = %file_name,
        bytes = data.len(),
        "Received document upload"
    );

    let file_info = FileInfo::upload(data.clone(), &file_name, &user.id, &state.storage).await?;

    let text = match extract_text(data, format).await {
        Ok(text) => text,
        Err(err) => {
            discard_upload(&state, &file_info).await;
            return Err(err.into());
        }
    };

    let result = state
        .pipeline
        .ingest(IngestionRequest {
            owner_id: user.id,
            title: title_or(input.title, &file_name),
            source_text: text,
            content_ref: Some(file_info.public_url.clone()),
        })
        .await;

    match result {
        Ok(outcome) => Ok(outcome_response(&outcome)),
        Err(err) => {
            // Only a partial commit records the storage URL on the note.
            if state.pipeline.config().failure_policy != FailurePolicy::CommitPartial {
                discard_upload(&state, &file_info).await;
            }
            Err(err.into())
        }
    }
}

async fn discard_upload(state: &ApiState, file_info: &FileInfo) {
    let Some((dir, _)) = file_info.location.rsplit_once('/') else {
        return;
    };

    if let Err(err) = state.storage.delete_prefix(dir).await {
        warn!(location = %file_info.location, error = %err, "Failed to discard upload");
    }
}

fn multipart_rejection(err: TypedMultipartError) -> ApiError {
    let message = err.to_string();
    if err.into_response().status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::ValidationError(message)
    }
}
