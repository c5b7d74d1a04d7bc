use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use common::storage::types::{
    flashcard::Flashcard,
    note::{EnrichmentStatus, Note},
    user::User,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub original_text: String,
    pub summary_text: String,
    pub flashcards: Vec<Flashcard>,
    pub enrichment_status: EnrichmentStatus,
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        let download_url = note.download_url().map(str::to_string);
        Self {
            id: note.id,
            title: note.title,
            original_text: note.original_text,
            summary_text: note.summary_text,
            flashcards: note.flashcards,
            enrichment_status: note.enrichment_status,
            download_url,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteParams {
    pub original_text: Option<String>,
    pub summary_text: Option<String>,
}

pub async fn list_notes(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = Note::get_by_user(&user.id, &state.db).await?;

    Ok(Json(
        notes
            .into_iter()
            .map(NoteResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let note = Note::get_by_id(&id, &user.id, &state.db).await?;

    Ok(Json(NoteResponse::from(note)))
}

pub async fn update_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(params): Json<UpdateNoteParams>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = Note::update_content(
        &id,
        &user.id,
        params.original_text.as_deref(),
        params.summary_text.as_deref(),
        &state.db,
    )
    .await?;

    Ok(Json(json!({ "updated": updated })))
}

/// Delete a note together with the document it was uploaded from, if any.
pub async fn delete_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let note = Note::delete(&id, &user.id, &state.db).await?;

    let upload_dir = note
        .download_url()
        .and_then(|url| state.storage.location_for_url(url))
        .and_then(|location| location.rsplit_once('/').map(|(dir, _)| dir.to_string()));

    if let Some(dir) = upload_dir {
        if let Err(err) = state.storage.delete_prefix(&dir).await {
            warn!(note_id = %note.id, prefix = %dir, error = %err, "Failed to remove stored document");
        }
    }

    info!(note_id = %note.id, user_id = %user.id, "Note deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_flashcards(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let flashcards = Note::flashcards(&id, &user.id, &state.db).await?;

    Ok(Json(flashcards))
}

pub async fn download_note(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let note = Note::get_by_id(&id, &user.id, &state.db).await?;

    note.download_url()
        .map(Redirect::temporary)
        .ok_or_else(|| ApiError::NotFound("Note has no stored document".to_string()))
}
