use surrealdb::opt::PatchOp;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::flashcard::Flashcard;

/// How far AI enrichment of a note got.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Stub created, enrichment not committed yet.
    #[default]
    Pending,
    Complete,
    /// Only the chunks before a failed completion call were committed.
    Partial,
    Failed,
}

stored_object!(Note, "note", {
    user_id: String,
    title: String,
    original_text: String,
    summary_text: String,
    flashcards: Vec<Flashcard>,
    #[serde(default)]
    enrichment_status: EnrichmentStatus
});

impl Note {
    pub fn new(user_id: String, title: String, original_text: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            user_id,
            title,
            original_text,
            summary_text: String::new(),
            flashcards: Vec::new(),
            enrichment_status: EnrichmentStatus::Pending,
        }
    }

    /// Persist an empty note so it has an id before any enrichment runs.
    pub async fn create_stub(
        user_id: &str,
        title: &str,
        original_text: &str,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let note = Self::new(
            user_id.to_owned(),
            title.to_owned(),
            original_text.to_owned(),
        );

        db.store_item(note)
            .await?
            .ok_or_else(|| AppError::InternalError("Note stub was not created".into()))
    }

    /// Replace summary and flashcards in one update.
    ///
    /// When `content_ref` is given it replaces `original_text`. Repeating the
    /// same call leaves the same stored state apart from `updated_at`.
    pub async fn commit_enrichment(
        id: &str,
        summary_text: &str,
        flashcards: &[Flashcard],
        content_ref: Option<&str>,
        status: EnrichmentStatus,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let mut update = db
            .update((Self::table_name(), id))
            .patch(PatchOp::replace("/summary_text", summary_text.to_owned()))
            .patch(PatchOp::replace("/flashcards", flashcards.to_vec()))
            .patch(PatchOp::replace("/enrichment_status", status))
            .patch(PatchOp::replace(
                "/updated_at",
                surrealdb::Datetime::from(Utc::now()),
            ));

        if let Some(content_ref) = content_ref {
            update = update.patch(PatchOp::replace("/original_text", content_ref.to_owned()));
        }

        let updated: Option<Self> = update.await?;

        updated.ok_or_else(|| AppError::NotFound(format!("Note {id} not found")))
    }

    pub async fn mark_failed(id: &str, db: &SurrealDbClient) -> Result<(), AppError> {
        let _updated: Option<Self> = db
            .update((Self::table_name(), id))
            .patch(PatchOp::replace(
                "/enrichment_status",
                EnrichmentStatus::Failed,
            ))
            .patch(PatchOp::replace(
                "/updated_at",
                surrealdb::Datetime::from(Utc::now()),
            ))
            .await?;

        Ok(())
    }

    pub async fn get_by_user(user_id: &str, db: &SurrealDbClient) -> Result<Vec<Self>, AppError> {
        let notes: Vec<Note> = db
            .client
            .query("SELECT * FROM type::table($table_name) WHERE user_id = $user_id ORDER BY created_at DESC")
            .bind(("table_name", Self::table_name()))
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;

        Ok(notes)
    }

    pub async fn get_by_id(id: &str, user_id: &str, db: &SurrealDbClient) -> Result<Self, AppError> {
        let note: Option<Note> = db.get_item(id).await?;

        let note = note.ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

        if note.user_id != user_id {
            return Err(AppError::Auth(
                "You don't have access to this note".to_string(),
            ));
        }

        Ok(note)
    }

    /// Overwrite the provided fields. Returns `false` when neither field was given.
    pub async fn update_content(
        id: &str,
        user_id: &str,
        original_text: Option<&str>,
        summary_text: Option<&str>,
        db: &SurrealDbClient,
    ) -> Result<bool, AppError> {
        Self::get_by_id(id, user_id, db).await?;

        if original_text.is_none() && summary_text.is_none() {
            return Ok(false);
        }

        let mut update = db.update((Self::table_name(), id)).patch(PatchOp::replace(
            "/updated_at",
            surrealdb::Datetime::from(Utc::now()),
        ));
        if let Some(text) = original_text {
            update = update.patch(PatchOp::replace("/original_text", text.to_owned()));
        }
        if let Some(summary) = summary_text {
            update = update.patch(PatchOp::replace("/summary_text", summary.to_owned()));
        }

        let _updated: Option<Self> = update.await?;

        Ok(true)
    }

    pub async fn delete(id: &str, user_id: &str, db: &SurrealDbClient) -> Result<Self, AppError> {
        Self::get_by_id(id, user_id, db).await?;

        db.delete_item::<Self>(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
    }

    pub async fn flashcards(
        id: &str,
        user_id: &str,
        db: &SurrealDbClient,
    ) -> Result<Vec<Flashcard>, AppError> {
        Ok(Self::get_by_id(id, user_id, db).await?.flashcards)
    }

    /// The stored file URL, when the note was created from an upload.
    pub fn download_url(&self) -> Option<&str> {
        let text = self.original_text.as_str();
        (text.starts_with("http://") || text.starts_with("https://")).then_some(text)
    }
}
