use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::flashcard::Flashcard},
};
use tracing::error;

use super::{config::IngestionConfig, report::IngestionReport, services::PipelineServices};

/// Input for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub owner_id: String,
    pub title: String,
    pub source_text: String,
    /// Storage URL of the uploaded file, replacing the raw text on commit.
    pub content_ref: Option<String>,
}

pub struct PipelineContext<'a> {
    pub request: &'a IngestionRequest,
    pub db: &'a SurrealDbClient,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub chunks: Vec<&'a str>,
    pub note_id: Option<String>,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub report: IngestionReport,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        request: &'a IngestionRequest,
        db: &'a SurrealDbClient,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        Self {
            request,
            db,
            pipeline_config,
            services,
            chunks: Vec::new(),
            note_id: None,
            summary: String::new(),
            flashcards: Vec::new(),
            report: IngestionReport::default(),
        }
    }

    pub fn note_id(&self) -> Result<&str, AppError> {
        self.note_id
            .as_deref()
            .ok_or_else(|| AppError::InternalError("note stub expected to exist".into()))
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            note_id = self.note_id.as_deref().unwrap_or("<none>"),
            user_id = %self.request.owner_id,
            chunks_done = self.report.chunk_count(),
            chunks_total = self.chunks.len(),
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }
}
