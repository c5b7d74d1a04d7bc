mod config;
mod context;
mod report;
mod services;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};
pub use context::IngestionRequest;
pub use report::{ChunkReport, IngestionOutcome, IngestionReport, ReportSummary};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::note::{EnrichmentStatus, Note},
    },
    utils::{
        config::{AppConfig, FailurePolicy},
        llm::CompletionClient,
    },
};
use tracing::{info, warn};

use crate::utils::chunking::chunk_text;

use self::{
    context::PipelineContext,
    stages::{commit, commit_note, create_stub, enrich_chunks, split_chunks},
    state::ready,
};

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        completion_client: Arc<dyn CompletionClient>,
        config: &AppConfig,
    ) -> Self {
        Self::with_services(
            db,
            IngestionConfig::from_app_config(config),
            Arc::new(DefaultPipelineServices::new(completion_client)),
        )
    }

    pub fn with_services(
        db: Arc<SurrealDbClient>,
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            db,
            pipeline_config,
            services,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.pipeline_config
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Store a note for `request` and enrich it chunk by chunk.
    ///
    /// The stub note exists before the first completion call. On a completion
    /// failure the configured [`FailurePolicy`] decides what is left on the note,
    /// and the failure is returned either way.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %request.owner_id, title = %request.title)
    )]
    pub async fn ingest(&self, request: IngestionRequest) -> Result<IngestionOutcome, AppError> {
        let mut ctx = PipelineContext::new(
            &request,
            self.db.as_ref(),
            &self.pipeline_config,
            self.services.as_ref(),
        );

        let machine = ready();
        let pipeline_started = Instant::now();

        let machine = split_chunks(machine, &mut ctx).map_err(|err| ctx.abort(err))?;

        let stage_start = Instant::now();
        let machine = create_stub(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let stub_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = match enrich_chunks(machine, &mut ctx).await {
            Ok(machine) => machine,
            Err(err) => {
                let err = ctx.abort(err);
                self.apply_failure_policy(&ctx).await;
                return Err(err);
            }
        };
        let enrich_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = match commit(machine, &mut ctx).await {
            Ok(machine) => machine,
            Err(err) => {
                let err = ctx.abort(err);
                Self::mark_failed(&ctx).await;
                return Err(err);
            }
        };
        let commit_duration = stage_start.elapsed();

        let note_id = ctx.note_id()?.to_string();
        info!(
            note_id = %note_id,
            chunk_count = ctx.report.chunk_count(),
            flashcard_count = ctx.flashcards.len(),
            unparsed_flashcard_chunks = ctx.report.parse_failures().count(),
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            stub_ms = Self::duration_millis(stub_duration),
            enrich_ms = Self::duration_millis(enrich_duration),
            commit_ms = Self::duration_millis(commit_duration),
            "ingestion pipeline finished"
        );

        Ok(IngestionOutcome {
            note_id,
            status: EnrichmentStatus::Complete,
            report: ctx.report,
        })
    }

    /// Summarize `text` without storing anything.
    pub async fn preview_summary(&self, text: &str) -> Result<String, AppError> {
        let chunks = chunk_text(text, self.pipeline_config.tuning.chunk_max_chars)?;

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            summaries.push(self.services.summarize(chunk).await?);
        }

        Ok(summaries.join("\n"))
    }

    async fn apply_failure_policy(&self, ctx: &PipelineContext<'_>) {
        if ctx.note_id.is_none() {
            return;
        }

        match self.pipeline_config.failure_policy {
            FailurePolicy::Abort => Self::mark_failed(ctx).await,
            FailurePolicy::CommitPartial => {
                if let Err(err) = commit_note(ctx, EnrichmentStatus::Partial).await {
                    warn!(error = %err, "failed to commit partial enrichment");
                    Self::mark_failed(ctx).await;
                }
            }
        }
    }

    async fn mark_failed(ctx: &PipelineContext<'_>) {
        let Some(note_id) = ctx.note_id.as_deref() else {
            return;
        };

        if let Err(err) = Note::mark_failed(note_id, ctx.db).await {
            warn!(note_id = %note_id, error = %err, "failed to mark note as failed");
        }
    }
}

#[cfg(test)]
mod tests;
