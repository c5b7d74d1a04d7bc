use std::{
    pin::pin,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::types::note::{EnrichmentStatus, Note},
};
use futures::{stream, StreamExt};
use state_machines::core::GuardError;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{debug, info, instrument, warn};

use super::{
    context::PipelineContext,
    report::ChunkReport,
    services::PipelineServices,
    state::{Chunked, Committed, Enriched, IngestionMachine, Ready, Stubbed},
};
use crate::{flashcards::parse_flashcards, utils::chunking::chunk_text};

struct ChunkEnrichment {
    index: usize,
    chunk_chars: usize,
    summary: String,
    raw_flashcards: String,
    elapsed: Duration,
}

#[instrument(level = "trace", skip_all, fields(user_id = %ctx.request.owner_id))]
pub fn split_chunks<'a>(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'a>,
) -> Result<IngestionMachine<(), Chunked>, AppError> {
    let request = ctx.request;
    let max_chars = ctx.pipeline_config.tuning.chunk_max_chars;

    ctx.chunks = chunk_text(&request.source_text, max_chars)?;

    debug!(
        user_id = %request.owner_id,
        source_chars = request.source_text.chars().count(),
        max_chars,
        chunk_count = ctx.chunks.len(),
        "source text chunked"
    );

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(user_id = %ctx.request.owner_id))]
pub async fn create_stub(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Stubbed>, AppError> {
    let request = ctx.request;
    let note = Note::create_stub(
        &request.owner_id,
        &request.title,
        &request.source_text,
        ctx.db,
    )
    .await?;

    info!(
        note_id = %note.id,
        user_id = %request.owner_id,
        chunk_count = ctx.chunks.len(),
        "note stub created"
    );

    ctx.note_id = Some(note.id);

    machine
        .stub()
        .map_err(|(_, guard)| map_guard_error("stub", &guard))
}

/// Summarize every chunk, then generate flashcards from each chunk summary.
///
/// Up to `chunk_concurrency` chunks are in flight, but results are folded in
/// chunk order. The first completion failure stops the stage; whatever was
/// folded before it stays in the context.
#[instrument(level = "trace", skip_all, fields(user_id = %ctx.request.owner_id))]
pub async fn enrich_chunks(
    machine: IngestionMachine<(), Stubbed>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Enriched>, AppError> {
    let services = ctx.services;
    let concurrency = ctx.pipeline_config.tuning.chunk_concurrency.max(1);
    let pending: Vec<_> = ctx
        .chunks
        .clone()
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| enrich_one(services, index, chunk))
        .collect();

    let mut results = pin!(stream::iter(pending).buffered(concurrency));

    while let Some(result) = results.next().await {
        absorb_chunk(ctx, result?);
    }

    debug!(
        note_id = ctx.note_id.as_deref().unwrap_or_default(),
        chunk_count = ctx.report.chunk_count(),
        flashcard_count = ctx.flashcards.len(),
        summary_chars = ctx.summary.chars().count(),
        "chunk enrichment finished"
    );

    machine
        .enrich()
        .map_err(|(_, guard)| map_guard_error("enrich", &guard))
}

async fn enrich_one<'s>(
    services: &'s dyn PipelineServices,
    index: usize,
    chunk: &'s str,
) -> Result<ChunkEnrichment, AppError> {
    let started = Instant::now();
    let summary = services.summarize(chunk).await?;
    let raw_flashcards = services.generate_flashcards(&summary).await?;

    Ok(ChunkEnrichment {
        index,
        chunk_chars: chunk.chars().count(),
        summary,
        raw_flashcards,
        elapsed: started.elapsed(),
    })
}

fn absorb_chunk(ctx: &mut PipelineContext<'_>, enrichment: ChunkEnrichment) {
    let ChunkEnrichment {
        index,
        chunk_chars,
        summary,
        raw_flashcards,
        elapsed,
    } = enrichment;

    ctx.summary.push_str(&summary);
    ctx.summary.push('\n');

    let flashcards = match parse_flashcards(index, &raw_flashcards) {
        Ok(cards) => {
            let count = cards.len();
            ctx.flashcards.extend(cards);
            Ok(count)
        }
        Err(err) => {
            warn!(
                note_id = ctx.note_id.as_deref().unwrap_or_default(),
                chunk_index = index,
                reason = %err.reason,
                payload = %err.payload_preview(),
                "flashcard response was not a card list; skipping chunk cards"
            );
            Err(err)
        }
    };

    debug!(
        chunk_index = index,
        chunk_chars,
        summary_chars = summary.chars().count(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "chunk enriched"
    );

    ctx.report.chunks.push(ChunkReport {
        index,
        chunk_chars,
        summary_chars: summary.chars().count(),
        flashcards,
    });
}

#[instrument(level = "trace", skip_all, fields(user_id = %ctx.request.owner_id))]
pub async fn commit(
    machine: IngestionMachine<(), Enriched>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Committed>, AppError> {
    commit_note(ctx, EnrichmentStatus::Complete).await?;

    machine
        .commit()
        .map_err(|(_, guard)| map_guard_error("commit", &guard))
}

/// Write the accumulated summary and flashcards in one update, retrying transient database errors.
pub async fn commit_note(
    ctx: &PipelineContext<'_>,
    status: EnrichmentStatus,
) -> Result<Note, AppError> {
    let note_id = ctx.note_id()?;
    let tuning = &ctx.pipeline_config.tuning;
    let content_ref = ctx.request.content_ref.as_deref();

    let retry_strategy = ExponentialBackoff::from_millis(tuning.commit_backoff_base_ms)
        .max_delay(Duration::from_millis(tuning.commit_max_backoff_ms))
        .map(jitter)
        .take(tuning.commit_attempts.saturating_sub(1));

    let note = RetryIf::spawn(
        retry_strategy,
        || {
            Note::commit_enrichment(
                note_id,
                &ctx.summary,
                &ctx.flashcards,
                content_ref,
                status,
                ctx.db,
            )
        },
        is_transient_store_error,
    )
    .await?;

    info!(
        note_id = %note.id,
        status = ?status,
        flashcard_count = note.flashcards.len(),
        summary_chars = note.summary_text.chars().count(),
        "note enrichment committed"
    );

    Ok(note)
}

fn is_transient_store_error(err: &AppError) -> bool {
    matches!(err, AppError::Database(_))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}
