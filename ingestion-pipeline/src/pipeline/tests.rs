use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            flashcard::Flashcard,
            note::{EnrichmentStatus, Note},
        },
    },
    utils::config::FailurePolicy,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    config::{IngestionConfig, IngestionTuning},
    context::IngestionRequest,
    services::PipelineServices,
    IngestionPipeline,
};

const USER_ID: &str = "student-1";

/// Labels each chunk by its first character and answers with canned HTML and JSON.
#[derive(Default)]
struct MockServices {
    calls: Mutex<Vec<String>>,
    notes_seen_on_first_call: Mutex<Option<usize>>,
    db: Option<Arc<SurrealDbClient>>,
    fail_summary_for: HashSet<char>,
    malformed_flashcards_for: HashSet<char>,
    slow_chunks: HashSet<char>,
}

impl MockServices {
    fn label(text: &str) -> char {
        text.chars().next().unwrap_or('?')
    }

    fn summary_label(summary: &str) -> char {
        summary
            .strip_prefix("<p>")
            .and_then(|rest| rest.chars().next())
            .unwrap_or('?')
    }

    async fn record(&self, entry: String) {
        self.calls.lock().await.push(entry);
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PipelineServices for MockServices {
    async fn summarize(&self, chunk: &str) -> Result<String, AppError> {
        if let Some(db) = &self.db {
            let mut seen = self.notes_seen_on_first_call.lock().await;
            if seen.is_none() {
                let notes = Note::get_by_user(USER_ID, db).await?;
                *seen = Some(notes.len());
            }
        }

        let label = Self::label(chunk);
        if self.slow_chunks.contains(&label) {
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        self.record(format!("summarize:{label}")).await;

        if self.fail_summary_for.contains(&label) {
            return Err(AppError::LlmTimeout(1));
        }

        Ok(format!("<p>{label}</p>"))
    }

    async fn generate_flashcards(&self, summary: &str) -> Result<String, AppError> {
        let label = Self::summary_label(summary);
        self.record(format!("flashcards:{label}")).await;

        if self.malformed_flashcards_for.contains(&label) {
            return Ok("Sure! Here are some flashcards: [{question: oops".into());
        }

        Ok(format!(
            r#"[{{"question": "{label}1?", "answer": "{label}1"}}, {{"question": "{label}2?", "answer": "{label}2"}}]"#
        ))
    }
}

async fn setup_db() -> Arc<SurrealDbClient> {
    let db = SurrealDbClient::memory("pipeline_test", &Uuid::new_v4().to_string())
        .await
        .expect("Failed to create in-memory SurrealDB");
    db.ensure_initialized()
        .await
        .expect("Failed to initialize schema");
    Arc::new(db)
}

fn pipeline_config(chunk_max_chars: usize, failure_policy: FailurePolicy) -> IngestionConfig {
    IngestionConfig {
        tuning: IngestionTuning {
            chunk_max_chars,
            commit_backoff_base_ms: 1,
            commit_max_backoff_ms: 2,
            ..IngestionTuning::default()
        },
        failure_policy,
    }
}

fn request(text: String, content_ref: Option<&str>) -> IngestionRequest {
    IngestionRequest {
        owner_id: USER_ID.into(),
        title: "Operating Systems".into(),
        source_text: text,
        content_ref: content_ref.map(str::to_string),
    }
}

fn lettered_text(sizes: &[(char, usize)]) -> String {
    sizes
        .iter()
        .map(|(letter, count)| letter.to_string().repeat(*count))
        .collect()
}

fn cards_for(labels: &[char]) -> Vec<Flashcard> {
    labels
        .iter()
        .flat_map(|label| {
            vec![
                Flashcard::new(format!("{label}1?"), format!("{label}1")),
                Flashcard::new(format!("{label}2?"), format!("{label}2")),
            ]
        })
        .collect()
}

async fn only_note(db: &SurrealDbClient) -> Note {
    let mut notes = Note::get_by_user(USER_ID, db).await.expect("list notes");
    assert_eq!(notes.len(), 1, "exactly one note expected");
    notes.remove(0)
}

#[tokio::test]
async fn three_chunk_document_runs_six_ordered_calls() {
    let db = setup_db().await;
    let services = Arc::new(MockServices {
        db: Some(Arc::clone(&db)),
        ..MockServices::default()
    });
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(40_000, FailurePolicy::Abort),
        services.clone(),
    );

    let text = lettered_text(&[('a', 40_000), ('b', 40_000), ('c', 10_000)]);
    let outcome = pipeline
        .ingest(request(text, Some("http://files.test/files/notes/student-1/x/os.pdf")))
        .await
        .expect("ingestion succeeds");

    assert_eq!(
        services.calls().await,
        vec![
            "summarize:a",
            "flashcards:a",
            "summarize:b",
            "flashcards:b",
            "summarize:c",
            "flashcards:c",
        ]
    );
    assert_eq!(
        *services.notes_seen_on_first_call.lock().await,
        Some(1),
        "stub note must exist before the first completion call"
    );

    let chunk_sizes: Vec<usize> = outcome.report.chunks.iter().map(|c| c.chunk_chars).collect();
    assert_eq!(chunk_sizes, vec![40_000, 40_000, 10_000]);
    assert_eq!(outcome.status, EnrichmentStatus::Complete);

    let note = Note::get_by_id(&outcome.note_id, USER_ID, &db)
        .await
        .expect("note stored");
    assert_eq!(note.summary_text, "<p>a</p>\n<p>b</p>\n<p>c</p>\n");
    assert_eq!(note.flashcards, cards_for(&['a', 'b', 'c']));
    assert_eq!(
        note.original_text,
        "http://files.test/files/notes/student-1/x/os.pdf"
    );
    assert_eq!(note.enrichment_status, EnrichmentStatus::Complete);
}

#[tokio::test]
async fn malformed_flashcards_skip_only_that_chunk() {
    let db = setup_db().await;
    let services = Arc::new(MockServices {
        malformed_flashcards_for: HashSet::from(['b']),
        ..MockServices::default()
    });
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(4, FailurePolicy::Abort),
        services,
    );

    let outcome = pipeline
        .ingest(request(lettered_text(&[('a', 4), ('b', 4), ('c', 4)]), None))
        .await
        .expect("parse failures are not fatal");

    let failures: Vec<_> = outcome.report.parse_failures().collect();
    assert_eq!(failures.len(), 1);
    let failure = failures.first().expect("one failure");
    assert_eq!(failure.chunk_index, 1);
    assert!(failure.raw_payload.starts_with("Sure! Here are some flashcards"));

    let note = Note::get_by_id(&outcome.note_id, USER_ID, &db)
        .await
        .expect("note stored");
    assert_eq!(note.summary_text, "<p>a</p>\n<p>b</p>\n<p>c</p>\n");
    assert_eq!(note.flashcards, cards_for(&['a', 'c']));
    assert_eq!(note.enrichment_status, EnrichmentStatus::Complete);
    assert_eq!(outcome.report.summary().flashcards, 4);
}

#[tokio::test]
async fn empty_text_commits_empty_note_without_calls() {
    let db = setup_db().await;
    let services = Arc::new(MockServices::default());
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(40_000, FailurePolicy::Abort),
        services.clone(),
    );

    let outcome = pipeline
        .ingest(request(String::new(), None))
        .await
        .expect("empty input is not an error");

    assert!(services.calls().await.is_empty());
    assert_eq!(outcome.report.chunk_count(), 0);

    let note = Note::get_by_id(&outcome.note_id, USER_ID, &db)
        .await
        .expect("note stored");
    assert_eq!(note.summary_text, "");
    assert!(note.flashcards.is_empty());
    assert_eq!(note.original_text, "");
    assert_eq!(note.enrichment_status, EnrichmentStatus::Complete);
}

#[tokio::test]
async fn zero_chunk_bound_fails_before_any_write() {
    let db = setup_db().await;
    let services = Arc::new(MockServices::default());
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(0, FailurePolicy::Abort),
        services.clone(),
    );

    let result = pipeline.ingest(request("some text".into(), None)).await;

    assert!(matches!(result, Err(AppError::Chunking(_))));
    assert!(services.calls().await.is_empty());
    assert!(Note::get_by_user(USER_ID, &db)
        .await
        .expect("list notes")
        .is_empty());
}

#[tokio::test]
async fn typed_text_keeps_source_as_original_text() {
    let db = setup_db().await;
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(40_000, FailurePolicy::Abort),
        Arc::new(MockServices::default()),
    );

    let outcome = pipeline
        .ingest(request("threads and processes".into(), None))
        .await
        .expect("ingestion succeeds");

    let note = Note::get_by_id(&outcome.note_id, USER_ID, &db)
        .await
        .expect("note stored");
    assert_eq!(note.original_text, "threads and processes");
    assert_eq!(note.title, "Operating Systems");
    assert_eq!(note.summary_text, "<p>t</p>\n");
    assert_eq!(note.flashcards, cards_for(&['t']));
}

#[tokio::test]
async fn abort_policy_marks_note_failed_without_enrichment() {
    let db = setup_db().await;
    let services = Arc::new(MockServices {
        fail_summary_for: HashSet::from(['b']),
        ..MockServices::default()
    });
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(4, FailurePolicy::Abort),
        services.clone(),
    );

    let result = pipeline
        .ingest(request(lettered_text(&[('a', 4), ('b', 4), ('c', 4)]), None))
        .await;

    assert!(matches!(result, Err(AppError::LlmTimeout(1))));
    assert_eq!(
        services.calls().await,
        vec!["summarize:a", "flashcards:a", "summarize:b"]
    );

    let note = only_note(&db).await;
    assert_eq!(note.enrichment_status, EnrichmentStatus::Failed);
    assert_eq!(note.summary_text, "");
    assert!(note.flashcards.is_empty());
}

#[tokio::test]
async fn commit_partial_policy_keeps_chunks_before_failure() {
    let db = setup_db().await;
    let services = Arc::new(MockServices {
        fail_summary_for: HashSet::from(['b']),
        ..MockServices::default()
    });
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(4, FailurePolicy::CommitPartial),
        services,
    );

    let result = pipeline
        .ingest(request(
            lettered_text(&[('a', 4), ('b', 4), ('c', 4)]),
            Some("http://files.test/files/notes/student-1/y/os.docx"),
        ))
        .await;

    assert!(matches!(result, Err(AppError::LlmTimeout(1))));

    let note = only_note(&db).await;
    assert_eq!(note.enrichment_status, EnrichmentStatus::Partial);
    assert_eq!(note.summary_text, "<p>a</p>\n");
    assert_eq!(note.flashcards, cards_for(&['a']));
    assert_eq!(
        note.original_text,
        "http://files.test/files/notes/student-1/y/os.docx"
    );
}

#[tokio::test]
async fn concurrent_chunks_are_folded_in_chunk_order() {
    let db = setup_db().await;
    let services = Arc::new(MockServices {
        slow_chunks: HashSet::from(['a']),
        ..MockServices::default()
    });
    let mut config = pipeline_config(4, FailurePolicy::Abort);
    config.tuning.chunk_concurrency = 3;
    let pipeline = IngestionPipeline::with_services(Arc::clone(&db), config, services.clone());

    let outcome = pipeline
        .ingest(request(lettered_text(&[('a', 4), ('b', 4), ('c', 4)]), None))
        .await
        .expect("ingestion succeeds");

    let calls = services.calls().await;
    assert_eq!(calls.len(), 6);
    assert_ne!(
        calls.first().map(String::as_str),
        Some("summarize:a"),
        "slow chunk should finish after the others"
    );

    let indices: Vec<usize> = outcome.report.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    let note = Note::get_by_id(&outcome.note_id, USER_ID, &db)
        .await
        .expect("note stored");
    assert_eq!(note.summary_text, "<p>a</p>\n<p>b</p>\n<p>c</p>\n");
    assert_eq!(note.flashcards, cards_for(&['a', 'b', 'c']));
}

#[tokio::test]
async fn preview_summary_stores_nothing() {
    let db = setup_db().await;
    let services = Arc::new(MockServices::default());
    let pipeline = IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(4, FailurePolicy::Abort),
        services.clone(),
    );

    let preview = pipeline
        .preview_summary(&lettered_text(&[('x', 4), ('y', 2)]))
        .await
        .expect("preview");

    assert_eq!(preview, "<p>x</p>\n<p>y</p>");
    assert_eq!(services.calls().await, vec!["summarize:x", "summarize:y"]);
    assert!(Note::get_by_user(USER_ID, &db)
        .await
        .expect("list notes")
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingestion_runs_on_spawned_tasks() {
    let db = setup_db().await;
    let pipeline = Arc::new(IngestionPipeline::with_services(
        Arc::clone(&db),
        pipeline_config(2, FailurePolicy::Abort),
        Arc::new(MockServices::default()),
    ));

    let handle = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move {
            pipeline
                .ingest(request(lettered_text(&[('a', 2), ('b', 2)]), None))
                .await
        }
    });

    let outcome = handle
        .await
        .expect("ingestion task panicked")
        .expect("ingest");
    assert_eq!(outcome.status, EnrichmentStatus::Complete);
    assert_eq!(outcome.report.chunk_count(), 2);
}
