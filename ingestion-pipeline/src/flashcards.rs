use std::sync::Arc;

use common::{error::AppError, storage::types::flashcard::Flashcard, utils::llm::CompletionClient};
use thiserror::Error;

use crate::utils::{
    code_fence::strip_code_fences,
    llm_instructions::{
        FLASHCARD_INSTRUCTIONS, FLASHCARD_OUTPUT_SCHEMA, FLASHCARD_PREAMBLE,
        FLASHCARD_SYSTEM_MESSAGE,
    },
    prompt::PromptTemplate,
};

const PAYLOAD_PREVIEW_CHARS: usize = 200;

/// A chunk whose flashcard response could not be read as a card list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("flashcards for chunk {chunk_index} could not be parsed: {reason}")]
pub struct FlashcardParseError {
    pub chunk_index: usize,
    pub reason: String,
    pub raw_payload: String,
}

impl FlashcardParseError {
    /// Start of the raw payload, for log lines.
    pub fn payload_preview(&self) -> String {
        let mut preview: String = self.raw_payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
        if self.raw_payload.chars().count() > PAYLOAD_PREVIEW_CHARS {
            preview.push('…');
        }
        preview
    }
}

/// Asks the model for flashcards covering a chunk summary.
pub struct FlashcardGenerator {
    client: Arc<dyn CompletionClient>,
    template: PromptTemplate,
}

impl FlashcardGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            template: Self::default_template(),
        }
    }

    pub fn default_template() -> PromptTemplate {
        PromptTemplate::new(FLASHCARD_SYSTEM_MESSAGE)
            .preamble(FLASHCARD_PREAMBLE)
            .instructions(FLASHCARD_INSTRUCTIONS)
            .input_label("Text to analyze")
            .input_delimiter("---")
            .output_schema(FLASHCARD_OUTPUT_SCHEMA)
    }

    /// Returns the trimmed raw response. Parsing is left to [`parse_flashcards`].
    pub async fn generate(&self, summary_chunk: &str) -> Result<String, AppError> {
        let raw = self
            .client
            .complete(self.template.render(summary_chunk))
            .await?;
        Ok(raw.trim().to_string())
    }
}

/// Parse a flashcard response into cards, tolerating a wrapping code fence.
pub fn parse_flashcards(chunk_index: usize, raw: &str) -> Result<Vec<Flashcard>, FlashcardParseError> {
    serde_json::from_str::<Vec<Flashcard>>(strip_code_fences(raw)).map_err(|err| {
        FlashcardParseError {
            chunk_index,
            reason: err.to_string(),
            raw_payload: raw.to_string(),
        }
    })
}
