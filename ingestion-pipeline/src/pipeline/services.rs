use std::sync::Arc;

use async_trait::async_trait;
use common::{error::AppError, utils::llm::CompletionClient};

use crate::{flashcards::FlashcardGenerator, summarizer::Summarizer};

/// The completion-backed steps the pipeline runs per chunk.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn summarize(&self, chunk: &str) -> Result<String, AppError>;

    /// Raw flashcard response for a chunk summary.
    async fn generate_flashcards(&self, summary: &str) -> Result<String, AppError>;
}

pub struct DefaultPipelineServices {
    summarizer: Summarizer,
    flashcards: FlashcardGenerator,
}

impl DefaultPipelineServices {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            summarizer: Summarizer::new(Arc::clone(&client)),
            flashcards: FlashcardGenerator::new(client),
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn summarize(&self, chunk: &str) -> Result<String, AppError> {
        self.summarizer.summarize(chunk).await
    }

    async fn generate_flashcards(&self, summary: &str) -> Result<String, AppError> {
        self.flashcards.generate(summary).await
    }
}
