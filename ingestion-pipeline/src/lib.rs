#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod flashcards;
pub mod pipeline;
pub mod summarizer;
pub mod utils;

pub use flashcards::{parse_flashcards, FlashcardGenerator, FlashcardParseError};
pub use pipeline::{
    IngestionConfig, IngestionOutcome, IngestionPipeline, IngestionReport, IngestionRequest,
    IngestionTuning,
};
pub use summarizer::Summarizer;
