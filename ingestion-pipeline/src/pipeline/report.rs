use common::storage::types::note::EnrichmentStatus;
use serde::Serialize;

use crate::flashcards::FlashcardParseError;

/// What happened to one chunk during enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub index: usize,
    pub chunk_chars: usize,
    pub summary_chars: usize,
    /// Number of cards kept, or why the flashcard response was dropped.
    pub flashcards: Result<usize, FlashcardParseError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub chunks: Vec<ChunkReport>,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn flashcard_count(&self) -> usize {
        self.chunks
            .iter()
            .filter_map(|chunk| chunk.flashcards.as_ref().ok())
            .sum()
    }

    pub fn parse_failures(&self) -> impl Iterator<Item = &FlashcardParseError> {
        self.chunks
            .iter()
            .filter_map(|chunk| chunk.flashcards.as_ref().err())
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            chunks: self.chunk_count(),
            flashcards: self.flashcard_count(),
            unparsed_flashcard_chunks: self.parse_failures().map(|e| e.chunk_index).collect(),
        }
    }
}

/// Serializable digest of an [`IngestionReport`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub chunks: usize,
    pub flashcards: usize,
    pub unparsed_flashcard_chunks: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub note_id: String,
    pub status: EnrichmentStatus,
    pub report: IngestionReport,
}
