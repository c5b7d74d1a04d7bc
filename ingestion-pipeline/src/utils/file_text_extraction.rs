use std::io::{Cursor, Read};

use anyhow::Context;
use bytes::Bytes;
use common::error::AppError;
use quick_xml::{events::Event, Reader};
use tracing::debug;

/// Document types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Case-insensitive lookup of a file extension without the leading dot.
    pub fn from_extension(extension: &str) -> Result<Self, AppError> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "md" | "markdown" => Ok(Self::PlainText),
            other => Err(AppError::UnsupportedFormat(format!(
                "Unsupported file type: {}",
                if other.is_empty() { "<none>" } else { other }
            ))),
        }
    }

    pub fn from_file_name(file_name: &str) -> Result<Self, AppError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();
        Self::from_extension(extension)
    }
}

/// Pull plain text out of an uploaded document.
pub async fn extract_text(data: Bytes, format: DocumentFormat) -> Result<String, AppError> {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf_text(data).await?,
        DocumentFormat::Docx => {
            tokio::task::spawn_blocking(move || extract_docx_text(&data)).await??
        }
        DocumentFormat::PlainText => String::from_utf8(data.to_vec())
            .map_err(|_| AppError::Validation("Text file is not valid UTF-8".into()))?,
    };

    debug!(?format, text_chars = text.chars().count(), "extracted document text");

    Ok(text)
}

async fn extract_pdf_text(data: Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await?
        .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))
}

/// Reads `word/document.xml`: one line per paragraph, text from `w:t` runs.
fn extract_docx_text(data: &[u8]) -> Result<String, AppError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("opening docx container")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("docx container has no word/document.xml")?
        .read_to_string(&mut xml)
        .context("reading word/document.xml")?;

    paragraphs_from_document_xml(&xml)
}

fn paragraphs_from_document_xml(xml: &str) -> Result<String, AppError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event().context("parsing word/document.xml")? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run_text => {
                text.push_str(&e.unescape().context("decoding docx text run")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
