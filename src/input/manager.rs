//! Input manager turning document paths into normalized text

use crate::error::{AtsScorerError, Result};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{PdfExtractor, TextExtractor};
use crate::processing::normalizer::{normalize, normalize_lines, NormalizedText};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document after extraction and normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Path the document was read from.
    pub id: String,
    /// Whole document as one normalized string.
    pub text: NormalizedText,
    /// Normalized non-empty lines in reading order.
    pub lines: Vec<NormalizedText>,
}

impl ExtractedDocument {
    pub fn from_raw(id: impl Into<String>, raw: &str) -> Self {
        Self {
            id: id.into(),
            text: normalize(raw),
            lines: normalize_lines(raw),
        }
    }

    /// Normalized lines joined with newlines, the input shape section
    /// signals expect.
    pub fn line_text(&self) -> String {
        self.lines
            .iter()
            .map(NormalizedText::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reads documents once per call; nothing is cached between scoring calls.
#[derive(Debug, Default, Clone)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        if !path.exists() {
            return Err(AtsScorerError::Extraction(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        if FileType::from_path(path) != FileType::Pdf {
            return Err(AtsScorerError::Extraction(format!(
                "Unsupported file type for: {} (expected .pdf)",
                path.display()
            )));
        }

        info!("Extracting text from PDF: {}", path.display());
        let raw = PdfExtractor.extract(path).await?;

        let document = ExtractedDocument::from_raw(path.to_string_lossy(), &raw);
        debug!(
            "Extracted {} normalized characters over {} lines from {}",
            document.text.len(),
            document.lines.len(),
            path.display()
        );
        Ok(document)
    }
}
