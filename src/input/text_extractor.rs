//! Text extraction from PDF documents

use crate::error::{AtsScorerError, Result};
use crate::input::file_detector::FileType;
use std::path::Path;
use tokio::fs;

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Extracts the raw text of every page, concatenated in page order.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await.map_err(|e| {
            AtsScorerError::Extraction(format!("Failed to open '{}': {}", path.display(), e))
        })?;

        PdfExtractor::extract_from_bytes(&bytes, path)
    }
}

impl PdfExtractor {
    pub fn extract_from_bytes(bytes: &[u8], path: &Path) -> Result<String> {
        if FileType::from_bytes(bytes) != FileType::Pdf {
            return Err(AtsScorerError::Extraction(format!(
                "'{}' is not a PDF document",
                path.display()
            )));
        }

        // The parser decodes text streams lossily, so undecodable glyphs are
        // dropped here rather than surfacing as errors. Malformed object
        // graphs can panic inside the parser.
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| {
                AtsScorerError::Extraction(format!("PDF parser aborted on '{}'", path.display()))
            })?;

        extracted.map_err(|e| {
            AtsScorerError::Extraction(format!(
                "Failed to extract text from PDF '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let result = PdfExtractor::extract_from_bytes(b"plain text", Path::new("fake.pdf"));
        assert!(matches!(result, Err(AtsScorerError::Extraction(_))));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let result = PdfExtractor::extract_from_bytes(b"%PDF-1.5\n1 0 obj\n<<", Path::new("broken.pdf"));
        assert!(matches!(result, Err(AtsScorerError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_extraction_error() {
        let result = PdfExtractor.extract(Path::new("does/not/exist.pdf")).await;
        assert!(matches!(result, Err(AtsScorerError::Extraction(_))));
    }
}
