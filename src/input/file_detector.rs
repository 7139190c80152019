//! File type detection

use std::path::Path;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// PDF readers accept the header anywhere in the first kilobyte.
const SIGNATURE_WINDOW: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum FileType {
    Pdf,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            _ => FileType::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unknown)
    }

    /// Sniff the content, ignoring whatever the extension claims.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
        if window.windows(PDF_SIGNATURE.len()).any(|w| w == PDF_SIGNATURE) {
            FileType::Pdf
        } else {
            FileType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("txt"), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("resume.pdf")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("resume")), FileType::Unknown);
    }

    #[test]
    fn test_signature_detection() {
        assert_eq!(FileType::from_bytes(b"%PDF-1.5\n%binary"), FileType::Pdf);
        assert_eq!(FileType::from_bytes(b"\xEF\xBB\xBF%PDF-1.7"), FileType::Pdf);
        assert_eq!(FileType::from_bytes(b"Python SQL Experience"), FileType::Unknown);
        assert_eq!(FileType::from_bytes(b""), FileType::Unknown);
    }
}
