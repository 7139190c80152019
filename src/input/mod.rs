//! Input processing module
//! Handles document type detection and PDF text extraction

pub mod file_detector;
pub mod text_extractor;
pub mod manager;

pub use manager::{ExtractedDocument, InputManager};
