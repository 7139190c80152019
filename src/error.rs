//! Error handling for the ATS scorer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtsScorerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be opened or is not a readable PDF.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The embedding model is unavailable or inference failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The audit entry could not be persisted. Never fails a scoring call.
    #[error("Audit write error: {0}")]
    AuditWrite(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, AtsScorerError>;

/// Model2Vec reports through anyhow, only while loading a model. The
/// alternate format keeps the whole context chain.
impl From<anyhow::Error> for AtsScorerError {
    fn from(err: anyhow::Error) -> Self {
        AtsScorerError::Embedding(format!("{:#}", err))
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for AtsScorerError {
    fn from(err: candle_core::Error) -> Self {
        AtsScorerError::Embedding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_anyhow_context_chain_is_kept() {
        let failed: anyhow::Result<()> = Err(anyhow::anyhow!("missing embeddings tensor"));
        let err: AtsScorerError = failed.context("Failed to load static model").unwrap_err().into();

        match err {
            AtsScorerError::Embedding(message) => {
                assert!(message.contains("Failed to load static model"));
                assert!(message.contains("missing embeddings tensor"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
