//! End-to-end scoring: extraction, signals, combination and audit

use crate::config::Config;
use crate::error::{AtsScorerError, Result};
use crate::input::InputManager;
use crate::output::audit::{sink_from_config, AuditLogEntry, AuditSink};
use crate::processing::combiner::{combiner_from_config, Combiner, MatchScore};
use crate::processing::embeddings::EmbeddingProvider;
use crate::processing::signals::{SignalVector, SimilaritySignals};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Whether the audit entry for a successful call was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AuditOutcome {
    Recorded,
    Failed(String),
}

/// Result of one scoring call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: MatchScore,
    pub signals: SignalVector,
    pub resume: String,
    pub job: String,
    pub combiner: String,
    pub embedding_model: String,
    pub processing_time_ms: u64,
    pub audit: AuditOutcome,
}

/// Scores resumes against job descriptions.
///
/// Safe to share across tasks; the embedding model inside is loaded once.
pub struct Scorer {
    input: InputManager,
    signals: SimilaritySignals,
    combiner: Box<dyn Combiner>,
    audit: Arc<dyn AuditSink>,
}

impl Scorer {
    pub fn new(
        provider: Arc<EmbeddingProvider>,
        combiner: Box<dyn Combiner>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            input: InputManager::new(),
            signals: SimilaritySignals::new(provider),
            combiner,
            audit,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let provider = Arc::new(EmbeddingProvider::new(config));
        let combiner = combiner_from_config(&config.scoring)?;
        let audit = sink_from_config(&config.audit);
        Ok(Self::new(provider, combiner, audit))
    }

    pub fn signals(&self) -> &SimilaritySignals {
        &self.signals
    }

    /// Sinks may block on disk, so the write runs on the blocking pool.
    async fn record_audit(&self, entry: AuditLogEntry) -> AuditOutcome {
        let sink = Arc::clone(&self.audit);
        let written = tokio::task::spawn_blocking(move || sink.record(&entry))
            .await
            .map_err(|e| AtsScorerError::AuditWrite(format!("Audit task failed: {}", e)))
            .and_then(|result| result);

        match written {
            Ok(()) => AuditOutcome::Recorded,
            Err(e) => {
                warn!("Score computed but audit entry was not written: {}", e);
                AuditOutcome::Failed(e.to_string())
            }
        }
    }

    /// Score `resume` against `job`.
    ///
    /// Extraction and embedding errors abort the call and no audit entry is
    /// written. An audit failure is reported in the returned report instead.
    pub async fn score(&self, resume: &Path, job: &Path) -> Result<ScoreReport> {
        let start_time = Instant::now();

        let resume_doc = self.input.extract(resume).await?;
        let job_doc = self.input.extract(job).await?;

        let signals = self.signals.compute(&resume_doc, &job_doc).await?;
        let score = self.combiner.score(&signals);

        info!("ATS match score for {} vs {}: {}%", resume_doc.id, job_doc.id, score);

        let entry = AuditLogEntry::new(&resume_doc.id, &job_doc.id, score, &signals);
        let audit = self.record_audit(entry).await;

        Ok(ScoreReport {
            score,
            signals,
            resume: resume_doc.id,
            job: job_doc.id,
            combiner: self.combiner.name(),
            embedding_model: self.signals.provider().model_id().to_string(),
            processing_time_ms: start_time.elapsed().as_millis() as u64,
            audit,
        })
    }
}
