//! Append-only audit trail of scoring calls

use crate::config::{AuditConfig, AuditSinkKind};
use crate::error::{AtsScorerError, Result};
use crate::processing::combiner::MatchScore;
use crate::processing::signals::SignalVector;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub resume: String,
    pub job: String,
    pub score: MatchScore,
    /// Rounded to three decimals.
    pub signals: SignalVector,
}

impl AuditLogEntry {
    pub fn new(resume: &str, job: &str, score: MatchScore, signals: &SignalVector) -> Self {
        Self {
            timestamp: Utc::now(),
            resume: resume.to_string(),
            job: job.to_string(),
            score,
            signals: signals.rounded(),
        }
    }
}

/// Destination for audit entries. Implementations must tolerate concurrent
/// callers without interleaving entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditLogEntry) -> Result<()>;
}

/// Newline-delimited JSON appended to a file.
pub struct FileAuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| AtsScorerError::AuditWrite(format!("Failed to serialize entry: {}", e)))?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|_| AtsScorerError::AuditWrite("audit log lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AtsScorerError::AuditWrite(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AtsScorerError::AuditWrite(format!("Failed to open {}: {}", self.path.display(), e)))?;

        file.write_all(line.as_bytes())
            .map_err(|e| AtsScorerError::AuditWrite(format!("Failed to write {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

/// Emits entries on the `audit` log target.
#[derive(Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        let line = serde_json::to_string(entry)
            .map_err(|e| AtsScorerError::AuditWrite(format!("Failed to serialize entry: {}", e)))?;
        info!(target: "audit", "{}", line);
        Ok(())
    }
}

pub fn sink_from_config(config: &AuditConfig) -> Arc<dyn AuditSink> {
    match config.sink {
        AuditSinkKind::File => Arc::new(FileAuditLog::new(config.log_path.clone())),
        AuditSinkKind::Log => Arc::new(LogAuditSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(score: f32) -> AuditLogEntry {
        AuditLogEntry::new(
            "resume.pdf",
            "job.pdf",
            MatchScore::from_unit(score),
            &SignalVector::from_array([0.12345, 0.5, 0.0, 1.0, 0.6666]),
        )
    }

    #[test]
    fn test_file_log_appends_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = FileAuditLog::new(temp_dir.path().join("logs").join("audit.jsonl"));

        log.record(&entry(0.5)).unwrap();
        log.record(&entry(0.25)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let entries: Vec<AuditLogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].score.value(), 50.0);
        assert_eq!(entries[1].score.value(), 25.0);
        assert!((entries[0].signals.semantic - 0.123).abs() < 1e-6);
        assert!((entries[0].signals.education - 0.667).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let log = Arc::new(FileAuditLog::new(temp_dir.path().join("audit.jsonl")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        log.record(&entry(i as f32 / 10.0)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 80);
        for line in content.lines() {
            assert!(serde_json::from_str::<AuditLogEntry>(line).is_ok());
        }
    }

    #[test]
    fn test_unwritable_path_is_audit_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let log = FileAuditLog::new(temp_dir.path());
        assert!(matches!(log.record(&entry(0.5)), Err(AtsScorerError::AuditWrite(_))));
    }
}
