//! Configuration management for the ATS scorer

use crate::error::{AtsScorerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub embedding: EmbeddingConfig,
    pub scoring: ScoringConfig,
    pub audit: AuditConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// BERT-family encoder run through candle, mean-pooled.
    Transformer,
    /// Model2Vec static embeddings.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Drop every token past the budget.
    Truncate,
    /// Embed each budget-sized window and average the vectors.
    ChunkMean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Catalog id, hub repo id, or a directory under `models_dir`.
    pub model_id: String,
    pub revision: String,
    pub max_tokens: usize,
    pub overflow: OverflowStrategy,
    pub max_concurrent_inferences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinerKind {
    WeightedSum,
    Mlp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub semantic: f32,
    pub keyword: f32,
    pub skills: f32,
    pub experience: f32,
    pub education: f32,
}

impl SignalWeights {
    /// Weights in signal vector order.
    pub fn to_array(&self) -> [f32; 5] {
        [self.semantic, self.keyword, self.skills, self.experience, self.education]
    }

    pub fn sum(&self) -> f32 {
        self.to_array().iter().sum()
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            semantic: 0.35,
            keyword: 0.25,
            skills: 0.15,
            experience: 0.15,
            education: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub combiner: CombinerKind,
    pub mlp_weights_path: Option<PathBuf>,
    pub weights: SignalWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    File,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub sink: AuditSinkKind,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ats-scorer");

        Self {
            models: ModelConfig {
                models_dir: base_dir.join("models"),
            },
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Transformer,
                model_id: "all-minilm-l6-v2".to_string(),
                revision: "main".to_string(),
                max_tokens: 512,
                overflow: OverflowStrategy::Truncate,
                max_concurrent_inferences: 1,
            },
            scoring: ScoringConfig {
                combiner: CombinerKind::WeightedSum,
                mlp_weights_path: None,
                weights: SignalWeights::default(),
            },
            audit: AuditConfig {
                sink: AuditSinkKind::File,
                log_path: base_dir.join("ats_score_log.jsonl"),
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from `config_path`, writing defaults there on first use.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| AtsScorerError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AtsScorerError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("ats-scorer")
            .join("config.toml")
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn validate(&self) -> Result<()> {
        let weights = self.scoring.weights.to_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AtsScorerError::Configuration(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }
        if self.scoring.weights.sum() <= 0.0 {
            return Err(AtsScorerError::Configuration(
                "scoring weights must not all be zero".to_string(),
            ));
        }
        if self.scoring.combiner == CombinerKind::Mlp && self.scoring.mlp_weights_path.is_none() {
            return Err(AtsScorerError::Configuration(
                "the mlp combiner requires scoring.mlp_weights_path".to_string(),
            ));
        }
        if self.embedding.max_tokens < 8 {
            return Err(AtsScorerError::Configuration(format!(
                "embedding.max_tokens must be at least 8, got {}",
                self.embedding.max_tokens
            )));
        }
        if self.embedding.max_concurrent_inferences == 0 {
            return Err(AtsScorerError::Configuration(
                "embedding.max_concurrent_inferences must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
