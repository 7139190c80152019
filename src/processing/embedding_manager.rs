//! Embedding model management: catalog lookup, local resolution and download

use crate::config::EmbeddingBackend;
use crate::error::{AtsScorerError, Result};
use hf_hub::api::tokio::Api;
use hf_hub::{Repo, RepoType};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Information about a known embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelInfo {
    pub name: String,
    pub repo_id: String,
    pub size_mb: u64,
    pub description: String,
    pub backend: EmbeddingBackend,
    pub dimensions: u32,
    pub max_tokens: usize,
}

/// Files needed to load an embedding model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub dir: Option<PathBuf>,
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

const REQUIRED_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Resolves model ids to files on disk, downloading from the Hugging Face hub
/// when they are not already present under `models_dir`.
pub struct EmbeddingModelManager {
    models_dir: PathBuf,
    available_models: HashMap<String, EmbeddingModelInfo>,
}

impl EmbeddingModelManager {
    pub fn new(models_dir: PathBuf) -> Self {
        let mut manager = Self {
            models_dir,
            available_models: HashMap::new(),
        };
        manager.init_available_models();
        manager
    }

    fn init_available_models(&mut self) {
        self.available_models.insert(
            "all-minilm-l6-v2".to_string(),
            EmbeddingModelInfo {
                name: "all-MiniLM-L6-v2".to_string(),
                repo_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                size_mb: 90,
                description: "Compact BERT sentence encoder trained for mean pooling".to_string(),
                backend: EmbeddingBackend::Transformer,
                dimensions: 384,
                max_tokens: 512,
            },
        );

        self.available_models.insert(
            "bge-small-en".to_string(),
            EmbeddingModelInfo {
                name: "BGE Small EN v1.5".to_string(),
                repo_id: "BAAI/bge-small-en-v1.5".to_string(),
                size_mb: 133,
                description: "Small BERT retrieval encoder".to_string(),
                backend: EmbeddingBackend::Transformer,
                dimensions: 384,
                max_tokens: 512,
            },
        );

        self.available_models.insert(
            "distilbert-base-uncased".to_string(),
            EmbeddingModelInfo {
                name: "DistilBERT base uncased".to_string(),
                repo_id: "distilbert/distilbert-base-uncased".to_string(),
                size_mb: 268,
                description: "Distilled BERT encoder, 768 dimensions".to_string(),
                backend: EmbeddingBackend::Transformer,
                dimensions: 768,
                max_tokens: 512,
            },
        );

        self.available_models.insert(
            "bert-base-uncased".to_string(),
            EmbeddingModelInfo {
                name: "BERT base uncased".to_string(),
                repo_id: "google-bert/bert-base-uncased".to_string(),
                size_mb: 440,
                description: "General-purpose 768-dimensional encoder".to_string(),
                backend: EmbeddingBackend::Transformer,
                dimensions: 768,
                max_tokens: 512,
            },
        );

        self.available_models.insert(
            "potion-base-8M".to_string(),
            EmbeddingModelInfo {
                name: "Potion Base 8M".to_string(),
                repo_id: "minishlab/potion-base-8M".to_string(),
                size_mb: 33,
                description: "Model2Vec static embeddings, fast on CPU".to_string(),
                backend: EmbeddingBackend::Static,
                dimensions: 256,
                max_tokens: 512,
            },
        );
    }

    /// Resolve model ID from various formats (catalog id, repo_id, name)
    pub fn resolve_model_id(&self, input: &str) -> Option<String> {
        if self.available_models.contains_key(input) {
            return Some(input.to_string());
        }

        for (id, info) in &self.available_models {
            if info.repo_id == input {
                return Some(id.clone());
            }
        }

        let input_lower = input.to_lowercase();
        for (id, info) in &self.available_models {
            if info.name.to_lowercase() == input_lower {
                return Some(id.clone());
            }
        }

        None
    }

    pub fn get_model_info(&self, model_id: &str) -> Option<&EmbeddingModelInfo> {
        self.resolve_model_id(model_id)
            .and_then(|id| self.available_models.get(&id))
    }

    /// Catalog entries sorted by id.
    pub fn list_available_models(&self) -> Vec<(&String, &EmbeddingModelInfo)> {
        let mut models: Vec<_> = self.available_models.iter().collect();
        models.sort_by(|a, b| a.0.cmp(b.0));
        models
    }

    /// Hub repo id for a catalog entry, or the input itself when unknown.
    pub fn repo_id_for(&self, model_id: &str) -> String {
        self.get_model_info(model_id)
            .map(|info| info.repo_id.clone())
            .unwrap_or_else(|| model_id.to_string())
    }

    /// Token budget for `model_id`: the requested one, capped at the context
    /// limit of catalog models.
    pub fn token_budget(&self, model_id: &str, requested: usize) -> usize {
        match self.get_model_info(model_id) {
            Some(info) if requested > info.max_tokens => {
                warn!(
                    "max_tokens {} exceeds the {}-token context of {}; using {}",
                    requested, info.max_tokens, info.name, info.max_tokens
                );
                info.max_tokens
            }
            _ => requested,
        }
    }

    /// Local directory a model is expected in.
    pub fn local_dir(&self, model_id: &str) -> PathBuf {
        let key = self.resolve_model_id(model_id).unwrap_or_else(|| model_id.replace('/', "--"));
        self.models_dir.join(key)
    }

    pub async fn is_model_downloaded(&self, model_id: &str) -> bool {
        Self::is_complete_model_dir(&self.local_dir(model_id)).await
    }

    async fn is_complete_model_dir(path: &Path) -> bool {
        for file in REQUIRED_FILES {
            if fs::metadata(path.join(file)).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Return model files, downloading them into `models_dir` when missing.
    pub async fn ensure_model_files(&self, model_id: &str, revision: &str) -> Result<ModelFiles> {
        let as_path = PathBuf::from(model_id);
        let dir = if Self::is_complete_model_dir(&as_path).await {
            as_path
        } else {
            let local = self.local_dir(model_id);
            if !Self::is_complete_model_dir(&local).await {
                self.download_model(model_id, revision).await?;
            }
            local
        };

        Ok(ModelFiles {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
            dir: Some(dir),
        })
    }

    /// Download the files of a model from the Hugging Face hub.
    pub async fn download_model(&self, model_id: &str, revision: &str) -> Result<PathBuf> {
        let repo_id = self.repo_id_for(model_id);
        let model_dir = self.local_dir(model_id);

        info!("Downloading embedding model {} ({}) into {}", model_id, repo_id, model_dir.display());

        fs::create_dir_all(&model_dir).await.map_err(|e| {
            AtsScorerError::Embedding(format!("Failed to create model directory: {}", e))
        })?;

        let api = Api::new()
            .map_err(|e| AtsScorerError::Embedding(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(Repo::with_revision(repo_id.clone(), RepoType::Model, revision.to_string()));

        for file in REQUIRED_FILES {
            let cached = repo.get(file).await.map_err(|e| {
                AtsScorerError::ModelNotFound(format!("{}: failed to download {}: {}", repo_id, file, e))
            })?;
            fs::copy(&cached, model_dir.join(file)).await.map_err(|e| {
                AtsScorerError::Embedding(format!("Failed to copy {}: {}", file, e))
            })?;
            info!("Downloaded {}", file);
        }

        Ok(model_dir)
    }
}
