//! Embedding generation: pretrained encoders behind a shared, bounded handle

use crate::config::{Config, EmbeddingBackend, EmbeddingConfig, OverflowStrategy};
use crate::error::{AtsScorerError, Result};
use crate::processing::embedding_manager::{EmbeddingModelManager, ModelFiles};
use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tokio::sync::{OnceCell, Semaphore};

pub type EmbeddingVector = Vec<f32>;

/// A loaded model that maps text to a dense vector.
///
/// Implementations must be deterministic for identical input and weights.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<EmbeddingVector>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Encoder architectures selected by `model_type` in `config.json`.
enum Encoder {
    Bert(BertModel),
    DistilBert(DistilBertModel),
}

impl Encoder {
    /// Build the encoder described by `config_json`; also returns its hidden size.
    fn from_config(config_json: &str, vb: VarBuilder) -> Result<(Self, usize)> {
        let raw: Value = serde_json::from_str(config_json)
            .map_err(|e| AtsScorerError::Embedding(format!("Unreadable model config: {}", e)))?;
        let model_type = raw.get("model_type").and_then(Value::as_str).unwrap_or("bert");

        // BERT names the width `hidden_size`, DistilBERT `dim`.
        let (encoder, hidden_key) = match model_type {
            "distilbert" => {
                let config: DistilBertConfig = serde_json::from_value(raw.clone()).map_err(|e| {
                    AtsScorerError::Embedding(format!("Unsupported DistilBERT config: {}", e))
                })?;
                (Encoder::DistilBert(DistilBertModel::load(vb, &config)?), "dim")
            }
            _ => {
                let config: BertConfig = serde_json::from_value(raw.clone())
                    .map_err(|e| AtsScorerError::Embedding(format!("Unsupported model config: {}", e)))?;
                (Encoder::Bert(BertModel::load(vb, &config)?), "hidden_size")
            }
        };

        let hidden_size = raw
            .get(hidden_key)
            .and_then(Value::as_u64)
            .ok_or_else(|| AtsScorerError::Embedding(format!("Model config has no {}", hidden_key)))?;

        debug!("Built {} encoder with hidden size {}", model_type, hidden_size);
        Ok((encoder, hidden_size as usize))
    }

    /// Last hidden layer, (1, n, h).
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        match self {
            Encoder::Bert(model) => {
                let token_type_ids = input_ids.zeros_like()?;
                Ok(model.forward(input_ids, &token_type_ids, Some(attention_mask))?)
            }
            Encoder::DistilBert(model) => {
                // DistilBERT hides positions where its mask is non-zero.
                let (_, seq_len) = attention_mask.dims2()?;
                let masked = attention_mask
                    .ones_like()?
                    .sub(attention_mask)?
                    .to_dtype(DType::U8)?
                    .reshape((1, 1, 1, seq_len))?;
                Ok(model.forward(input_ids, &masked)?)
            }
        }
    }
}

/// BERT-family encoder run through candle; one vector per text by
/// mean-pooling the last hidden layer.
pub struct TransformerEmbedder {
    encoder: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
    overflow: OverflowStrategy,
    model_name: String,
}

impl TransformerEmbedder {
    pub fn load(files: &ModelFiles, settings: &EmbeddingConfig, device: Device) -> Result<Self> {
        let start_time = Instant::now();

        let config_json = std::fs::read_to_string(&files.config).map_err(|e| {
            AtsScorerError::Embedding(format!("Failed to read {}: {}", files.config.display(), e))
        })?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| AtsScorerError::Embedding(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: settings.max_tokens,
                ..Default::default()
            }))
            .map_err(|e| AtsScorerError::Embedding(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DTYPE, &device)? };
        let (encoder, hidden_size) = Encoder::from_config(&config_json, vb)?;

        info!(
            "Loaded transformer embedding model {} in {:.2?}",
            settings.model_id,
            start_time.elapsed()
        );

        Ok(Self {
            encoder,
            tokenizer,
            device,
            hidden_size,
            overflow: settings.overflow,
            model_name: settings.model_id.clone(),
        })
    }

    fn embed_encoding(&self, encoding: &Encoding) -> Result<Tensor> {
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self.encoder.forward(&input_ids, &attention_mask)?;

        // Mask-weighted mean over tokens: (1, n, h) -> (h)
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?;
        let pooled = summed.broadcast_div(&count)?.squeeze(0)?;
        Ok(pooled)
    }
}

impl Embedder for TransformerEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| AtsScorerError::Embedding(format!("Tokenization failed: {}", e)))?;

        let pooled = match self.overflow {
            OverflowStrategy::Truncate => self.embed_encoding(&encoding)?,
            OverflowStrategy::ChunkMean => {
                let mut windows = vec![self.embed_encoding(&encoding)?];
                for overflow in encoding.get_overflowing() {
                    windows.push(self.embed_encoding(overflow)?);
                }
                let count = windows.len();
                (Tensor::stack(&windows, 0)?.sum(0)? / count as f64)?
            }
        };

        Ok(pooled.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        self.hidden_size
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Model2Vec static embeddings.
pub struct StaticEmbedder {
    model: StaticModel,
    dimension: usize,
    model_name: String,
}

impl StaticEmbedder {
    pub fn load(files: &ModelFiles, settings: &EmbeddingConfig) -> Result<Self> {
        let start_time = Instant::now();
        let location = files
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.model_id));

        let model = StaticModel::from_pretrained(&location, None, None, None)
            .with_context(|| format!("Failed to load static model from {}", location.display()))?;
        let dimension = model.encode_single("").len();

        info!(
            "Loaded static embedding model {} in {:.2?}",
            settings.model_id,
            start_time.elapsed()
        );

        Ok(Self {
            model,
            dimension,
            model_name: settings.model_id.clone(),
        })
    }
}

impl Embedder for StaticEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        Ok(self.model.encode_single(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Get the best available device for inference (GPU if available, CPU fallback)
pub fn get_best_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA GPU for embeddings");
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal GPU for embeddings");
            return device;
        }
    }

    Device::Cpu
}

/// Shared entry point to the embedding model.
///
/// The model is loaded on first use and kept for the life of the provider.
/// Inference runs on the blocking pool, at most `max_concurrent_inferences`
/// at a time.
pub struct EmbeddingProvider {
    settings: EmbeddingConfig,
    models_dir: PathBuf,
    model: OnceCell<Arc<dyn Embedder>>,
    permits: Semaphore,
}

impl EmbeddingProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            settings: config.embedding.clone(),
            models_dir: config.models_dir().clone(),
            model: OnceCell::new(),
            permits: Semaphore::new(config.embedding.max_concurrent_inferences.max(1)),
        }
    }

    /// Wrap an already loaded model.
    pub fn with_embedder(embedder: Arc<dyn Embedder>, max_concurrent_inferences: usize) -> Self {
        let mut settings = Config::default().embedding;
        settings.model_id = embedder.model_name().to_string();
        settings.max_concurrent_inferences = max_concurrent_inferences.max(1);

        Self {
            settings,
            models_dir: PathBuf::new(),
            model: OnceCell::new_with(Some(embedder)),
            permits: Semaphore::new(max_concurrent_inferences.max(1)),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn handle(&self) -> Result<Arc<dyn Embedder>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let manager = EmbeddingModelManager::new(self.models_dir.clone());
                let files = manager
                    .ensure_model_files(&self.settings.model_id, &self.settings.revision)
                    .await?;
                let mut settings = self.settings.clone();
                settings.max_tokens = manager.token_budget(&settings.model_id, settings.max_tokens);

                tokio::task::spawn_blocking(move || -> Result<Arc<dyn Embedder>> {
                    match settings.backend {
                        EmbeddingBackend::Transformer => {
                            let embedder = TransformerEmbedder::load(&files, &settings, get_best_device())?;
                            Ok(Arc::new(embedder))
                        }
                        EmbeddingBackend::Static => Ok(Arc::new(StaticEmbedder::load(&files, &settings)?)),
                    }
                })
                .await
                .map_err(|e| AtsScorerError::Embedding(format!("Model loading task failed: {}", e)))?
            })
            .await?;
        Ok(model.clone())
    }

    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let model = self.handle().await?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AtsScorerError::Embedding(format!("Inference pool closed: {}", e)))?;

        let start_time = Instant::now();
        let text = text.to_string();
        let chars = text.len();
        let embedding = tokio::task::spawn_blocking(move || model.embed(&text))
            .await
            .map_err(|e| AtsScorerError::Embedding(format!("Inference task failed: {}", e)))??;

        debug!(
            "Embedded {} characters into {} dimensions in {:.2?}",
            chars,
            embedding.len(),
            start_time.elapsed()
        );
        Ok(embedding)
    }
}

/// Cosine similarity of two embeddings in [-1, 1]; 0 when either is empty or
/// has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(AtsScorerError::Embedding(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    if a.is_empty() {
        return Ok(0.0);
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
    }
}
