//! Normalization, embeddings, similarity signals and score combination

pub mod normalizer;
pub mod text_processor;
pub mod embeddings;
pub mod embedding_manager;
pub mod signals;
pub mod combiner;
pub mod scorer;
