//! Shared helpers: PDF fixtures and an offline embedder

#![allow(dead_code)]

use ats_scorer::error::{AtsScorerError, Result};
use ats_scorer::output::audit::{AuditSink, FileAuditLog};
use ats_scorer::processing::combiner::WeightedSumCombiner;
use ats_scorer::processing::embeddings::{Embedder, EmbeddingProvider, EmbeddingVector};
use ats_scorer::Scorer;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DIMENSIONS: usize = 64;

/// Feature-hashing bag of words. Deterministic, no model download.
pub struct HashingEmbedder;

impl HashingEmbedder {
    fn bucket(word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % DIMENSIONS as u64) as usize
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut v = vec![0.0; DIMENSIONS];
        for word in text.split_whitespace() {
            v[Self::bucket(word)] += 1.0;
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

/// Always fails, as an unavailable model would.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Err(AtsScorerError::Embedding("model unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}

pub fn scorer_with(embedder: Arc<dyn Embedder>, audit: Arc<dyn AuditSink>) -> Scorer {
    let provider = Arc::new(EmbeddingProvider::with_embedder(embedder, 2));
    Scorer::new(provider, Box::new(WeightedSumCombiner::default()), audit)
}

pub fn hashing_scorer(audit_path: &Path) -> Scorer {
    scorer_with(Arc::new(HashingEmbedder), Arc::new(FileAuditLog::new(audit_path)))
}

/// Write a single-page PDF with one text line per entry of `lines`.
pub fn write_pdf(path: &Path, lines: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("Td", vec![0.into(), (-24).into()]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();

    path.to_path_buf()
}
