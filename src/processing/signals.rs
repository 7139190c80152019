//! Similarity signals between a resume and a job description

use crate::error::Result;
use crate::input::ExtractedDocument;
use crate::processing::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::processing::text_processor::KeywordTokenizer;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub const SKILLS_SECTION: &str = "skills";
pub const EXPERIENCE_SECTION: &str = "experience";
pub const EDUCATION_SECTION: &str = "education";

/// The five signals, each in [0, 1]. Field order is the combiner's input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    pub semantic: f32,
    pub keyword_overlap: f32,
    pub skills: f32,
    pub experience: f32,
    pub education: f32,
}

impl SignalVector {
    pub const LEN: usize = 5;

    pub const NAMES: [&'static str; 5] = [
        "Semantic Similarity",
        "Keyword Overlap",
        "Skills Match",
        "Experience Match",
        "Education Match",
    ];

    pub fn to_array(&self) -> [f32; 5] {
        [
            self.semantic,
            self.keyword_overlap,
            self.skills,
            self.experience,
            self.education,
        ]
    }

    pub fn from_array(values: [f32; 5]) -> Self {
        Self {
            semantic: values[0],
            keyword_overlap: values[1],
            skills: values[2],
            experience: values[3],
            education: values[4],
        }
    }

    /// Signals rounded to three decimals, as written to the audit log.
    pub fn rounded(&self) -> Self {
        Self::from_array(self.to_array().map(|v| (v * 1000.0).round() / 1000.0))
    }

    pub fn named(&self) -> Vec<(&'static str, f32)> {
        Self::NAMES.iter().copied().zip(self.to_array()).collect()
    }
}

/// Computes the similarity signals. Every comparator is total: empty input
/// yields 0, never an error. Only embedding failures propagate.
pub struct SimilaritySignals {
    provider: Arc<EmbeddingProvider>,
    tokenizer: KeywordTokenizer,
}

impl SimilaritySignals {
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self {
            provider,
            tokenizer: KeywordTokenizer::new(),
        }
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Cosine similarity of the two embeddings; negative values floor to 0.
    pub async fn semantic_similarity(&self, a: &str, b: &str) -> Result<f32> {
        let emb_a = self.provider.embed(a).await?;
        let emb_b = self.provider.embed(b).await?;
        let cosine = cosine_similarity(&emb_a, &emb_b)?;
        Ok(cosine.clamp(0.0, 1.0))
    }

    /// Sum of per-token minimum counts over sum of per-token maximum counts.
    pub fn keyword_overlap(&self, a: &str, b: &str) -> f32 {
        let freq_a = self.tokenizer.term_frequencies(a);
        let freq_b = self.tokenizer.term_frequencies(b);

        let vocabulary: HashSet<&String> = freq_a.keys().chain(freq_b.keys()).collect();
        let (mut overlap, mut total) = (0usize, 0usize);
        for token in vocabulary {
            let count_a = freq_a.get(token).copied().unwrap_or(0);
            let count_b = freq_b.get(token).copied().unwrap_or(0);
            overlap += count_a.min(count_b);
            total += count_a.max(count_b);
        }

        if total == 0 {
            0.0
        } else {
            overlap as f32 / total as f32
        }
    }

    /// Semantic similarity restricted to the lines mentioning `keyword`.
    /// Returns 0 when either side has no such line.
    pub async fn section_similarity(&self, resume: &str, job: &str, keyword: &str) -> Result<f32> {
        let resume_section = extract_section(resume, keyword);
        let job_section = extract_section(job, keyword);

        if resume_section.is_empty() || job_section.is_empty() {
            return Ok(0.0);
        }

        self.semantic_similarity(&resume_section, &job_section).await
    }

    /// All five signals, computed in combiner order.
    pub async fn compute(&self, resume: &ExtractedDocument, job: &ExtractedDocument) -> Result<SignalVector> {
        let resume_lines = resume.line_text();
        let job_lines = job.line_text();

        let signals = SignalVector {
            semantic: self.semantic_similarity(resume.text.as_str(), job.text.as_str()).await?,
            keyword_overlap: self.keyword_overlap(resume.text.as_str(), job.text.as_str()),
            skills: self.section_similarity(&resume_lines, &job_lines, SKILLS_SECTION).await?,
            experience: self.section_similarity(&resume_lines, &job_lines, EXPERIENCE_SECTION).await?,
            education: self.section_similarity(&resume_lines, &job_lines, EDUCATION_SECTION).await?,
        };

        debug!("Signals for {} vs {}: {:?}", resume.id, job.id, signals);
        Ok(signals)
    }
}

/// Lines containing `keyword` (case-insensitive), joined with a space.
pub fn extract_section(text: &str, keyword: &str) -> String {
    let keyword = keyword.to_lowercase();
    text.lines()
        .map(str::to_lowercase)
        .filter(|line| line.contains(&keyword))
        .collect::<Vec<_>>()
        .join(" ")
}
