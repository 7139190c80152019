//! ATS scorer library: resume to job description match scoring

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod processing;
pub mod output;

pub use config::Config;
pub use error::{AtsScorerError, Result};
pub use processing::combiner::MatchScore;
pub use processing::scorer::{AuditOutcome, ScoreReport, Scorer};
pub use processing::signals::SignalVector;
