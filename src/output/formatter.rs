//! Output formatters for score reports

use crate::config::OutputFormat;
use crate::error::Result;
use crate::processing::scorer::{AuditOutcome, ScoreReport};
use colored::{Color, Colorize};

pub trait OutputFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for API integration and structured data
pub struct JsonFormatter {
    pretty: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn score_color(score: f32) -> Color {
        match score {
            s if s >= 75.0 => Color::Green,
            s if s >= 50.0 => Color::Cyan,
            s if s >= 25.0 => Color::Yellow,
            _ => Color::Red,
        }
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.use_colors {
            text.color(color).bold().to_string()
        } else {
            text
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        let mut out = String::new();
        let score = report.score.value();

        out.push_str(&format!(
            "ATS Match Score: {}\n",
            self.paint(format!("{}%", report.score), Self::score_color(score))
        ));
        out.push_str(&format!("  Resume: {}\n", report.resume));
        out.push_str(&format!("  Job:    {}\n\n", report.job));

        for (name, value) in report.signals.named() {
            out.push_str(&format!("  - {}: {:.3}\n", name, value));
        }

        if self.detailed {
            out.push_str(&format!("\n  Combiner: {}\n", report.combiner));
            out.push_str(&format!("  Embedding model: {}\n", report.embedding_model));
            out.push_str(&format!("  Processing time: {}ms\n", report.processing_time_ms));
        }

        if let AuditOutcome::Failed(reason) = &report.audit {
            out.push_str(&format!(
                "\n{}\n",
                self.paint(format!("Warning: audit entry not written: {}", reason), Color::Yellow)
            ));
        }

        Ok(out)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

pub fn formatter_for(format: OutputFormat, use_colors: bool, detailed: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(use_colors, detailed)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::combiner::MatchScore;
    use crate::processing::signals::SignalVector;

    fn report(audit: AuditOutcome) -> ScoreReport {
        ScoreReport {
            score: MatchScore::from_unit(0.6789),
            signals: SignalVector::from_array([0.9, 0.8, 0.0, 0.5, 0.25]),
            resume: "resume.pdf".to_string(),
            job: "job.pdf".to_string(),
            combiner: "weighted-sum".to_string(),
            embedding_model: "all-minilm-l6-v2".to_string(),
            processing_time_ms: 42,
            audit,
        }
    }

    #[test]
    fn test_console_lists_every_signal() {
        let formatter = ConsoleFormatter::new(false, true);
        let text = formatter.format_report(&report(AuditOutcome::Recorded)).unwrap();

        assert!(text.contains("ATS Match Score: 67.89%"));
        for name in SignalVector::NAMES {
            assert!(text.contains(name), "missing {}", name);
        }
        assert!(text.contains("Combiner: weighted-sum"));
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn test_console_warns_on_audit_failure() {
        let formatter = ConsoleFormatter::new(false, false);
        let text = formatter
            .format_report(&report(AuditOutcome::Failed("disk full".to_string())))
            .unwrap();
        assert!(text.contains("audit entry not written: disk full"));
    }

    #[test]
    fn test_json_output() {
        let formatter = formatter_for(OutputFormat::Json, false, false);
        let json = formatter.format_report(&report(AuditOutcome::Recorded)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!((value["score"].as_f64().unwrap() - 67.89).abs() < 1e-3);
        assert!((value["signals"]["keyword_overlap"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(formatter.supports_format(), OutputFormat::Json);
    }
}
