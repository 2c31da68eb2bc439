use serde::{Deserialize, Serialize};
use std::fmt;

pub use providers::PaperRecord;

/// A candidate algorithm/technique name with the QA model's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTerm {
    pub confidence: f64,
    pub text: String,
}

impl ScoredTerm {
    pub fn new(confidence: f64, text: impl Into<String>) -> Self {
        Self {
            confidence,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackLabel {
    InferenceTime,
    TrainingTime,
    Rejected,
}

impl fmt::Display for AttackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackLabel::InferenceTime => write!(f, "inference-time attack"),
            AttackLabel::TrainingTime => write!(f, "training-time attack"),
            AttackLabel::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPaper {
    pub paper: PaperRecord,
    pub label: AttackLabel,
}

/// Papers indexed `[prefix][candidate] -> hits`. Positions are preserved
/// even when a query comes back empty, so Level 4 and the report line up.
pub type PaperGrid = Vec<Vec<Vec<PaperRecord>>>;
pub type ClassifiedGrid = Vec<Vec<Vec<ClassifiedPaper>>>;

/// Per-document analysis state. Created fresh for every filing, flushed
/// into one report row, then discarded.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRun {
    /// Pooled, deduplicated Level 1 candidates.
    pub initial_results: Vec<ScoredTerm>,
    /// Web-validated subset, capped at `number_of_keywords`.
    pub filtered_results: Vec<ScoredTerm>,
    /// Answers to the input-format question, kept apart from the pool.
    pub additional_results: Vec<ScoredTerm>,
    /// Candidates that failed web validation.
    pub neglected_results: Vec<ScoredTerm>,
    /// LLM-filtered keyword texts from the independent Level 2 path.
    pub alt_keywords: Vec<String>,
}

/// One row of the FDA AI/ML-enabled device index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub submission_number: String,
    pub device: String,
    pub company: String,
    pub category: String,
    pub decision_date: String,
}

/// Supplementary data for a device from an external curated list.
#[derive(Debug, Clone, Default)]
pub struct KnownDevice {
    pub algorithm: Option<String>,
    pub description: Option<String>,
}
