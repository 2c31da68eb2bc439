//! Curated regex term sets: generic AI vocabulary and attack-type signals.

use crate::config::TermConfig;
use crate::models::AttackLabel;
use anyhow::Context;
use regex::Regex;

/// Compiled term lists. Pattern order is behavior: attack classification
/// checks inference-time patterns before training-time ones, first match
/// wins, so reordering a list changes labels.
#[derive(Debug, Clone)]
pub struct TermSets {
    /// Broad AI/ML vocabulary carrying no discriminating signal.
    generic: Vec<Regex>,
    /// Terminology a relevant search result page is expected to mention.
    relevance: Vec<Regex>,
    inference_time: Vec<Regex>,
    training_time: Vec<Regex>,
}

fn compile(patterns: &[String], list: &str) -> anyhow::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("bad {list} pattern: {p}")))
        .collect()
}

pub fn matches_any(text: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

impl TermSets {
    pub fn compile(cfg: &TermConfig) -> anyhow::Result<Self> {
        Ok(Self {
            generic: compile(&cfg.generic, "generic")?,
            relevance: compile(&cfg.relevance, "relevance")?,
            inference_time: compile(&cfg.inference_time, "inference-time")?,
            training_time: compile(&cfg.training_time, "training-time")?,
        })
    }

    pub fn is_generic(&self, text: &str) -> bool {
        matches_any(text, &self.generic)
    }

    pub fn relevance_patterns(&self) -> &[Regex] {
        &self.relevance
    }

    /// Classify a fetched paper page. No page content means no signal.
    pub fn attack_label(&self, page: Option<&str>) -> AttackLabel {
        let Some(text) = page else {
            return AttackLabel::Rejected;
        };
        if matches_any(text, &self.inference_time) {
            AttackLabel::InferenceTime
        } else if matches_any(text, &self.training_time) {
            AttackLabel::TrainingTime
        } else {
            AttackLabel::Rejected
        }
    }
}
