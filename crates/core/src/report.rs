//! Report row assembly and the append-only CSV writer.

use crate::models::{ClassifiedGrid, ClassifiedPaper, ScoredTerm};
use anyhow::Context;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

pub const HEADERS: [&str; 10] = [
    "Submission Number",
    "Device",
    "Company",
    "Category",
    "Date of Approval",
    "Level 1 - Algorithms Found",
    "Level 2 - Filtered Keywords",
    "Level 4 - Input Format",
    "Alt Keywords Level 2",
    "Security Attacks Found",
];

/// One finished row, columns in header order.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub submission_number: String,
    pub device: String,
    pub company: String,
    pub category: String,
    pub date_of_approval: String,
    /// The three analysis blocks plus the alt-keyword block.
    pub results: Vec<String>,
    /// One entry per attack section; joined with " || " in the cell.
    pub search_results: Vec<String>,
}

impl ReportRow {
    fn into_record(self) -> Vec<String> {
        let mut record = vec![
            self.submission_number,
            self.device,
            self.company,
            self.category,
            self.date_of_approval,
        ];
        for i in 0..4 {
            match self.results.get(i) {
                Some(block) => record.push(flatten_cell(block)),
                None => record.push("No data available".to_string()),
            }
        }
        if self.search_results.is_empty() {
            record.push("No security attacks found".to_string());
        } else {
            let joined = self
                .search_results
                .iter()
                .map(|s| flatten_cell(s))
                .collect::<Vec<_>>()
                .join(" || ");
            record.push(joined);
        }
        record
    }
}

/// A failed document still produces a full-width row so column counts stay
/// consistent across the file.
pub fn error_row(submission_number: &str, error: &str) -> ReportRow {
    // Cap by chars, not bytes: error text may carry multibyte characters
    // from file paths and a byte cut could land mid-character.
    let message: String = format!("Processing failed: {error}")
        .chars()
        .take(120)
        .collect();
    ReportRow {
        submission_number: submission_number.to_string(),
        device: "Error".into(),
        company: "Error".into(),
        category: "Error".into(),
        date_of_approval: "Error".into(),
        results: vec![
            message,
            "Error in analysis".into(),
            "Error in analysis".into(),
            "Error in analysis".into(),
        ],
        search_results: vec!["No attacks found due to processing error".into()],
    }
}

/// Newlines inside a cell become " | " so each row stays one CSV line when
/// eyeballed in a spreadsheet.
fn flatten_cell(text: &str) -> String {
    text.replace('\r', "").replace('\n', " | ")
}

/// "1. keyword" per line, with a placeholder for the empty case.
pub fn numbered_keywords(keywords: &[String]) -> String {
    if keywords.is_empty() {
        return "No alternative keywords found".to_string();
    }
    keywords
        .iter()
        .enumerate()
        .map(|(i, k)| format!("{}. {}", i + 1, k))
        .collect::<Vec<_>>()
        .join("\n")
}

fn paper_line(paper: &ClassifiedPaper, with_label: bool) -> String {
    let p = &paper.paper;
    let mut line = format!("{} {} {}", p.title, p.abstract_text, p.url);
    if with_label {
        line.push_str(&format!(" [{}]", paper.label));
    }
    line
}

fn grid_sections(
    grid: &ClassifiedGrid,
    candidates: &[ScoredTerm],
    prefixes: &[String],
    with_labels: bool,
) -> Vec<String> {
    let mut sections = Vec::new();
    for (i, row) in grid.iter().enumerate() {
        let Some(prefix) = prefixes.get(i) else {
            break;
        };
        for (j, papers) in row.iter().enumerate() {
            let Some(candidate) = candidates.get(j) else {
                continue;
            };
            if papers.is_empty() {
                continue;
            }
            let mut lines = vec![format!("{prefix}{}", candidate.text)];
            lines.extend(papers.iter().map(|p| paper_line(p, with_labels)));
            sections.push(lines.join("\n"));
        }
    }
    sections
}

/// Flatten the Level 4 grids into prefixed text sections, rejected papers
/// under their own divider.
pub fn security_attacks_block(
    attacks: &ClassifiedGrid,
    rejected: &ClassifiedGrid,
    candidates: &[ScoredTerm],
    prefixes: &[String],
) -> Vec<String> {
    let mut sections = grid_sections(attacks, candidates, prefixes, true);
    let rejected_sections = grid_sections(rejected, candidates, prefixes, false);
    if !rejected_sections.is_empty() {
        sections.push("Rejected Papers:".to_string());
        sections.extend(rejected_sections);
    }
    sections
}

/// Append-only CSV report. The header goes out at open time and every row
/// is flushed immediately, so a crash keeps all completed documents.
pub struct ReportWriter {
    writer: csv::Writer<File>,
}

impl ReportWriter {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("creating report file {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(HEADERS)?;
        writer.flush()?;
        info!(path = %path.display(), "report file initialized");
        Ok(Self { writer })
    }

    pub fn append(&mut self, row: ReportRow) -> anyhow::Result<()> {
        let submission = row.submission_number.clone();
        self.writer.write_record(row.into_record())?;
        self.writer.flush().context("flushing report row")?;
        debug!(%submission, "report row written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttackLabel, PaperRecord};

    fn classified(title: &str, label: AttackLabel) -> ClassifiedPaper {
        ClassifiedPaper {
            paper: PaperRecord {
                title: title.into(),
                abstract_text: "abs".into(),
                url: "https://x.example/p".into(),
            },
            label,
        }
    }

    #[test]
    fn numbered_keywords_formats_or_placeholders() {
        assert_eq!(
            numbered_keywords(&["XGBoost".into(), "U-Net".into()]),
            "1. XGBoost\n2. U-Net"
        );
        assert_eq!(numbered_keywords(&[]), "No alternative keywords found");
    }

    #[test]
    fn attack_sections_carry_prefix_headers_and_labels() {
        let candidates = vec![ScoredTerm::new(0.9, "XGBoost")];
        let prefixes = vec![
            "Security Attacks on ".to_string(),
            "Inference time attacks on ".to_string(),
            "Training time attacks on ".to_string(),
        ];
        let attacks: ClassifiedGrid = vec![
            vec![vec![classified("evasion study", AttackLabel::InferenceTime)]],
            vec![vec![]],
            vec![vec![]],
        ];
        let rejected: ClassifiedGrid = vec![vec![vec![]], vec![vec![]], vec![vec![]]];

        let sections = security_attacks_block(&attacks, &rejected, &candidates, &prefixes);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].starts_with("Security Attacks on XGBoost\n"));
        assert!(sections[0].contains("[inference-time attack]"));
    }

    #[test]
    fn rejected_papers_get_their_own_divider() {
        let candidates = vec![ScoredTerm::new(0.9, "XGBoost")];
        let prefixes = vec!["Security Attacks on ".to_string()];
        let attacks: ClassifiedGrid = vec![vec![vec![]]];
        let rejected: ClassifiedGrid =
            vec![vec![vec![classified("unrelated", AttackLabel::Rejected)]]];

        let sections = security_attacks_block(&attacks, &rejected, &candidates, &prefixes);
        assert_eq!(sections[0], "Rejected Papers:");
        assert!(sections[1].starts_with("Security Attacks on XGBoost"));
        assert!(!sections[1].contains("[rejected]"));
    }

    #[test]
    fn rows_always_span_all_columns() {
        let record = error_row("K000001", "summary missing").into_record();
        assert_eq!(record.len(), HEADERS.len());
        assert!(record[5].starts_with("Processing failed"));
        assert_eq!(record[9], "No attacks found due to processing error");
    }

    #[test]
    fn error_row_caps_multibyte_messages_on_char_boundaries() {
        // A two-byte char straddling the old byte cutoff must not panic.
        let error = format!("{}é and more", "a".repeat(100));
        let record = error_row("K000001", &error).into_record();
        assert!(record[5].starts_with("Processing failed"));
        assert_eq!(record[5].chars().count(), 120);
        assert!(record[5].contains('é'));
    }

    #[test]
    fn cells_flatten_newlines() {
        let row = ReportRow {
            submission_number: "K000001".into(),
            device: "d".into(),
            company: "c".into(),
            category: "cat".into(),
            date_of_approval: "2020-01-01".into(),
            results: vec!["1. a\n2. b".into()],
            search_results: vec!["x\ny".into(), "z".into()],
        };
        let record = row.into_record();
        assert_eq!(record[5], "1. a | 2. b");
        assert_eq!(record[6], "No data available");
        assert_eq!(record[9], "x | y || z");
    }

    #[test]
    fn writer_emits_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.csv");
        let mut writer = ReportWriter::create(&path).unwrap();
        writer.append(error_row("K000001", "boom")).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Submission Number,"));
        assert!(lines.next().unwrap().starts_with("K000001,"));
    }
}
