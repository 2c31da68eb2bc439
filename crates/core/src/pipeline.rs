//! End-to-end pipeline: device selection, per-document funnel, report rows.

use crate::analyser::Analyser;
use crate::config::AppConfig;
use crate::dataset::{DeviceIndex, KnownDevices};
use crate::models::DeviceRecord;
use crate::reader;
use crate::report::{self, ReportRow, ReportWriter};
use crate::terms::TermSets;
use anyhow::{bail, Context};
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::qa::{QaEndpointConfig, QaEndpointModel};
use providers::scholar::{ScholarConfig, ScholarProvider};
use providers::web::{HttpBrowser, WebBrowserConfig};
use providers::ProviderRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Which filings from the device index to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    One(String),
    /// Zero-based row range over the index, end exclusive.
    Range(usize, usize),
    /// File listing one submission number per line.
    FromFile(PathBuf),
}

/// Outcome counts for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub output_csv: String,
}

/// Wire up live providers from config and environment. Anything left
/// unconfigured resolves to an inert provider, so a dry run without
/// credentials still produces a (sparse) report.
pub fn build_registry(cfg: &AppConfig, terms: &TermSets) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new()
        .with_qa("noop", Arc::new(NoopProvider))
        .with_llm("noop", Arc::new(NoopProvider))
        .with_browser("noop", Arc::new(NoopProvider))
        .with_paper_search("noop", Arc::new(NoopProvider));

    if !cfg.providers.qa.endpoint.is_empty() {
        let qa = QaEndpointModel::new(QaEndpointConfig {
            endpoint: cfg.providers.qa.endpoint.clone(),
            api_key: std::env::var("HF_API_KEY").ok(),
        });
        registry = registry
            .with_qa("endpoint", Arc::new(qa))
            .set_preferred_qa("endpoint");
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            let llm = OpenAiProvider::new(OpenAiConfig {
                api_key,
                base_url: cfg.providers.llm.base_url.clone(),
                chat_model: cfg.providers.llm.model.clone(),
            });
            registry = registry
                .with_llm("openai", Arc::new(llm))
                .set_preferred_llm("openai");
        }
        _ => info!("OPENAI_API_KEY unset, llm filtering disabled"),
    }

    let browser = HttpBrowser::new(
        WebBrowserConfig {
            search_endpoint: cfg.providers.search.endpoint.clone(),
            results_per_query: cfg.providers.search.results_per_query,
        },
        terms.relevance_patterns().to_vec(),
    );
    registry = registry
        .with_browser("http", Arc::new(browser))
        .set_preferred_browser("http");

    let scholar = ScholarProvider::new(ScholarConfig {
        endpoint: cfg.providers.scholar.endpoint.clone(),
        api_key: std::env::var("S2_API_KEY").ok(),
        max_papers: cfg.analysis.number_of_papers,
    });
    registry
        .with_paper_search("scholar", Arc::new(scholar))
        .set_preferred_paper_search("scholar")
}

/// Run the full pipeline with providers built from config and environment.
pub async fn run(cfg: &AppConfig, selection: Selection) -> anyhow::Result<PipelineSummary> {
    let terms = TermSets::compile(&cfg.terms)?;
    let registry = build_registry(cfg, &terms);
    run_with_registry(cfg, selection, &registry).await
}

/// Run the full pipeline against an externally assembled registry.
/// Documents are processed one at a time and a finished row is flushed
/// before the next document starts, so a crash loses at most one filing.
pub async fn run_with_registry(
    cfg: &AppConfig,
    selection: Selection,
    registry: &ProviderRegistry,
) -> anyhow::Result<PipelineSummary> {
    let terms = TermSets::compile(&cfg.terms)?;
    let index = DeviceIndex::load(Path::new(&cfg.paths.device_index))?;
    let known = match &cfg.paths.known_devices {
        Some(path) => KnownDevices::load(Path::new(path)),
        None => KnownDevices::default(),
    };
    let devices = resolve_selection(&selection, &index)?;
    info!(count = devices.len(), "devices selected");

    let output = Path::new(&cfg.paths.output_csv);
    let mut writer = ReportWriter::create(output)?;
    let mut analyser = Analyser::from_registry(registry, cfg.analysis.clone(), terms);

    let mut summary = PipelineSummary {
        processed: 0,
        succeeded: 0,
        failed: 0,
        output_csv: cfg.paths.output_csv.clone(),
    };

    for device in devices {
        summary.processed += 1;
        let submission = device.submission_number.clone();
        info!(%submission, device = %device.device, "processing filing");
        match process_document(cfg, &mut analyser, &device, &known).await {
            Ok(row) => {
                writer.append(row)?;
                summary.succeeded += 1;
            }
            Err(e) => {
                error!(%submission, error = %e, "filing failed");
                writer.append(report::error_row(&submission, &e.to_string()))?;
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "pipeline finished"
    );
    Ok(summary)
}

fn resolve_selection(
    selection: &Selection,
    index: &DeviceIndex,
) -> anyhow::Result<Vec<DeviceRecord>> {
    match selection {
        Selection::All => Ok(index.records().to_vec()),
        Selection::One(submission) => {
            let record = index
                .find(submission)
                .with_context(|| format!("submission {submission} is not in the device index"))?;
            Ok(vec![record.clone()])
        }
        Selection::Range(start, end) => {
            if start >= end {
                bail!("empty range {start}..{end}");
            }
            if *start >= index.records().len() {
                bail!(
                    "range starts at {start} but the index holds {} records",
                    index.records().len()
                );
            }
            let end = (*end).min(index.records().len());
            Ok(index.records()[*start..end].to_vec())
        }
        Selection::FromFile(path) => {
            let listing = std::fs::read_to_string(path)
                .with_context(|| format!("reading submission list {}", path.display()))?;
            let mut devices = Vec::new();
            for line in listing.lines() {
                let submission = line.trim();
                if submission.is_empty() || submission.starts_with('#') {
                    continue;
                }
                match index.find(submission) {
                    Some(record) => devices.push(record.clone()),
                    None => warn!(%submission, "listed submission not in device index, skipped"),
                }
            }
            if devices.is_empty() {
                bail!("no listed submission matched the device index");
            }
            Ok(devices)
        }
    }
}

/// `{summary_dir}/{submission}.pdf`, falling back to `.txt`.
fn summary_path(summary_dir: &str, submission: &str) -> anyhow::Result<PathBuf> {
    let dir = Path::new(summary_dir);
    for ext in ["pdf", "txt"] {
        let candidate = dir.join(format!("{submission}.{ext}"));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    bail!("no summary document for {submission} under {summary_dir}")
}

async fn process_document(
    cfg: &AppConfig,
    analyser: &mut Analyser,
    device: &DeviceRecord,
    known: &KnownDevices,
) -> anyhow::Result<ReportRow> {
    analyser.reset();
    let submission = &device.submission_number;

    let path = summary_path(&cfg.paths.summary_dir, submission)?;
    let mut pages = reader::extract_paragraphs(&path)?;

    let known_device = known.get(submission);
    if let Some(description) = known_device.and_then(|k| k.description.as_deref()) {
        pages.push(description.to_string());
    }

    let initial = analyser.level_1(&pages).await;
    if let Some(algorithm) = known_device.and_then(|k| k.algorithm.as_deref()) {
        analyser.seed_known_algorithm(algorithm);
    }
    let candidates = analyser.run.initial_results.clone();

    let alt_keywords = analyser.level_2_alt(&candidates).await;
    analyser.level_2(&candidates).await;

    let combined = analyser.combined_candidates();
    let grid = analyser.level_3(&combined).await;
    let (attacks, rejected) = analyser.level_4(grid).await;

    let mut results = analyser.return_results();
    results.push(report::numbered_keywords(&alt_keywords));
    let search_results =
        report::security_attacks_block(&attacks, &rejected, &combined, &cfg.analysis.search_prefixes);

    info!(
        %submission,
        candidates = initial.len(),
        validated = analyser.run.filtered_results.len(),
        attack_sections = search_results.len(),
        "filing analysed"
    );

    Ok(ReportRow {
        submission_number: submission.clone(),
        device: device.device.clone(),
        company: device.company.clone(),
        category: device.category.clone(),
        date_of_approval: device.decision_date.clone(),
        results,
        search_results,
    })
}
