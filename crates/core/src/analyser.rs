//! The four-level classification funnel over one filing's summary text.

use crate::config::AnalysisConfig;
use crate::keywords;
use crate::models::{
    AnalysisRun, AttackLabel, ClassifiedGrid, ClassifiedPaper, PaperGrid, ScoredTerm,
};
use crate::terms::TermSets;
use providers::noop::NoopProvider;
use providers::{Browser, LlmProvider, PaperSearch, ProviderRegistry, QaModel, ScoredAnswer};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Synthetic confidence assigned to keywords the LLM path contributes.
const ALT_KEYWORD_CONFIDENCE: f64 = 0.9;

/// Sequences the four analysis levels and owns the per-document state.
///
/// Every level is total: collaborator failures degrade that level's output
/// to empty or partial results and the funnel keeps going.
pub struct Analyser {
    qa: Arc<dyn QaModel>,
    llm: Arc<dyn LlmProvider>,
    browser: Arc<dyn Browser>,
    scholar: Arc<dyn PaperSearch>,
    cfg: AnalysisConfig,
    terms: TermSets,
    pub run: AnalysisRun,
}

fn into_term(answer: ScoredAnswer) -> ScoredTerm {
    ScoredTerm::new(answer.score, answer.text)
}

impl Analyser {
    pub fn new(
        qa: Arc<dyn QaModel>,
        llm: Arc<dyn LlmProvider>,
        browser: Arc<dyn Browser>,
        scholar: Arc<dyn PaperSearch>,
        cfg: AnalysisConfig,
        terms: TermSets,
    ) -> Self {
        Self {
            qa,
            llm,
            browser,
            scholar,
            cfg,
            terms,
            run: AnalysisRun::default(),
        }
    }

    /// Resolve collaborators from the registry, falling back to inert
    /// providers so a partially configured run still degrades cleanly.
    pub fn from_registry(registry: &ProviderRegistry, cfg: AnalysisConfig, terms: TermSets) -> Self {
        let qa = registry
            .qa(None)
            .unwrap_or_else(|_| Arc::new(NoopProvider));
        let llm = registry
            .llm(None)
            .unwrap_or_else(|_| Arc::new(NoopProvider));
        let browser = registry
            .browser(None)
            .unwrap_or_else(|_| Arc::new(NoopProvider));
        let scholar = registry
            .paper_search(None)
            .unwrap_or_else(|_| Arc::new(NoopProvider));
        Self::new(qa, llm, browser, scholar, cfg, terms)
    }

    /// Drop the previous document's state.
    pub fn reset(&mut self) {
        self.run = AnalysisRun::default();
    }

    /// Level 1: pool QA answers for the first three questions over all
    /// paragraphs, rank and dedup them. The fourth question's answers go to
    /// `additional_results` and are never merged into the pool.
    pub async fn level_1(&mut self, pages: &[String]) -> Vec<ScoredTerm> {
        info!("level 1 analysis started");
        self.run.initial_results.clear();
        self.run.additional_results.clear();

        if pages.is_empty() {
            error!("no paragraphs to analyse");
            return Vec::new();
        }

        let mut pooled: Vec<ScoredTerm> = Vec::new();
        for (i, question) in self.cfg.questions.iter().take(3).enumerate() {
            let answers = self.qa.analyse_pages(pages, question).await;
            debug!(question = i + 1, count = answers.len(), "question answered");
            pooled.extend(answers.into_iter().map(into_term));
        }

        if let Some(question) = self.cfg.questions.get(3) {
            let answers = self.qa.analyse_pages(pages, question).await;
            debug!(count = answers.len(), "input-format question answered");
            self.run.additional_results = answers.into_iter().map(into_term).collect();
        }

        if pooled.is_empty() {
            error!("no qa answer cleared the confidence floor");
            return Vec::new();
        }

        self.run.initial_results = keywords::dedup_ranked(pooled);
        info!(
            count = self.run.initial_results.len(),
            "level 1 analysis completed"
        );
        self.run.initial_results.clone()
    }

    /// Pre-seed the candidate pool with an externally known algorithm name.
    pub fn seed_known_algorithm(&mut self, algorithm: &str) {
        keywords::seed_known_algorithm(&mut self.run.initial_results, algorithm);
    }

    /// Level 2: validate candidates against live web search, in score order,
    /// until the keyword cap is reached. Generic AI vocabulary is skipped
    /// outright; a collaborator error fails only that candidate.
    pub async fn level_2(&mut self, results: &[ScoredTerm]) -> Vec<ScoredTerm> {
        info!("level 2 analysis started");
        self.run.filtered_results.clear();
        self.run.neglected_results.clear();

        for candidate in results {
            if self.run.filtered_results.len() >= self.cfg.number_of_keywords {
                break;
            }
            let keyword = candidate.text.trim();
            if keyword.is_empty() {
                continue;
            }
            if self.terms.is_generic(keyword) {
                debug!(%keyword, "generic term skipped");
                continue;
            }
            match self.browser.check_desc(keyword).await {
                Ok(true) => {
                    debug!(%keyword, "keyword validated");
                    self.run.filtered_results.push(candidate.clone());
                }
                Ok(false) => {
                    debug!(%keyword, "keyword not validated");
                    self.run.neglected_results.push(candidate.clone());
                }
                Err(e) => {
                    warn!(%keyword, error = %e, "validation errored, treating as failure");
                    self.run.neglected_results.push(candidate.clone());
                }
            }
        }

        info!(
            count = self.run.filtered_results.len(),
            "level 2 analysis completed"
        );
        self.run.filtered_results.clone()
    }

    /// Level 2-Alt: independent LLM re-filtering of the same candidates.
    /// When the LLM fails, the leading raw candidates stand in for its
    /// answer; an empty candidate list stays empty.
    pub async fn level_2_alt(&mut self, results: &[ScoredTerm]) -> Vec<String> {
        info!("level 2 alternative analysis started");
        self.run.alt_keywords.clear();

        if results.is_empty() {
            warn!("no candidates for llm filtering");
            return Vec::new();
        }

        let texts: Vec<String> = results.iter().map(|t| t.text.clone()).collect();
        let keywords = match self.llm.keyword_completion(&texts).await {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "llm keyword completion failed, using leading candidates");
                texts.iter().take(self.cfg.number_of_keywords).cloned().collect()
            }
        };

        self.run.alt_keywords = keywords
            .into_iter()
            .filter(|k| {
                let generic = self.terms.is_generic(k);
                if generic {
                    debug!(keyword = %k, "generic term removed from llm keywords");
                }
                !generic
            })
            .collect();

        info!(
            count = self.run.alt_keywords.len(),
            "level 2 alternative analysis completed"
        );
        self.run.alt_keywords.clone()
    }

    /// Validated keywords plus the LLM path's contributions, in the order
    /// Level 3 and the report expect.
    pub fn combined_candidates(&self) -> Vec<ScoredTerm> {
        let mut combined = self.run.filtered_results.clone();
        combined.extend(
            self.run
                .alt_keywords
                .iter()
                .map(|k| ScoredTerm::new(ALT_KEYWORD_CONFIDENCE, k.clone())),
        );
        combined
    }

    /// Level 3: one literature query per (prefix, candidate) pair. The grid
    /// keeps its `[prefix][candidate]` shape even for failed or empty
    /// queries so downstream indexing lines up.
    pub async fn level_3(&self, candidates: &[ScoredTerm]) -> PaperGrid {
        info!("level 3 analysis started");
        let mut grid: PaperGrid = Vec::with_capacity(self.cfg.search_prefixes.len());

        for prefix in &self.cfg.search_prefixes {
            let mut row = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let keyword = candidate.text.trim();
                if keyword.is_empty() {
                    row.push(Vec::new());
                    continue;
                }
                let query = format!("{prefix}{keyword}");
                debug!(%query, "searching literature");
                match self.scholar.get_info(&query).await {
                    Ok(papers) => {
                        debug!(%keyword, count = papers.len(), "papers found");
                        row.push(papers);
                    }
                    Err(e) => {
                        warn!(%query, error = %e, "paper search failed");
                        row.push(Vec::new());
                    }
                }
            }
            grid.push(row);
        }

        info!("level 3 analysis completed");
        grid
    }

    /// Level 4: fetch each paper's page and classify it. Incomplete records
    /// and dead pages land in the rejected grid at the same position.
    pub async fn level_4(&self, grid: PaperGrid) -> (ClassifiedGrid, ClassifiedGrid) {
        info!("level 4 analysis started");
        let mut attacks: ClassifiedGrid = Vec::with_capacity(grid.len());
        let mut rejected: ClassifiedGrid = Vec::with_capacity(grid.len());

        for row in grid {
            let mut attack_row = Vec::with_capacity(row.len());
            let mut rejected_row = Vec::with_capacity(row.len());
            for papers in row {
                let mut attack_cell = Vec::new();
                let mut rejected_cell = Vec::new();
                for paper in papers {
                    if paper.populated_fields() < self.cfg.min_paper_fields {
                        debug!(title = %paper.title, "paper record incomplete, rejecting");
                        rejected_cell.push(ClassifiedPaper {
                            paper,
                            label: AttackLabel::Rejected,
                        });
                        continue;
                    }
                    debug!(title = %paper.title, "classifying paper");
                    let page = self.browser.get_page(&paper.url).await;
                    match self.terms.attack_label(page.as_deref()) {
                        AttackLabel::Rejected => {
                            debug!(title = %paper.title, "paper not attack related");
                            rejected_cell.push(ClassifiedPaper {
                                paper,
                                label: AttackLabel::Rejected,
                            });
                        }
                        label => {
                            debug!(title = %paper.title, %label, "attack paper classified");
                            attack_cell.push(ClassifiedPaper { paper, label });
                        }
                    }
                }
                attack_row.push(attack_cell);
                rejected_row.push(rejected_cell);
            }
            attacks.push(attack_row);
            rejected.push(rejected_row);
        }

        info!("level 4 analysis completed");
        (attacks, rejected)
    }

    /// The three numbered result blocks: pooled candidates, validated
    /// keywords and input-format answers.
    pub fn return_results(&self) -> Vec<String> {
        [
            &self.run.initial_results,
            &self.run.filtered_results,
            &self.run.additional_results,
        ]
        .iter()
        .enumerate()
        .map(|(i, results)| {
            if results.is_empty() {
                format!("No results found for Level {}", i + 1)
            } else {
                results
                    .iter()
                    .enumerate()
                    .map(|(n, t)| format!("{}. {} (Score: {:.3})", n + 1, t.text, t.confidence))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, TermConfig};
    use providers::{PaperRecord, ProviderError};
    use std::collections::HashMap;

    struct ScriptedQa;

    #[async_trait::async_trait]
    impl QaModel for ScriptedQa {
        async fn analyse_pages(&self, pages: &[String], question: &str) -> Vec<ScoredAnswer> {
            if pages.is_empty() {
                return Vec::new();
            }
            if question.contains("algorithms") {
                vec![ScoredAnswer {
                    score: 0.92,
                    text: "convolutional neural network classifier".into(),
                }]
            } else if question.contains("input format") {
                vec![ScoredAnswer {
                    score: 0.81,
                    text: "DICOM image".into(),
                }]
            } else {
                Vec::new()
            }
        }
    }

    struct FixedLlm(Result<Vec<String>, ()>);

    #[async_trait::async_trait]
    impl LlmProvider for FixedLlm {
        async fn keyword_completion(
            &self,
            _keywords: &[String],
        ) -> Result<Vec<String>, ProviderError> {
            match &self.0 {
                Ok(keywords) => Ok(keywords.clone()),
                Err(()) => Err(ProviderError::RequestFailed("down".into())),
            }
        }
    }

    /// Browser scripted per keyword/url; anything unknown errors.
    #[derive(Default)]
    struct ScriptedBrowser {
        validations: HashMap<String, bool>,
        pages: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl Browser for ScriptedBrowser {
        async fn get_page(&self, url: &str) -> Option<String> {
            self.pages.get(url).cloned()
        }

        async fn check_desc(&self, keyword: &str) -> Result<bool, ProviderError> {
            self.validations
                .get(keyword)
                .copied()
                .ok_or_else(|| ProviderError::RequestFailed(format!("no result for {keyword}")))
        }
    }

    struct EmptyScholar;

    #[async_trait::async_trait]
    impl PaperSearch for EmptyScholar {
        async fn get_info(&self, _query: &str) -> Result<Vec<PaperRecord>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn analyser(browser: ScriptedBrowser, llm: FixedLlm) -> Analyser {
        let cfg = AnalysisConfig::default();
        let terms = TermSets::compile(&TermConfig::default()).unwrap();
        Analyser::new(
            Arc::new(ScriptedQa),
            Arc::new(llm),
            Arc::new(browser),
            Arc::new(EmptyScholar),
            cfg,
            terms,
        )
    }

    fn default_analyser() -> Analyser {
        analyser(ScriptedBrowser::default(), FixedLlm(Ok(Vec::new())))
    }

    #[tokio::test]
    async fn level_1_routes_input_format_answers_separately() {
        let mut analyser = default_analyser();
        let pages = vec![
            "Uses a convolutional neural network classifier.".to_string(),
            "Input is a DICOM image.".to_string(),
        ];
        let initial = analyser.level_1(&pages).await;

        assert!(initial
            .iter()
            .any(|t| t.text.contains("convolutional neural network")));
        assert!(!initial.iter().any(|t| t.text.contains("DICOM")));
        assert!(analyser
            .run
            .additional_results
            .iter()
            .any(|t| t.text.contains("DICOM image")));
    }

    #[tokio::test]
    async fn level_1_with_no_pages_is_empty_and_non_fatal() {
        let mut analyser = default_analyser();
        assert!(analyser.level_1(&[]).await.is_empty());
        assert!(analyser.run.additional_results.is_empty());
    }

    #[tokio::test]
    async fn level_2_drops_generics_and_dedups_to_validated_keyword() {
        // Scenario: generic term skipped, contained term removed at dedup,
        // the surviving candidate web-validated.
        let mut browser = ScriptedBrowser::default();
        browser.validations.insert("XGBoost".into(), true);
        let mut analyser = analyser(browser, FixedLlm(Ok(Vec::new())));

        let candidates = keywords::dedup_ranked(vec![
            ScoredTerm::new(0.9, "machine learning"),
            ScoredTerm::new(0.8, "XGBoost"),
            ScoredTerm::new(0.7, "XGBoost classifier"),
        ]);
        let filtered = analyser.level_2(&candidates).await;

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].text, "XGBoost");
        assert!(analyser.run.neglected_results.is_empty());
    }

    #[tokio::test]
    async fn level_2_respects_keyword_cap() {
        let mut browser = ScriptedBrowser::default();
        for i in 0..10 {
            browser.validations.insert(format!("model-{i}"), true);
        }
        let mut analyser = analyser(browser, FixedLlm(Ok(Vec::new())));

        let candidates: Vec<ScoredTerm> = (0..10)
            .map(|i| ScoredTerm::new(1.0 - i as f64 * 0.05, format!("model-{i}")))
            .collect();
        let filtered = analyser.level_2(&candidates).await;
        assert_eq!(filtered.len(), analyser.cfg.number_of_keywords);
    }

    #[tokio::test]
    async fn level_2_routes_failures_and_errors_to_neglected() {
        let mut browser = ScriptedBrowser::default();
        browser.validations.insert("U-Net".into(), false);
        // "SqueezeNet" is unscripted, so check_desc errors for it.
        let mut analyser = analyser(browser, FixedLlm(Ok(Vec::new())));

        let candidates = vec![
            ScoredTerm::new(0.9, "U-Net"),
            ScoredTerm::new(0.8, "SqueezeNet"),
        ];
        let filtered = analyser.level_2(&candidates).await;

        assert!(filtered.is_empty());
        assert_eq!(analyser.run.neglected_results.len(), 2);
    }

    #[tokio::test]
    async fn level_2_seeded_candidate_ranks_first_when_validated() {
        let mut browser = ScriptedBrowser::default();
        browser.validations.insert("ResNet-50".into(), true);
        browser.validations.insert("U-Net".into(), true);
        let mut analyser = analyser(browser, FixedLlm(Ok(Vec::new())));

        analyser.run.initial_results = vec![ScoredTerm::new(0.8, "U-Net")];
        analyser.seed_known_algorithm("ResNet-50");
        let candidates = analyser.run.initial_results.clone();
        let filtered = analyser.level_2(&candidates).await;

        assert_eq!(filtered[0].text, "ResNet-50");
        assert!((filtered[0].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn level_2_alt_filters_generic_llm_keywords() {
        let llm = FixedLlm(Ok(vec!["XGBoost".into(), "machine learning".into()]));
        let mut analyser = analyser(ScriptedBrowser::default(), llm);
        let candidates = vec![ScoredTerm::new(0.9, "anything")];
        let alt = analyser.level_2_alt(&candidates).await;
        assert_eq!(alt, vec!["XGBoost"]);
    }

    #[tokio::test]
    async fn level_2_alt_falls_back_to_leading_candidates_on_llm_error() {
        let mut analyser = analyser(ScriptedBrowser::default(), FixedLlm(Err(())));
        let candidates: Vec<ScoredTerm> = (0..8)
            .map(|i| ScoredTerm::new(0.9, format!("model-{i}")))
            .collect();
        let alt = analyser.level_2_alt(&candidates).await;
        assert_eq!(alt.len(), analyser.cfg.number_of_keywords);
        assert_eq!(alt[0], "model-0");
    }

    #[tokio::test]
    async fn level_2_alt_with_no_candidates_is_empty() {
        let mut analyser = analyser(ScriptedBrowser::default(), FixedLlm(Err(())));
        assert!(analyser.level_2_alt(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn level_3_preserves_grid_shape_for_empty_queries() {
        let analyser = default_analyser();
        let grid = analyser
            .level_3(&[ScoredTerm::new(0.9, "XGBoost")])
            .await;
        assert_eq!(grid.len(), 3);
        for row in &grid {
            assert_eq!(row.len(), 1);
            assert!(row[0].is_empty());
        }
    }

    #[tokio::test]
    async fn level_4_splits_attack_and_rejected_papers() {
        let paper = |title: &str, url: &str| PaperRecord {
            title: title.into(),
            abstract_text: "an abstract".into(),
            url: url.into(),
        };
        let mut browser = ScriptedBrowser::default();
        browser.pages.insert(
            "https://x.example/inference".into(),
            "a membership inference attack".into(),
        );
        browser.pages.insert(
            "https://x.example/poison".into(),
            "data poisoning of training sets".into(),
        );
        // https://x.example/dead is unscripted: fetch yields no page.
        let analyser = analyser(browser, FixedLlm(Ok(Vec::new())));

        let incomplete = PaperRecord {
            title: "only a title".into(),
            abstract_text: String::new(),
            url: String::new(),
        };
        let grid: PaperGrid = vec![vec![vec![
            paper("inference paper", "https://x.example/inference"),
            paper("poisoning paper", "https://x.example/poison"),
            paper("dead link paper", "https://x.example/dead"),
            incomplete,
        ]]];

        let (attacks, rejected) = analyser.level_4(grid).await;
        assert_eq!(attacks[0][0].len(), 2);
        assert_eq!(attacks[0][0][0].label, AttackLabel::InferenceTime);
        assert_eq!(attacks[0][0][1].label, AttackLabel::TrainingTime);
        assert_eq!(rejected[0][0].len(), 2);
        assert!(rejected[0][0]
            .iter()
            .all(|p| p.label == AttackLabel::Rejected));
    }

    #[tokio::test]
    async fn return_results_numbers_and_scores_entries() {
        let mut analyser = default_analyser();
        analyser.run.initial_results = vec![
            ScoredTerm::new(0.925, "XGBoost"),
            ScoredTerm::new(0.5, "U-Net"),
        ];
        let blocks = analyser.return_results();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].starts_with("1. XGBoost (Score: 0.925)"));
        assert!(blocks[0].contains("2. U-Net (Score: 0.500)"));
        assert_eq!(blocks[1], "No results found for Level 2");
    }

    #[tokio::test]
    async fn combined_candidates_appends_alt_keywords_at_fixed_confidence() {
        let mut analyser = default_analyser();
        analyser.run.filtered_results = vec![ScoredTerm::new(0.8, "U-Net")];
        analyser.run.alt_keywords = vec!["XGBoost".into()];
        let combined = analyser.combined_candidates();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[1].text, "XGBoost");
        assert!((combined[1].confidence - 0.9).abs() < f64::EPSILON);
    }
}
