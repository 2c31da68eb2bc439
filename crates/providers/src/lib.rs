//! Collaborator abstractions: QA model, LLM, browser/search, paper search.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod noop;
pub mod openai;
pub mod qa;
pub mod scholar;
pub mod web;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// One answer from the question-answering model for a single paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub score: f64,
    pub text: String,
}

/// One scholarly search hit: title, abstract and landing-page URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub abstract_text: String,
    pub url: String,
}

impl PaperRecord {
    /// Number of non-empty fields out of the three.
    pub fn populated_fields(&self) -> usize {
        [&self.title, &self.abstract_text, &self.url]
            .iter()
            .filter(|f| !f.trim().is_empty())
            .count()
    }
}

/// Extractive question answering over document paragraphs.
///
/// Total by contract: per-paragraph failures are skipped and an empty vec
/// means no answer cleared the confidence floor.
#[async_trait::async_trait]
pub trait QaModel: Send + Sync {
    async fn analyse_pages(&self, pages: &[String], question: &str) -> Vec<ScoredAnswer>;
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Ask the model which of the candidate keywords are relevant and parse
    /// the free-text reply back into a clean keyword list.
    async fn keyword_completion(&self, keywords: &[String]) -> Result<Vec<String>, ProviderError>;
}

#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    /// Fetch a page body. `None` when the link is dead or the fetch fails.
    async fn get_page(&self, url: &str) -> Option<String>;

    /// Sample web search results for the keyword and report whether any of
    /// them reads like AI/ML material.
    async fn check_desc(&self, keyword: &str) -> Result<bool, ProviderError>;
}

#[async_trait::async_trait]
pub trait PaperSearch: Send + Sync {
    async fn get_info(&self, query: &str) -> Result<Vec<PaperRecord>, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    qa: HashMap<String, Arc<dyn QaModel>>,
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    browsers: HashMap<String, Arc<dyn Browser>>,
    paper_search: HashMap<String, Arc<dyn PaperSearch>>,
    pub preferred_qa: Option<String>,
    pub preferred_llm: Option<String>,
    pub preferred_browser: Option<String>,
    pub preferred_paper_search: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_qa(mut self, name: &str, provider: Arc<dyn QaModel>) -> Self {
        self.qa.insert(name.to_string(), provider);
        self
    }

    pub fn with_llm(mut self, name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.llms.insert(name.to_string(), provider);
        self
    }

    pub fn with_browser(mut self, name: &str, provider: Arc<dyn Browser>) -> Self {
        self.browsers.insert(name.to_string(), provider);
        self
    }

    pub fn with_paper_search(mut self, name: &str, provider: Arc<dyn PaperSearch>) -> Self {
        self.paper_search.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_qa(mut self, name: &str) -> Self {
        self.preferred_qa = Some(name.to_string());
        self
    }

    pub fn set_preferred_llm(mut self, name: &str) -> Self {
        self.preferred_llm = Some(name.to_string());
        self
    }

    pub fn set_preferred_browser(mut self, name: &str) -> Self {
        self.preferred_browser = Some(name.to_string());
        self
    }

    pub fn set_preferred_paper_search(mut self, name: &str) -> Self {
        self.preferred_paper_search = Some(name.to_string());
        self
    }

    pub fn qa(&self, name: Option<&str>) -> Result<Arc<dyn QaModel>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_qa.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no qa model configured".into()))?;
        self.qa
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }

    pub fn llm(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_llm.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no llm provider configured".into()))?;
        self.llms
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }

    pub fn browser(&self, name: Option<&str>) -> Result<Arc<dyn Browser>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_browser.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no browser configured".into()))?;
        self.browsers
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }

    pub fn paper_search(&self, name: Option<&str>) -> Result<Arc<dyn PaperSearch>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_paper_search.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no paper search configured".into()))?;
        self.paper_search
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }
}
