use crate::{PaperRecord, PaperSearch, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ScholarConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_papers: usize,
}

/// Scholarly paper search over a Semantic-Scholar-style graph API.
#[derive(Clone)]
pub struct ScholarProvider {
    client: Client,
    cfg: Arc<ScholarConfig>,
    timeout: Duration,
}

impl ScholarProvider {
    pub fn new(cfg: ScholarConfig) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Survey papers review attacks rather than introduce them; skip them.
fn is_survey(paper: &PaperRecord) -> bool {
    paper.title.to_lowercase().contains("survey")
        || paper.abstract_text.to_lowercase().contains("survey")
}

pub fn filter_surveys(papers: Vec<PaperRecord>, max_papers: usize) -> Vec<PaperRecord> {
    papers
        .into_iter()
        .filter(|p| !is_survey(p))
        .take(max_papers)
        .collect()
}

#[async_trait::async_trait]
impl PaperSearch for ScholarProvider {
    async fn get_info(&self, query: &str) -> Result<Vec<PaperRecord>, ProviderError> {
        debug!(%query, "searching for papers");
        // Over-fetch so survey papers can be dropped without going short.
        let limit = (self.cfg.max_papers * 2).to_string();
        let mut builder = self
            .client
            .get(&self.cfg.endpoint)
            .timeout(self.timeout)
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", "title,abstract,url"),
            ]);
        if let Some(key) = &self.cfg.api_key {
            builder = builder.header("x-api-key", key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let parsed: SearchApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let papers: Vec<PaperRecord> = parsed
            .data
            .into_iter()
            .map(|hit| PaperRecord {
                title: hit.title.unwrap_or_default(),
                abstract_text: hit.abstract_text.unwrap_or_default(),
                url: hit.url.unwrap_or_default(),
            })
            .collect();

        let kept = filter_surveys(papers, self.cfg.max_papers);
        debug!(count = kept.len(), "papers retained");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, abstract_text: &str) -> PaperRecord {
        PaperRecord {
            title: title.into(),
            abstract_text: abstract_text.into(),
            url: "https://example.org".into(),
        }
    }

    #[test]
    fn surveys_are_dropped_by_title_or_abstract() {
        let papers = vec![
            paper("A Survey of Evasion Attacks", "overview"),
            paper("Targeted poisoning", "We present a survey of defenses"),
            paper("Targeted poisoning", "novel attack"),
        ];
        let kept = filter_surveys(papers, 5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].abstract_text, "novel attack");
    }

    #[tokio::test]
    async fn unresponsive_endpoint_times_out_to_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _socket = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut provider = ScholarProvider::new(ScholarConfig {
            endpoint: format!("http://{addr}/graph/v1/paper/search"),
            api_key: None,
            max_papers: 5,
        });
        provider.timeout = Duration::from_millis(100);

        let result = provider.get_info("Security Attacks on XGBoost").await;
        assert!(matches!(result, Err(ProviderError::RequestFailed(_))));
    }

    #[test]
    fn result_count_is_capped() {
        let papers = (0..10).map(|i| paper(&format!("p{i}"), "a")).collect();
        assert_eq!(filter_surveys(papers, 3).len(), 3);
    }
}
