use crate::{QaModel, ScoredAnswer};
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Answers below this confidence carry no signal and are dropped at the source.
pub const CONFIDENCE_FLOOR: f64 = 1e-2;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct QaEndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// Extractive QA over an HTTP inference endpoint (HF-style
/// `{"question", "context"}` request, `{"score", "answer"}` reply).
#[derive(Clone)]
pub struct QaEndpointModel {
    client: Client,
    cfg: Arc<QaEndpointConfig>,
    timeout: Duration,
}

impl QaEndpointModel {
    pub fn new(cfg: QaEndpointConfig) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
            timeout: REQUEST_TIMEOUT,
        }
    }

    async fn ask(&self, question: &str, context: &str) -> anyhow::Result<QaApiResponse> {
        #[derive(serde::Serialize)]
        struct QaRequest<'a> {
            question: &'a str,
            context: &'a str,
        }

        let mut builder = self
            .client
            .post(&self.cfg.endpoint)
            .timeout(self.timeout)
            .json(&QaRequest {
                question,
                context,
            });
        if let Some(key) = &self.cfg.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[derive(Deserialize)]
struct QaApiResponse {
    score: f64,
    answer: String,
}

/// Stable descending sort by score; ties keep discovery order.
pub fn sort_by_score(answers: &mut [ScoredAnswer]) {
    answers.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[async_trait::async_trait]
impl QaModel for QaEndpointModel {
    async fn analyse_pages(&self, pages: &[String], question: &str) -> Vec<ScoredAnswer> {
        let mut answers = Vec::new();
        if pages.is_empty() || question.is_empty() {
            warn!("empty pages or question handed to qa model");
            return answers;
        }

        for paragraph in pages {
            if paragraph.trim().is_empty() {
                continue;
            }
            match self.ask(question, paragraph).await {
                Ok(res) if res.score > CONFIDENCE_FLOOR => {
                    let text = res.answer.trim().replace('\n', " ");
                    debug!(score = res.score, answer = %text, "qa answer retained");
                    answers.push(ScoredAnswer {
                        score: res.score,
                        text,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "qa request failed for paragraph, skipping");
                }
            }
        }

        sort_by_score(&mut answers);
        answers
    }
}
