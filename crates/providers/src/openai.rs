use crate::{LlmProvider, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
}

/// OpenAI-compatible chat completions client. Also fronts local servers
/// (LM Studio, llama.cpp) that speak the same API.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    cfg: Arc<OpenAiConfig>,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(cfg: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

fn keyword_prompt(keywords: &[String]) -> String {
    let mut prompt = String::from(
        "Following are some keywords extracted from a document. \
         Which of these are the most relevant to the context of AI-enabled medical devices? ",
    );
    prompt.push_str(&keywords.join(", "));
    prompt.push_str("\nPlease list only the most relevant keywords, one per line.");
    prompt
}

/// Parse the model's free-text keyword reply into a clean list.
///
/// Newlines count as separators; each item loses trailing ':' / ' - '
/// commentary and a leading "N." ordinal. Items that are empty, echo the
/// prompt ("most relevant") or run past 60 characters are dropped.
pub fn parse_keyword_reply(reply: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    let flattened = reply.replace('\n', ",");
    for raw in flattened.split(',') {
        let mut item = raw.trim();
        item = item.split(':').next().unwrap_or("").trim();
        item = item.split(" - ").next().unwrap_or("").trim();
        if item.is_empty() || item.to_lowercase().contains("most relevant") || item.len() > 60 {
            continue;
        }
        let item = strip_ordinal(item);
        if !item.is_empty() {
            keywords.push(item.to_string());
        }
    }
    keywords
}

/// Strip a leading "3." list marker, if present.
fn strip_ordinal(item: &str) -> &str {
    match item.find('.') {
        Some(pos) if pos > 0 && item[..pos].chars().all(|c| c.is_ascii_digit()) => {
            item[pos + 1..].trim_start()
        }
        _ => item,
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn keyword_completion(&self, keywords: &[String]) -> Result<Vec<String>, ProviderError> {
        let valid: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if valid.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessageResp,
        }
        #[derive(Deserialize)]
        struct ChatMessageResp {
            content: String,
        }
        #[derive(Deserialize)]
        struct ChatApiResponse {
            choices: Vec<Choice>,
        }

        let prompt = keyword_prompt(&valid);
        debug!(model = %self.cfg.chat_model, "sending keyword completion prompt");

        let body = ChatRequest {
            model: &self.cfg.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.cfg.base_url))
            .timeout(self.timeout)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let parsed: ChatApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in reply".into()))?;

        debug!(reply = %content, "keyword completion reply");
        Ok(parse_keyword_reply(&content))
    }
}
