use crate::{Browser, ProviderError};
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct WebBrowserConfig {
    /// HTML search endpoint queried with a `q` parameter.
    pub search_endpoint: String,
    /// How many organic results to fetch per keyword.
    pub results_per_query: usize,
}

/// Plain-HTTP stand-in for a driven browser session: fetches pages and
/// validates keywords against live web search results.
#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
    cfg: Arc<WebBrowserConfig>,
    /// AI/ML terminology a relevant result page is expected to mention.
    relevance: Arc<Vec<Regex>>,
    href: Regex,
}

impl HttpBrowser {
    pub fn new(cfg: WebBrowserConfig, relevance: Vec<Regex>) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
            relevance: Arc::new(relevance),
            href: Regex::new(r#"href=["']([^"']+)["']"#).expect("href pattern"),
        }
    }

    /// Pull absolute links out of a search result page, in document order.
    fn extract_links(&self, body: &str) -> Vec<String> {
        let mut links = Vec::new();
        for cap in self.href.captures_iter(body) {
            let url = &cap[1];
            if url.starts_with("http") && !links.iter().any(|l| l == url) {
                links.push(url.to_string());
            }
        }
        links
    }

    async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "status {} for {url}",
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }
}

/// Search result URLs that cannot carry a readable description.
fn skip_result(url: &str) -> bool {
    url.contains("fda.gov") || url.contains(".pdf") || url.contains(".img")
}

#[async_trait::async_trait]
impl Browser for HttpBrowser {
    async fn get_page(&self, url: &str) -> Option<String> {
        debug!(%url, "retrieving page");
        match self.fetch(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(%url, error = %e, "page fetch failed");
                None
            }
        }
    }

    async fn check_desc(&self, keyword: &str) -> Result<bool, ProviderError> {
        debug!(%keyword, "validating keyword against web search");
        let resp = self
            .client
            .get(&self.cfg.search_endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("q", keyword.trim())])
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let mut fetched = 0usize;
        for link in self.extract_links(&body) {
            if fetched >= self.cfg.results_per_query {
                break;
            }
            if skip_result(&link) {
                debug!(%link, "skipping non-descriptive result");
                continue;
            }
            fetched += 1;
            if let Some(content) = self.get_page(&link).await {
                if self.relevance.iter().any(|p| p.is_match(&content)) {
                    debug!(%keyword, %link, "relevance pattern matched");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser() -> HttpBrowser {
        HttpBrowser::new(
            WebBrowserConfig {
                search_endpoint: "https://search.example/html".into(),
                results_per_query: 2,
            },
            Vec::new(),
        )
    }

    #[test]
    fn extracts_absolute_links_once_each() {
        let body = r#"<a href="https://a.example/x">x</a>
                      <a href='/relative'>r</a>
                      <a href="https://a.example/x">again</a>
                      <a href="http://b.example">b</a>"#;
        let links = browser().extract_links(body);
        assert_eq!(links, vec!["https://a.example/x", "http://b.example"]);
    }

    #[test]
    fn skips_fda_pdf_and_image_results() {
        assert!(skip_result("https://www.fda.gov/device"));
        assert!(skip_result("https://x.example/summary.pdf"));
        assert!(skip_result("https://x.example/logo.img"));
        assert!(!skip_result("https://x.example/about-xgboost"));
    }
}
