use crate::{Browser, LlmProvider, PaperRecord, PaperSearch, ProviderError, QaModel, ScoredAnswer};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl QaModel for NoopProvider {
    async fn analyse_pages(&self, _pages: &[String], _question: &str) -> Vec<ScoredAnswer> {
        Vec::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn keyword_completion(&self, _keywords: &[String]) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

#[async_trait::async_trait]
impl Browser for NoopProvider {
    async fn get_page(&self, _url: &str) -> Option<String> {
        None
    }

    async fn check_desc(&self, _keyword: &str) -> Result<bool, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

#[async_trait::async_trait]
impl PaperSearch for NoopProvider {
    async fn get_info(&self, _query: &str) -> Result<Vec<PaperRecord>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
