use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub analysis: AnalysisConfig,
    pub terms: TermConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one summary document per submission number.
    pub summary_dir: String,
    pub output_csv: String,
    /// FDA AI/ML-enabled device index (CSV; XLSX behind the `xlsx` feature).
    pub device_index: String,
    /// Optional curated known-device list (algorithm + description).
    pub known_devices: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            summary_dir: "data/summaries".into(),
            output_csv: "data/analysed_devices.csv".into(),
            device_index: "data/device_index.csv".into(),
            known_devices: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Hard cap on web-validated keywords per document.
    pub number_of_keywords: usize,
    /// Papers kept per literature search query.
    pub number_of_papers: usize,
    /// Papers with fewer populated fields than this are rejected outright.
    pub min_paper_fields: usize,
    /// The four fixed QA questions; the fourth feeds `additional_results`.
    pub questions: Vec<String>,
    /// Literature search prefixes, in report order.
    pub search_prefixes: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            number_of_keywords: 5,
            number_of_papers: 5,
            min_paper_fields: 3,
            questions: vec![
                "What are the algorithms used?".into(),
                "What are the techniques used?".into(),
                "What are machine learning techniques used?".into(),
                "What is the input format to the device?".into(),
            ],
            search_prefixes: vec![
                "Security Attacks on ".into(),
                "Inference time attacks on ".into(),
                "Training time attacks on ".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    pub generic: Vec<String>,
    pub relevance: Vec<String>,
    pub inference_time: Vec<String>,
    pub training_time: Vec<String>,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            generic: vec![
                r"(?i)machine\s*learning".into(),
                r"(?i)artificial\s*intelligence".into(),
                r"(?i)510\s*k".into(),
                r"(?i)A\.I\.".into(),
            ],
            relevance: vec![
                r"(?i)machine\s*learning".into(),
                r"(?i)artificial\s*intelligence".into(),
                r"(?i)deep\s*learning".into(),
                r"(?i)neural\s*network".into(),
                r"(?i)classification\s*methods".into(),
                r"(?i)classifier".into(),
                r"(?i)computer\s*vision".into(),
            ],
            inference_time: vec![
                r"(?i)adversarial\s*example".into(),
                r"(?i)evasion".into(),
                r"(?i)privacy attack".into(),
                r"(?i)membership\s*inference".into(),
                r"(?i)model inversion".into(),
            ],
            training_time: vec![
                r"(?i)training\s*time".into(),
                r"(?i)poisoning".into(),
                r"(?i)data\s*manipulation".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub qa: QaConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub scholar: ScholarEndpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Extractive QA inference endpoint; empty disables the provider.
    pub endpoint: String,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    /// Organic results sampled per keyword validation.
    pub results_per_query: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html".into(),
            results_per_query: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScholarEndpointConfig {
    pub endpoint: String,
}

impl Default for ScholarEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.semanticscholar.org/graph/v1/paper/search".into(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
