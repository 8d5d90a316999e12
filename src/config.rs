// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    pub base_url: String,
    pub max_results: usize,
    pub region: String,
    pub safesearch: SafeSearch,
    /// DuckDuckGo time filter: d, w, m or y.
    pub timelimit: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    On,
    Moderate,
    Off,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub categories: Vec<String>,
    pub fallback_category: String,
    pub category_policy: CategoryPolicy,
    pub record_concurrency: usize,
}

/// What the categorize stage does with an LLM answer outside the label set.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPolicy {
    #[default]
    Verbatim,
    Coerce,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub speech_enabled: bool,
    pub speech_command: String,
    pub speech_args: Vec<String>,
    pub preview_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            speech_enabled: false,
            speech_command: "espeak".to_string(),
            speech_args: vec![],
            preview_chars: 600,
        }
    }
}

impl Config {
    /// Loads the TOML file (or `config/default.toml`) layered with `NEWS_GRAPH__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("NEWS_GRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("GROQ_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            llm: LlmConfig {
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                api_key: None,
                model: "llama-3.3-70b-versatile".to_string(),
                temperature: None,
                max_tokens: None,
                timeout_secs: 30,
            },
            search: SearchConfig {
                base_url: "https://duckduckgo.com".to_string(),
                max_results: 5,
                region: "wt-wt".to_string(),
                safesearch: SafeSearch::Moderate,
                timelimit: None,
                timeout_secs: 15,
                user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                    .to_string(),
            },
            pipeline: PipelineConfig {
                categories: ["Politics", "Tech", "Sports", "Business", "Others"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                fallback_category: "Others".to_string(),
                category_policy: CategoryPolicy::Verbatim,
                record_concurrency: 1,
            },
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.max_results == 0 {
            return Err(PipelineError::Config(
                "search.max_results must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.record_concurrency == 0 {
            return Err(PipelineError::Config(
                "pipeline.record_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.categories.is_empty() {
            return Err(PipelineError::Config(
                "pipeline.categories must not be empty".to_string(),
            ));
        }

        if !self
            .pipeline
            .categories
            .iter()
            .any(|c| c == &self.pipeline.fallback_category)
        {
            return Err(PipelineError::Config(format!(
                "fallback category '{}' is not in pipeline.categories",
                self.pipeline.fallback_category
            )));
        }

        if let Some(ref limit) = self.search.timelimit
            && !matches!(limit.as_str(), "d" | "w" | "m" | "y")
        {
            return Err(PipelineError::Config(format!(
                "search.timelimit must be one of d, w, m, y (got '{}')",
                limit
            )));
        }

        Validator::validate_url(&self.llm.endpoint)
            .and_then(|_| Validator::validate_url(&self.search.base_url))
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(())
    }

    pub fn has_llm_credentials(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
