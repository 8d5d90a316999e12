// file: src/stages/categorize.rs
// description: categorize stage, one llm classification call per summary
// reference: label handling follows pipeline.category_policy

use super::{CATEGORIZE, Stage, map_records};
use crate::config::{CategoryPolicy, PipelineConfig};
use crate::error::{CollaboratorError, Result};
use crate::models::{CategorizedRecord, PipelineState, StateField, StateUpdate, SummaryRecord};
use crate::providers::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Label set offered to the model, plus the overflow label.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryLabels {
    labels: Vec<String>,
    fallback: String,
    policy: CategoryPolicy,
}

impl CategoryLabels {
    pub fn new(labels: Vec<String>, fallback: impl Into<String>, policy: CategoryPolicy) -> Self {
        Self {
            labels,
            fallback: fallback.into(),
            policy,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.categories.clone(),
            config.fallback_category.clone(),
            config.category_policy,
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn policy(&self) -> CategoryPolicy {
        self.policy
    }

    pub fn prompt(&self, summary: &SummaryRecord) -> String {
        format!(
            "Classify this news article into a category ({}): {}",
            self.labels.join(", "),
            summary.summary
        )
    }

    /// Applies the configured policy to a raw model answer.
    /// The llm client hands the answer over already trimmed, so verbatim keeps it as is.
    pub fn resolve(&self, raw: &str) -> String {
        match self.policy {
            CategoryPolicy::Verbatim => raw.to_string(),
            CategoryPolicy::Coerce => self.coerce(raw),
        }
    }

    fn coerce(&self, raw: &str) -> String {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
            .to_lowercase();

        if let Some(label) = self.labels.iter().find(|l| l.to_lowercase() == cleaned) {
            return label.clone();
        }

        // first label mentioned anywhere in the answer, as a whole word
        let words: Vec<String> = cleaned
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let mentioned = words
            .iter()
            .find_map(|w| self.labels.iter().find(|l| l.to_lowercase() == *w));

        match mentioned {
            Some(label) => label.clone(),
            None => {
                debug!("Unrecognized category '{}', using {}", raw, self.fallback);
                self.fallback.clone()
            }
        }
    }
}

pub struct CategorizeStage {
    llm: Arc<dyn LlmClient>,
    labels: CategoryLabels,
    concurrency: usize,
}

impl CategorizeStage {
    pub fn new(llm: Arc<dyn LlmClient>, labels: CategoryLabels, concurrency: usize) -> Self {
        Self {
            llm,
            labels,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl Stage for CategorizeStage {
    fn writes(&self) -> &[StateField] {
        &[StateField::Categorized]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        if state.summaries.is_empty() {
            warn!("No summaries to categorize");
            return Ok(StateUpdate::categorized(Vec::new()));
        }

        info!("Categorizing {} summaries", state.summaries.len());

        let categorized = map_records(
            CATEGORIZE,
            &state.summaries,
            self.concurrency,
            |index, item| {
                let llm = Arc::clone(&self.llm);
                let prompt = self.labels.prompt(item);
                let labels = &self.labels;
                async move {
                    let raw = llm.complete(&prompt).await?;
                    let category = labels.resolve(&raw);
                    debug!("Record {} '{}' -> {}", index, item.title, category);
                    Ok::<_, CollaboratorError>(CategorizedRecord {
                        title: item.title.clone(),
                        summary: item.summary.clone(),
                        category,
                    })
                }
            },
        )
        .await?;

        Ok(StateUpdate::categorized(categorized))
    }
}
