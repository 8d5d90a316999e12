// file: src/output/json.rs
// description: json report of a pipeline run, printed or written to disk

use crate::error::{PipelineError, Result};
use crate::models::{CategorizedRecord, PipelineState};
use crate::pipeline::PipelineStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct NewsReport<'a> {
    pub generated_at: String,
    pub query: &'a str,
    pub total: usize,
    pub items: Vec<ReportItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<&'a PipelineStats>,
}

#[derive(Debug, Serialize)]
pub struct ReportItem<'a> {
    #[serde(flatten)]
    pub record: &'a CategorizedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl<'a> NewsReport<'a> {
    pub fn new(state: &'a PipelineState, stats: Option<&'a PipelineStats>) -> Self {
        let items = state
            .categorized
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let article = state
                    .articles
                    .get(index)
                    .filter(|article| article.title == record.title);
                ReportItem {
                    record,
                    url: article.and_then(|a| a.url.as_deref()),
                    source: article.and_then(|a| a.source.as_deref()),
                    published: article.and_then(|a| a.published),
                }
            })
            .collect();

        Self {
            generated_at: Utc::now().to_rfc3339(),
            query: state.query(),
            total: state.categorized.len(),
            items,
            stats,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        rendered.map_err(|e| PipelineError::Serialization(e.to_string()))
    }
}

/// Writes one report file per run into a directory.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn export(&self, report: &NewsReport<'_>, pretty: bool) -> Result<PathBuf> {
        let file_name = format!(
            "news_{}_{}.json",
            slug(report.query),
            Utc::now().format("%Y%m%dT%H%M%S")
        );
        let path = self.output_dir.join(file_name);

        fs::write(&path, report.to_json(pretty)?)?;
        info!("Exported {} items to {}", report.total, path.display());

        Ok(path)
    }
}

fn slug(query: &str) -> String {
    let slug: String = query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "query".to_string()
    } else {
        slug.chars().take(40).collect()
    }
}
