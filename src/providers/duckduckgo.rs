// file: src/providers/duckduckgo.rs
// description: DuckDuckGo news search client
// reference: https://duckduckgo.com/news.js (vqd token handshake, json output)

use super::SearchProvider;
use crate::config::{SafeSearch, SearchConfig};
use crate::error::{CollaboratorError, PipelineError, Result};
use crate::models::ArticleRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

lazy_static! {
    static ref VQD_TOKEN: Regex = Regex::new(
        r#"vqd=(?:"([^"]+)"|'([^']+)'|([0-9A-Za-z-]+)&)"#
    ).expect("VQD_TOKEN regex is valid");

    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").expect("HTML_TAG regex is valid");

    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("WHITESPACE regex is valid");
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    date: Option<i64>,
}

pub struct DuckDuckGoNews {
    client: Client,
    base_url: String,
    region: String,
    safesearch: SafeSearch,
    timelimit: Option<String>,
}

impl DuckDuckGoNews {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            region: config.region.clone(),
            safesearch: config.safesearch,
            timelimit: config.timelimit.clone(),
        })
    }

    async fn fetch_vqd(&self, query: &str) -> std::result::Result<String, CollaboratorError> {
        let body = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollaboratorError::search(format!("Token request failed: {}", e)))?
            .text()
            .await
            .map_err(|e| CollaboratorError::search(format!("Token response unreadable: {}", e)))?;

        extract_vqd(&body)
            .ok_or_else(|| CollaboratorError::search("No vqd token in DuckDuckGo response"))
    }

    fn safesearch_param(&self) -> &'static str {
        match self.safesearch {
            SafeSearch::On => "1",
            SafeSearch::Moderate => "-1",
            SafeSearch::Off => "-2",
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoNews {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<ArticleRecord>, CollaboratorError> {
        let vqd = self.fetch_vqd(query).await?;
        debug!("Obtained vqd token for query '{}'", query);

        let mut params = vec![
            ("l", self.region.as_str()),
            ("o", "json"),
            ("noamp", "1"),
            ("q", query),
            ("vqd", vqd.as_str()),
            ("p", self.safesearch_param()),
        ];
        if let Some(ref limit) = self.timelimit {
            params.push(("df", limit.as_str()));
        }

        let response = self
            .client
            .get(format!("{}/news.js", self.base_url))
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollaboratorError::search(format!("News request failed: {}", e)))?;

        let news: NewsResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::search(format!("Failed to parse news response: {}", e)))?;

        let articles = to_articles(news.results, max_results);
        debug!("DuckDuckGo returned {} articles", articles.len());
        Ok(articles)
    }
}

fn extract_vqd(body: &str) -> Option<String> {
    VQD_TOKEN.captures(body).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
    })
}

/// Keeps provider order, drops duplicate urls and untitled items, caps at `max_results`.
fn to_articles(items: Vec<NewsItem>, max_results: usize) -> Vec<ArticleRecord> {
    let mut seen = HashSet::new();
    let mut articles = Vec::new();

    for item in items {
        if articles.len() >= max_results {
            break;
        }

        let title = clean_text(&item.title);
        if title.is_empty() {
            warn!("Skipping news item without a title");
            continue;
        }

        if let Some(ref url) = item.url
            && !seen.insert(url.clone())
        {
            continue;
        }

        let mut article = ArticleRecord::new(title);
        if let Some(body) = item.excerpt.as_deref().map(clean_text).filter(|b| !b.is_empty()) {
            article = article.with_body(body);
        }
        if let Some(url) = item.url {
            article = article.with_url(url);
        }
        if let Some(source) = item.source.filter(|s| !s.is_empty()) {
            article = article.with_source(source);
        }
        if let Some(published) = item.date.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) {
            article = article.with_published(published);
        }
        articles.push(article);
    }

    articles
}

fn clean_text(raw: &str) -> String {
    let stripped = HTML_TAG.replace_all(raw, "");
    let unescaped = stripped
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(unescaped.trim(), " ").into_owned()
}
