// file: src/stages/fetch.rs
// description: fetch stage, turns the query into raw articles via the search provider

use super::{FETCH, Stage};
use crate::error::Result;
use crate::models::{PipelineState, StateField, StateUpdate};
use crate::providers::SearchProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub struct FetchStage {
    search: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl FetchStage {
    pub fn new(search: Arc<dyn SearchProvider>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn writes(&self) -> &[StateField] {
        &[StateField::Articles]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        info!(
            "Searching news for '{}' (max {} results)",
            state.query(),
            self.max_results
        );

        let mut articles = self
            .search
            .search(state.query(), self.max_results)
            .await
            .map_err(|e| e.in_stage(FETCH))?;

        articles.truncate(self.max_results);

        if articles.is_empty() {
            warn!("No articles found for '{}'", state.query());
        }

        Ok(StateUpdate::articles(articles))
    }
}
