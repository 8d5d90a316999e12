// file: src/pipeline/news.rs
// description: assembles fetch, summarize and categorize into the news pipeline and runs it
// reference: coordinates search and llm collaborators over one shared state

use super::executor::{PipelineExecutor, RunObserver, RunReport};
use super::graph::{CompiledPipeline, PipelineGraph};
use crate::config::Config;
use crate::error::Result;
use crate::models::PipelineState;
use crate::providers::{DuckDuckGoNews, GroqClient, LlmClient, SearchProvider};
use crate::stages::{
    CATEGORIZE, CategorizeStage, CategoryLabels, FETCH, FetchStage, SUMMARIZE, SummarizeStage,
};
use crate::utils::Validator;
use std::sync::Arc;
use tracing::info;

pub struct NewsPipeline {
    plan: CompiledPipeline,
    executor: PipelineExecutor,
}

impl NewsPipeline {
    /// Declares `fetch -> summarize -> categorize` without compiling it.
    pub fn build_graph(
        config: &Config,
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<PipelineGraph> {
        let concurrency = config.pipeline.record_concurrency;
        let labels = CategoryLabels::from_config(&config.pipeline);

        let mut graph = PipelineGraph::new();
        graph
            .register(FETCH, FetchStage::new(search, config.search.max_results))?
            .register(SUMMARIZE, SummarizeStage::new(llm.clone(), concurrency))?
            .register(CATEGORIZE, CategorizeStage::new(llm, labels, concurrency))?;

        graph.connect(FETCH, SUMMARIZE)?.connect(SUMMARIZE, CATEGORIZE)?;
        graph.set_entry(FETCH)?.set_finish(CATEGORIZE)?;

        Ok(graph)
    }

    pub fn new(
        config: &Config,
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        let plan = Self::build_graph(config, search, llm)?.compile()?;
        Ok(Self {
            plan,
            executor: PipelineExecutor::new(),
        })
    }

    /// Wires the DuckDuckGo and Groq adapters from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let search = Arc::new(DuckDuckGoNews::new(&config.search)?);
        let llm = Arc::new(GroqClient::new(&config.llm)?);
        info!("Using model {} for summaries and categories", llm.model());
        Self::new(config, search, llm)
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    pub fn plan(&self) -> &CompiledPipeline {
        &self.plan
    }

    pub async fn run(&self, topic: &str) -> Result<PipelineState> {
        self.run_with_stats(topic).await.map(|report| report.state)
    }

    pub async fn run_with_stats(&self, topic: &str) -> Result<RunReport> {
        let topic = Validator::validate_topic(topic)?;
        self.executor
            .execute(&self.plan, PipelineState::new(topic))
            .await
    }
}
