// file: src/stages/summarize.rs
// description: summarize stage, one llm call per fetched article

use super::{SUMMARIZE, Stage, map_records};
use crate::error::{CollaboratorError, Result};
use crate::models::{ArticleRecord, PipelineState, StateField, StateUpdate, SummaryRecord};
use crate::providers::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SummarizeStage {
    llm: Arc<dyn LlmClient>,
    concurrency: usize,
}

impl SummarizeStage {
    pub fn new(llm: Arc<dyn LlmClient>, concurrency: usize) -> Self {
        Self {
            llm,
            concurrency: concurrency.max(1),
        }
    }

    pub fn prompt(article: &ArticleRecord) -> String {
        format!(
            "Summarize this news article: {} - {}",
            article.title,
            article.body_or_empty()
        )
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn writes(&self) -> &[StateField] {
        &[StateField::Summaries]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        if state.articles.is_empty() {
            warn!("No articles to summarize");
            return Ok(StateUpdate::summaries(Vec::new()));
        }

        info!("Summarizing {} articles", state.articles.len());

        let summaries = map_records(
            SUMMARIZE,
            &state.articles,
            self.concurrency,
            |index, article| {
                let llm = Arc::clone(&self.llm);
                let prompt = Self::prompt(article);
                let title = article.title.clone();
                async move {
                    debug!("Summarizing article {}: {}", index, title);
                    let summary = llm.complete(&prompt).await?;
                    Ok::<_, CollaboratorError>(SummaryRecord { title, summary })
                }
            },
        )
        .await?;

        Ok(StateUpdate::summaries(summaries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fakes::FakeLlm;
    use pretty_assertions::assert_eq;

    fn state_with(articles: Vec<ArticleRecord>) -> PipelineState {
        let mut state = PipelineState::new("topic");
        state.articles = articles;
        state
    }

    #[test]
    fn test_prompt_uses_empty_body_when_absent() {
        assert_eq!(
            SummarizeStage::prompt(&ArticleRecord::new("Headline")),
            "Summarize this news article: Headline - "
        );
        assert_eq!(
            SummarizeStage::prompt(&ArticleRecord::new("Headline").with_body("Body text")),
            "Summarize this news article: Headline - Body text"
        );
    }

    #[tokio::test]
    async fn test_one_summary_per_article_in_order() {
        let llm = Arc::new(
            FakeLlm::new("generic")
                .rule("Alpha", "summary of alpha")
                .rule("Beta", "summary of beta"),
        );
        let stage = SummarizeStage::new(llm.clone(), 1);
        let state = state_with(vec![ArticleRecord::new("Alpha"), ArticleRecord::new("Beta")]);

        let summaries = stage.run(&state).await.unwrap().summaries.unwrap();

        assert_eq!(
            summaries,
            vec![
                SummaryRecord {
                    title: "Alpha".into(),
                    summary: "summary of alpha".into()
                },
                SummaryRecord {
                    title: "Beta".into(),
                    summary: "summary of beta".into()
                },
            ]
        );
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_reports_record_index() {
        let llm = Arc::new(FakeLlm::new("ok").fail_on_call(1));
        let stage = SummarizeStage::new(llm.clone(), 1);
        let state = state_with(vec![
            ArticleRecord::new("A"),
            ArticleRecord::new("B"),
            ArticleRecord::new("C"),
        ]);

        let err = stage.run(&state).await.unwrap_err();
        let collaborator = err.collaborator().expect("collaborator error");

        assert_eq!(collaborator.stage.as_deref(), Some("summarize"));
        assert_eq!(collaborator.index, Some(1));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_failure_reports_record_index() {
        let llm = Arc::new(FakeLlm::new("ok").fail_on_call(1));
        let stage = SummarizeStage::new(llm, 3);
        let state = state_with(vec![
            ArticleRecord::new("A"),
            ArticleRecord::new("B"),
            ArticleRecord::new("C"),
        ]);

        let err = stage.run(&state).await.unwrap_err();
        let collaborator = err.collaborator().expect("collaborator error");

        assert_eq!(collaborator.stage.as_deref(), Some("summarize"));
        assert_eq!(collaborator.index, Some(1));
    }

    #[tokio::test]
    async fn test_no_articles_no_calls() {
        let llm = Arc::new(FakeLlm::new("unused"));
        let stage = SummarizeStage::new(llm.clone(), 1);

        let update = stage.run(&state_with(vec![])).await.unwrap();
        assert_eq!(update.summaries, Some(vec![]));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_summaries_stay_ordered() {
        let llm = Arc::new(
            FakeLlm::new("generic")
                .rule("one", "1")
                .rule("two", "2")
                .rule("three", "3"),
        );
        let stage = SummarizeStage::new(llm, 3);
        let state = state_with(vec![
            ArticleRecord::new("one"),
            ArticleRecord::new("two"),
            ArticleRecord::new("three"),
        ]);

        let summaries = stage.run(&state).await.unwrap().summaries.unwrap();
        let texts: Vec<_> = summaries.iter().map(|s| s.summary.as_str()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }
}
