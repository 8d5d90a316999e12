// file: src/models/state.rs
// description: pipeline accumulator state and typed partial updates
// reference: internal data structures

use super::article::{ArticleRecord, CategorizedRecord, SummaryRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulator threaded through the stage graph. `query` is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    query: String,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
    #[serde(default)]
    pub summaries: Vec<SummaryRecord>,
    #[serde(default)]
    pub categorized: Vec<CategorizedRecord>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            articles: Vec::new(),
            summaries: Vec::new(),
            categorized: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replaces every field present in `update`. Collections are swapped wholesale, never merged.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(articles) = update.articles {
            self.articles = articles;
        }
        if let Some(summaries) = update.summaries {
            self.summaries = summaries;
        }
        if let Some(categorized) = update.categorized {
            self.categorized = categorized;
        }
    }

    pub fn len_of(&self, field: StateField) -> usize {
        match field {
            StateField::Articles => self.articles.len(),
            StateField::Summaries => self.summaries.len(),
            StateField::Categorized => self.categorized.len(),
        }
    }
}

/// Fields a stage may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Articles,
    Summaries,
    Categorized,
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateField::Articles => "articles",
            StateField::Summaries => "summaries",
            StateField::Categorized => "categorized",
        };
        f.write_str(name)
    }
}

/// Partial output of a stage. Only the fields set to `Some` are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub articles: Option<Vec<ArticleRecord>>,
    pub summaries: Option<Vec<SummaryRecord>>,
    pub categorized: Option<Vec<CategorizedRecord>>,
}

impl StateUpdate {
    pub fn articles(articles: Vec<ArticleRecord>) -> Self {
        Self {
            articles: Some(articles),
            ..Self::default()
        }
    }

    pub fn summaries(summaries: Vec<SummaryRecord>) -> Self {
        Self {
            summaries: Some(summaries),
            ..Self::default()
        }
    }

    pub fn categorized(categorized: Vec<CategorizedRecord>) -> Self {
        Self {
            categorized: Some(categorized),
            ..Self::default()
        }
    }

    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.articles.is_some() {
            fields.push(StateField::Articles);
        }
        if self.summaries.is_some() {
            fields.push(StateField::Summaries);
        }
        if self.categorized.is_some() {
            fields.push(StateField::Categorized);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_state_only_has_query() {
        let state = PipelineState::new("space launch");
        assert_eq!(state.query(), "space launch");
        assert!(state.articles.is_empty());
        assert!(state.summaries.is_empty());
        assert!(state.categorized.is_empty());
    }

    #[test]
    fn test_apply_replaces_only_present_fields() {
        let mut state = PipelineState::new("q");
        state.articles = vec![ArticleRecord::new("old")];
        state.summaries = vec![SummaryRecord {
            title: "kept".into(),
            summary: "s".into(),
        }];

        state.apply(StateUpdate::articles(vec![
            ArticleRecord::new("new-1"),
            ArticleRecord::new("new-2"),
        ]));

        assert_eq!(state.articles.len(), 2);
        assert_eq!(state.articles[0].title, "new-1");
        assert_eq!(state.summaries[0].title, "kept");
        assert_eq!(state.query(), "q");
    }

    #[test]
    fn test_apply_with_empty_collection_clears_field() {
        let mut state = PipelineState::new("q");
        state.articles = vec![ArticleRecord::new("a")];
        state.apply(StateUpdate::articles(Vec::new()));
        assert!(state.articles.is_empty());
    }

    #[test]
    fn test_update_fields() {
        assert!(StateUpdate::default().is_empty());
        let update = StateUpdate {
            summaries: Some(vec![]),
            categorized: Some(vec![]),
            ..StateUpdate::default()
        };
        assert_eq!(
            update.fields(),
            vec![StateField::Summaries, StateField::Categorized]
        );
    }
}
