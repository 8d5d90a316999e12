// file: src/providers/mod.rs
// description: external search and language model collaborators
// reference: internal module structure

pub mod duckduckgo;
pub mod groq;

pub use duckduckgo::DuckDuckGoNews;
pub use groq::GroqClient;

use crate::error::CollaboratorError;
use crate::models::ArticleRecord;
use async_trait::async_trait;

/// Web news search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns at most `max_results` articles in provider ranking order.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ArticleRecord>, CollaboratorError>;
}

/// Prompt in, generated text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FakeSearch {
        articles: Vec<ArticleRecord>,
        fail_with: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeSearch {
        pub fn returning(articles: Vec<ArticleRecord>) -> Self {
            Self {
                articles,
                fail_with: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                articles: vec![],
                fail_with: Some(message.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(
            &self,
            _query: &str,
            max_results: usize,
        ) -> Result<Vec<ArticleRecord>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref message) = self.fail_with {
                return Err(CollaboratorError::search(message.clone()));
            }
            Ok(self.articles.iter().take(max_results).cloned().collect())
        }
    }

    /// Answers prompts by the first matching substring rule; fails on the n-th call if asked to.
    pub struct FakeLlm {
        rules: Vec<(String, String)>,
        default_reply: String,
        fail_on_call: Option<usize>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeLlm {
        pub fn new(default_reply: &str) -> Self {
            Self {
                rules: vec![],
                default_reply: default_reply.to_string(),
                fail_on_call: None,
                prompts: Mutex::new(vec![]),
            }
        }

        pub fn rule(mut self, needle: &str, reply: &str) -> Self {
            self.rules.push((needle.to_string(), reply.to_string()));
            self
        }

        pub fn fail_on_call(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn recorded(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
            let call = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt.to_string());
                prompts.len() - 1
            };

            if self.fail_on_call == Some(call) {
                return Err(CollaboratorError::llm("rate limit exceeded"));
            }

            Ok(self
                .rules
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
                .unwrap_or_else(|| self.default_reply.clone()))
        }
    }
}
