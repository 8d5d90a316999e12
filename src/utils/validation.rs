// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{PipelineError, Result};

pub const MAX_TOPIC_CHARS: usize = 200;

pub struct Validator;

impl Validator {
    /// Rejects empty or oversized topics before a pipeline run is started.
    pub fn validate_topic(topic: &str) -> Result<String> {
        let trimmed = topic.trim();

        if trimmed.is_empty() {
            return Err(PipelineError::Validation(
                "Please enter a topic to search".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_TOPIC_CHARS {
            return Err(PipelineError::Validation(format!(
                "Topic too long (max {} characters)",
                MAX_TOPIC_CHARS
            )));
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(PipelineError::Validation(
                "Topic contains control characters".to_string(),
            ));
        }

        Ok(trimmed.to_string())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    pub fn validate_content_not_empty(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(PipelineError::Validation("Content is empty".to_string()));
        }
        Ok(())
    }

    /// Cuts at a char boundary so multi-byte text never panics.
    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}
