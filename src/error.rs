// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use crate::models::{PipelineState, StateField};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stage '{0}' is already registered")]
    DuplicateStage(String),

    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Invalid pipeline graph: {0}")]
    GraphValidation(#[from] GraphValidationError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Stage '{stage}' wrote field '{field}' it does not own")]
    UndeclaredField { stage: String, field: StateField },

    #[error("{0}")]
    StageFailure(Box<StageFailure>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Name of the stage that aborted the run, if any.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailure(failure) => Some(&failure.stage),
            PipelineError::Collaborator(err) => err.stage.as_deref(),
            _ => None,
        }
    }

    /// Digs the collaborator error out of a stage failure.
    pub fn collaborator(&self) -> Option<&CollaboratorError> {
        match self {
            PipelineError::Collaborator(err) => Some(err),
            PipelineError::StageFailure(failure) => failure.source.collaborator(),
            _ => None,
        }
    }

    pub fn partial_state(&self) -> Option<&PipelineState> {
        match self {
            PipelineError::StageFailure(failure) => Some(&failure.partial),
            _ => None,
        }
    }

    /// One line naming the query and the stage that gave up.
    pub fn failure_notice(&self, query: &str) -> String {
        format!(
            "Could not get news for \"{}\": stage '{}' failed",
            query,
            self.failed_stage().unwrap_or("setup")
        )
    }
}

/// A run aborted inside a stage. Holds whatever state had been merged before the failure.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub partial: PipelineState,
    pub source: PipelineError,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage '{}' failed: {}", self.stage, self.source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Search,
    Llm,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Search => write!(f, "search"),
            Service::Llm => write!(f, "llm"),
        }
    }
}

/// Failure reported by an external service, tagged with where in the pipeline it happened.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{service} collaborator failed{}: {message}", location(.stage, .index))]
pub struct CollaboratorError {
    pub service: Service,
    pub stage: Option<String>,
    pub index: Option<usize>,
    pub message: String,
}

impl CollaboratorError {
    pub fn search(message: impl Into<String>) -> Self {
        Self {
            service: Service::Search,
            stage: None,
            index: None,
            message: message.into(),
        }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self {
            service: Service::Llm,
            stage: None,
            index: None,
            message: message.into(),
        }
    }

    pub fn in_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    pub fn at_record(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

fn location(stage: &Option<String>, index: &Option<usize>) -> String {
    match (stage, index) {
        (Some(stage), Some(index)) => format!(" in stage '{}' at record {}", stage, index),
        (Some(stage), None) => format!(" in stage '{}'", stage),
        (None, Some(index)) => format!(" at record {}", index),
        (None, None) => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphValidationError {
    #[error("no entry stage set")]
    MissingEntry,

    #[error("no finish stage set")]
    MissingFinish,

    #[error("stage '{0}' has no incoming edge and is not the entry")]
    DisconnectedNode(String),

    #[error("cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("stage '{node}' has {successors} outgoing edges; only linear pipelines are supported")]
    Branching { node: String, successors: usize },

    #[error("finish stage '{0}' is unreachable from the entry")]
    UnreachableFinish(String),

    #[error("finish stage '{0}' has outgoing edges")]
    EdgeFromFinish(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_display() {
        let err = CollaboratorError::llm("quota exceeded")
            .in_stage("summarize")
            .at_record(1);
        assert_eq!(
            err.to_string(),
            "llm collaborator failed in stage 'summarize' at record 1: quota exceeded"
        );

        let bare = CollaboratorError::search("connection refused");
        assert_eq!(
            bare.to_string(),
            "search collaborator failed: connection refused"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = GraphValidationError::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cycle detected: a -> b -> a");
    }

    #[test]
    fn test_stage_failure_accessors() {
        let failure = StageFailure {
            stage: "summarize".to_string(),
            partial: PipelineState::new("topic"),
            source: CollaboratorError::llm("boom")
                .in_stage("summarize")
                .at_record(2)
                .into(),
        };
        let err = PipelineError::StageFailure(Box::new(failure));

        assert_eq!(err.failed_stage(), Some("summarize"));
        assert_eq!(err.collaborator().and_then(|c| c.index), Some(2));
        assert_eq!(err.partial_state().map(|s| s.query()), Some("topic"));
    }

    #[test]
    fn test_failure_notice_names_query_and_stage() {
        let failure = StageFailure {
            stage: "categorize".to_string(),
            partial: PipelineState::new("space launch"),
            source: CollaboratorError::llm("boom").into(),
        };
        let err = PipelineError::StageFailure(Box::new(failure));
        assert_eq!(
            err.failure_notice("space launch"),
            "Could not get news for \"space launch\": stage 'categorize' failed"
        );

        let setup = PipelineError::Config("missing api key".to_string());
        assert_eq!(
            setup.failure_notice("space launch"),
            "Could not get news for \"space launch\": stage 'setup' failed"
        );
    }
}
