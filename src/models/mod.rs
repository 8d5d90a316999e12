// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod article;
pub mod state;

pub use article::{ArticleRecord, CategorizedRecord, SummaryRecord};
pub use state::{PipelineState, StateField, StateUpdate};
