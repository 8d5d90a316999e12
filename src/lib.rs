// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod stages;
pub mod utils;

pub use config::{CategoryPolicy, Config, LlmConfig, OutputConfig, PipelineConfig, SearchConfig};
pub use error::{CollaboratorError, GraphValidationError, PipelineError, Result, StageFailure};
pub use models::{
    ArticleRecord, CategorizedRecord, PipelineState, StateField, StateUpdate, SummaryRecord,
};
pub use output::{JsonExporter, NewsReport, Speaker, TerminalRenderer};
pub use pipeline::{
    CompiledPipeline, NewsPipeline, PipelineExecutor, PipelineGraph, PipelineStats,
    ProgressTracker, RunObserver, RunReport, StageStats,
};
pub use providers::{DuckDuckGoNews, GroqClient, LlmClient, SearchProvider};
pub use stages::{FnStage, Stage};
pub use utils::{OperationTimer, PerformanceMetrics, Validator};
