// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod executor;
pub mod graph;
mod news;
mod progress;

pub use executor::{PipelineExecutor, RunObserver, RunReport};
pub use graph::{CompiledPipeline, PipelineGraph, PlanSummary};
pub use news::NewsPipeline;
pub use progress::{PipelineStats, ProgressTracker, StageStats};
