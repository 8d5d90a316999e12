// file: src/stages/mod.rs
// description: stage contract plus the fetch, summarize and categorize stages
// reference: pipeline orchestration

mod categorize;
mod fetch;
mod summarize;

pub use categorize::{CategorizeStage, CategoryLabels};
pub use fetch::FetchStage;
pub use summarize::SummarizeStage;

use crate::error::{CollaboratorError, Result};
use crate::models::{PipelineState, StateField, StateUpdate};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

pub const FETCH: &str = "fetch";
pub const SUMMARIZE: &str = "summarize";
pub const CATEGORIZE: &str = "categorize";

/// One transformation step. Reads the whole state, returns only the fields it owns.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Fields this stage is allowed to write. Anything else in its update is rejected.
    fn writes(&self) -> &[StateField];

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate>;
}

/// Adapts a plain function into a [`Stage`].
pub struct FnStage<F> {
    writes: Vec<StateField>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&PipelineState) -> Result<StateUpdate> + Send + Sync,
{
    pub fn new(writes: &[StateField], func: F) -> Self {
        Self {
            writes: writes.to_vec(),
            func,
        }
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&PipelineState) -> Result<StateUpdate> + Send + Sync,
{
    fn writes(&self) -> &[StateField] {
        &self.writes
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        (self.func)(state)
    }
}

/// Runs `op` over every record, at most `concurrency` in flight, output in input order.
/// The first failure wins and is tagged with the stage name and the record index.
pub(crate) async fn map_records<'a, T, O, F, Fut>(
    stage: &str,
    records: &'a [T],
    concurrency: usize,
    op: F,
) -> std::result::Result<Vec<O>, CollaboratorError>
where
    T: Sync,
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = std::result::Result<O, CollaboratorError>>,
{
    if concurrency <= 1 {
        let mut out = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let value = op(index, record)
                .await
                .map_err(|e| e.in_stage(stage).at_record(index))?;
            out.push(value);
        }
        return Ok(out);
    }

    // futures are built up front so no closure is held across the await
    let pending: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let fut = op(index, record);
            async move { fut.await.map_err(|e| e.in_stage(stage).at_record(index)) }
        })
        .collect();

    stream::iter(pending)
        .buffered(concurrency)
        .try_collect()
        .await
}
