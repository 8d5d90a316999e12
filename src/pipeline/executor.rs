// file: src/pipeline/executor.rs
// description: walks a compiled plan, merging each stage's partial update into the state
// reference: sequential execution, abort on first stage failure

use super::graph::CompiledPipeline;
use super::progress::{PipelineStats, StageStats};
use crate::error::{PipelineError, Result, StageFailure};
use crate::models::{PipelineState, StateUpdate};
use crate::stages::Stage;
use crate::utils::OperationTimer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

const SLOW_STAGE: Duration = Duration::from_secs(60);

/// Hooks fired around each stage. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    fn stage_started(&self, _position: usize, _total: usize, _stage: &str) {}

    fn stage_finished(&self, _stats: &StageStats) {}

    fn stage_failed(&self, _stage: &str, _error: &PipelineError) {}
}

/// Final state of a successful run plus its timings.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: PipelineState,
    pub stats: PipelineStats,
}

#[derive(Default, Clone)]
pub struct PipelineExecutor {
    observer: Option<Arc<dyn RunObserver>>,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run(
        &self,
        plan: &CompiledPipeline,
        initial: PipelineState,
    ) -> Result<PipelineState> {
        self.execute(plan, initial).await.map(|report| report.state)
    }

    /// Runs from entry to finish. On failure the returned [`PipelineError::StageFailure`] carries
    /// the state accumulated before the failing stage.
    pub async fn execute(
        &self,
        plan: &CompiledPipeline,
        initial: PipelineState,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, query = %initial.query());
        self.walk(plan, initial, run_id).instrument(span).await
    }

    async fn walk(
        &self,
        plan: &CompiledPipeline,
        mut state: PipelineState,
        run_id: Uuid,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let total = plan.len();
        let mut stats = PipelineStats::new(run_id);
        let mut current = Some(plan.entry);
        let mut position = 0;

        info!("Running {} stage pipeline", total);

        while let Some(index) = current {
            let node = &plan.nodes[index];
            position += 1;

            if let Some(ref observer) = self.observer {
                observer.stage_started(position, total, &node.name);
            }

            let timer = OperationTimer::new(&node.name);
            let outcome = node
                .stage
                .run(&state)
                .instrument(info_span!("stage", name = %node.name))
                .await
                .and_then(|update| {
                    check_fields(&node.name, node.stage.as_ref(), &update)?;
                    Ok(update)
                });

            let update = match outcome {
                Ok(update) => update,
                Err(source) => {
                    error!("Stage '{}' failed: {}", node.name, source);
                    if let Some(ref observer) = self.observer {
                        observer.stage_failed(&node.name, &source);
                    }
                    return Err(PipelineError::StageFailure(Box::new(StageFailure {
                        stage: node.name.clone(),
                        partial: state,
                        source,
                    })));
                }
            };

            let written = update.fields();
            state.apply(update);

            let records: usize = written.iter().map(|f| state.len_of(*f)).sum();
            timer.warn_if_slow(SLOW_STAGE, "stage execution");
            let elapsed = timer.finish_with_count(records);
            let stage_stats = StageStats::new(&node.name, records, elapsed);

            if let Some(ref observer) = self.observer {
                observer.stage_finished(&stage_stats);
            }
            stats.push(stage_stats);

            current = if index == plan.finish { None } else { node.next };
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished: {} categorized items in {}ms",
            state.categorized.len(),
            stats.duration_ms
        );

        Ok(RunReport { state, stats })
    }
}

fn check_fields(stage_name: &str, stage: &dyn Stage, update: &StateUpdate) -> Result<()> {
    let allowed = stage.writes();
    match update.fields().into_iter().find(|f| !allowed.contains(f)) {
        Some(field) => Err(PipelineError::UndeclaredField {
            stage: stage_name.to_string(),
            field,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRecord, CategorizedRecord, StateField, SummaryRecord};
    use crate::pipeline::graph::PipelineGraph;
    use crate::stages::FnStage;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl RunObserver for Recorder {
        fn stage_started(&self, position: usize, total: usize, stage: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {} {}/{}", stage, position, total));
        }

        fn stage_finished(&self, stats: &StageStats) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {}", stats.name, stats.records));
        }

        fn stage_failed(&self, stage: &str, _error: &PipelineError) {
            self.events.lock().unwrap().push(format!("fail {}", stage));
        }
    }

    fn three_stage_graph(calls: Arc<AtomicUsize>, fail_second: bool) -> PipelineGraph {
        let mut graph = PipelineGraph::new();

        let c = calls.clone();
        graph
            .register(
                "load",
                FnStage::new(&[StateField::Articles], move |state: &PipelineState| {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(StateUpdate::articles(vec![
                        ArticleRecord::new(format!("{} 1", state.query())),
                        ArticleRecord::new(format!("{} 2", state.query())),
                    ]))
                }),
            )
            .unwrap();

        let c = calls.clone();
        graph
            .register(
                "shorten",
                FnStage::new(&[StateField::Summaries], move |state: &PipelineState| {
                    c.fetch_add(1, Ordering::SeqCst);
                    if fail_second {
                        return Err(PipelineError::Validation("shorten broke".into()));
                    }
                    Ok(StateUpdate::summaries(
                        state
                            .articles
                            .iter()
                            .map(|a| SummaryRecord {
                                title: a.title.clone(),
                                summary: a.title.to_uppercase(),
                            })
                            .collect(),
                    ))
                }),
            )
            .unwrap();

        let c = calls;
        graph
            .register(
                "label",
                FnStage::new(&[StateField::Categorized], move |state: &PipelineState| {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(StateUpdate::categorized(
                        state
                            .summaries
                            .iter()
                            .map(|s| CategorizedRecord {
                                title: s.title.clone(),
                                summary: s.summary.clone(),
                                category: "Others".into(),
                            })
                            .collect(),
                    ))
                }),
            )
            .unwrap();

        graph.connect("load", "shorten").unwrap();
        graph.connect("shorten", "label").unwrap();
        graph.set_entry("load").unwrap().set_finish("label").unwrap();
        graph
    }

    #[tokio::test]
    async fn test_run_merges_each_stage_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plan = three_stage_graph(calls.clone(), false).compile().unwrap();
        let recorder = Arc::new(Recorder::default());

        let report = PipelineExecutor::new()
            .with_observer(recorder.clone())
            .execute(&plan, PipelineState::new("mars"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.state.query(), "mars");
        assert_eq!(report.state.summaries[1].summary, "MARS 2");
        assert_eq!(report.state.categorized.len(), 2);
        assert_eq!(
            report.stats.stages.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["load", "shorten", "label"]
        );
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "start load 1/3",
                "done load 2",
                "start shorten 2/3",
                "done shorten 2",
                "start label 3/3",
                "done label 2",
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_stops_downstream_and_keeps_partial_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plan = three_stage_graph(calls.clone(), true).compile().unwrap();

        let err = PipelineExecutor::new()
            .run(&plan, PipelineState::new("mars"))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.failed_stage(), Some("shorten"));
        let partial = err.partial_state().unwrap();
        assert_eq!(partial.articles.len(), 2);
        assert!(partial.summaries.is_empty());
        assert!(partial.categorized.is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_field_is_rejected_before_merge() {
        let mut graph = PipelineGraph::new();
        graph
            .register(
                "sneaky",
                FnStage::new(&[StateField::Articles], |_: &PipelineState| {
                    Ok(StateUpdate {
                        articles: Some(vec![ArticleRecord::new("a")]),
                        categorized: Some(vec![]),
                        ..StateUpdate::default()
                    })
                }),
            )
            .unwrap();
        graph.set_entry("sneaky").unwrap().set_finish("sneaky").unwrap();
        let plan = graph.compile().unwrap();

        let err = PipelineExecutor::new()
            .run(&plan, PipelineState::new("q"))
            .await
            .unwrap_err();

        match err {
            PipelineError::StageFailure(failure) => {
                assert!(matches!(
                    failure.source,
                    PipelineError::UndeclaredField { field: StateField::Categorized, .. }
                ));
                assert!(failure.partial.articles.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_blocking_from_sync_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plan = three_stage_graph(calls, false).compile().unwrap();
        let state = tokio_test::block_on(PipelineExecutor::new().run(&plan, PipelineState::new("x")))
            .unwrap();
        assert_eq!(state.categorized.len(), state.articles.len());
    }
}
