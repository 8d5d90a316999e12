// file: src/pipeline/graph.rs
// description: stage graph declaration and compilation into a linear execution plan
// reference: named nodes, directed edges, entry and finish points

use crate::error::{GraphValidationError, PipelineError, Result};
use crate::stages::Stage;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Declared stages and their ordering. Nothing runs until [`PipelineGraph::compile`].
#[derive(Default)]
pub struct PipelineGraph {
    stages: HashMap<String, Arc<dyn Stage>>,
    registration_order: Vec<String>,
    edges: Vec<(String, String)>,
    entry: Option<String>,
    finish: Option<String>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S>(&mut self, name: impl Into<String>, stage: S) -> Result<&mut Self>
    where
        S: Stage + 'static,
    {
        self.register_shared(name, Arc::new(stage))
    }

    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        stage: Arc<dyn Stage>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.stages.contains_key(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }
        self.registration_order.push(name.clone());
        self.stages.insert(name, stage);
        Ok(self)
    }

    /// Adds `from -> to`. Repeating an existing edge is a no-op.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<&mut Self> {
        self.ensure_known(from)?;
        self.ensure_known(to)?;
        if !self.edges.iter().any(|(f, t)| f == from && t == to) {
            self.edges.push((from.to_string(), to.to_string()));
        }
        Ok(self)
    }

    pub fn set_entry(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_known(name)?;
        self.entry = Some(name.to_string());
        Ok(self)
    }

    pub fn set_finish(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_known(name)?;
        self.finish = Some(name.to_string());
        Ok(self)
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        if self.stages.contains_key(name) {
            Ok(())
        } else {
            Err(PipelineError::UnknownStage(name.to_string()))
        }
    }

    /// Validates the declaration and produces an immutable plan. The graph itself is untouched,
    /// so compiling twice yields equivalent plans.
    pub fn compile(&self) -> Result<CompiledPipeline> {
        let entry = self
            .entry
            .as_deref()
            .ok_or(GraphValidationError::MissingEntry)?;
        let finish = self
            .finish
            .as_deref()
            .ok_or(GraphValidationError::MissingFinish)?;

        let successors = self.successors();

        if let Some(path) = self.find_cycle(&successors) {
            return Err(GraphValidationError::Cycle { path }.into());
        }

        if !Self::reaches(entry, finish, &successors) {
            return Err(GraphValidationError::UnreachableFinish(finish.to_string()).into());
        }

        for name in &self.registration_order {
            if name != entry && !self.edges.iter().any(|(_, to)| to == name) {
                return Err(GraphValidationError::DisconnectedNode(name.clone()).into());
            }
        }

        if successors.get(finish).is_some_and(|next| !next.is_empty()) {
            return Err(GraphValidationError::EdgeFromFinish(finish.to_string()).into());
        }

        let mut path: Vec<&str> = vec![entry];
        let mut current = entry;
        while current != finish {
            match successors.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                [only] => {
                    current = *only;
                    path.push(current);
                }
                [] => {
                    return Err(GraphValidationError::UnreachableFinish(finish.to_string()).into());
                }
                many => {
                    return Err(GraphValidationError::Branching {
                        node: current.to_string(),
                        successors: many.len(),
                    }
                    .into());
                }
            }
        }

        let last = path.len() - 1;
        let nodes = path
            .iter()
            .enumerate()
            .map(|(index, name)| PlanNode {
                name: name.to_string(),
                stage: Arc::clone(&self.stages[*name]),
                next: (index < last).then_some(index + 1),
            })
            .collect::<Vec<_>>();

        debug!("Compiled pipeline: {}", path.join(" -> "));

        Ok(CompiledPipeline {
            nodes,
            entry: 0,
            finish: last,
        })
    }

    fn successors(&self) -> HashMap<&str, Vec<&str>> {
        let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, to) in &self.edges {
            map.entry(from.as_str()).or_default().push(to.as_str());
        }
        map
    }

    fn reaches(from: &str, target: &str, successors: &HashMap<&str, Vec<&str>>) -> bool {
        let mut seen = vec![from];
        let mut queue = vec![from];
        while let Some(node) = queue.pop() {
            if node == target {
                return true;
            }
            for &next in successors.get(node).into_iter().flatten() {
                if !seen.contains(&next) {
                    seen.push(next);
                    queue.push(next);
                }
            }
        }
        false
    }

    /// Depth-first search over every registered node; returns the first cycle found, closed
    /// on its starting node (`a -> b -> a`).
    fn find_cycle(&self, successors: &HashMap<&str, Vec<&str>>) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit<'g>(
            node: &'g str,
            successors: &HashMap<&'g str, Vec<&'g str>>,
            marks: &mut HashMap<&'g str, Mark>,
            stack: &mut Vec<&'g str>,
        ) -> Option<Vec<String>> {
            marks.insert(node, Mark::InProgress);
            stack.push(node);

            for &next in successors.get(node).into_iter().flatten() {
                match marks.get(next).copied().unwrap_or(Mark::Unvisited) {
                    Mark::InProgress => {
                        let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|n| n.to_string()).collect();
                        cycle.push(next.to_string());
                        return Some(cycle);
                    }
                    Mark::Unvisited => {
                        if let Some(cycle) = visit(next, successors, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Mark::Done => {}
                }
            }

            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack = Vec::new();
        for name in &self.registration_order {
            if marks.get(name.as_str()).copied().unwrap_or(Mark::Unvisited) == Mark::Unvisited
                && let Some(cycle) = visit(name.as_str(), successors, &mut marks, &mut stack)
            {
                return Some(cycle);
            }
        }
        None
    }
}

pub(crate) struct PlanNode {
    pub(crate) name: String,
    pub(crate) stage: Arc<dyn Stage>,
    pub(crate) next: Option<usize>,
}

/// Validated, immutable execution plan.
pub struct CompiledPipeline {
    pub(crate) nodes: Vec<PlanNode>,
    pub(crate) entry: usize,
    pub(crate) finish: usize,
}

impl CompiledPipeline {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            order: self.nodes.iter().map(|n| n.name.clone()).collect(),
            entry: self.nodes[self.entry].name.clone(),
            finish: self.nodes[self.finish].name.clone(),
        }
    }
}

impl fmt::Debug for CompiledPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPipeline")
            .field("order", &self.node_order())
            .field("entry", &self.entry)
            .field("finish", &self.finish)
            .finish()
    }
}

/// Comparable description of a compiled plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub order: Vec<String>,
    pub entry: String,
    pub finish: String,
}
