//! Graph workflow executor

use super::types::{Edge, GraphState, Node, NodeId, END};
use crate::adk::error::{OpsGraphError, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a run: the final state plus the nodes visited, in order
#[derive(Debug)]
pub struct Execution<S> {
    pub run_id: Uuid,
    pub state: S,
    pub path: Vec<NodeId>,
}

/// Validated, executable graph
pub struct CompiledGraph<S: GraphState, C: Send + Sync + 'static> {
    name: String,
    nodes: HashMap<NodeId, Arc<dyn Node<S, C>>>,
    edges: HashMap<NodeId, Edge<S>>,
    entry: NodeId,
    step_limit: usize,
}

impl<S: GraphState, C: Send + Sync + 'static> CompiledGraph<S, C> {
    pub(crate) fn new(
        name: String,
        nodes: HashMap<NodeId, Arc<dyn Node<S, C>>>,
        edges: HashMap<NodeId, Edge<S>>,
        entry: NodeId,
        step_limit: usize,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            entry,
            step_limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Registered node ids, sorted
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        ids.sort();
        ids
    }

    /// Resolve the successor of `from` against the post-merge state
    pub fn resolve_next(&self, from: &str, state: &S) -> Result<NodeId, WorkflowError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| WorkflowError::MissingEdge(from.to_string()))?;

        match edge {
            Edge::Static(to) => Ok(to.clone()),
            Edge::Conditional { router, branches } => {
                let label = router(state);
                match branches.get(&label) {
                    Some(to) => {
                        log::info!("Route {} --[{}]--> {}", from, label, to);
                        Ok(to.clone())
                    }
                    None => Err(WorkflowError::UnknownRouteLabel {
                        node: from.to_string(),
                        label,
                    }),
                }
            }
        }
    }

    /// Run from the entry node until `END` and return the final state
    pub async fn run(&self, initial: S, ctx: &C) -> Result<S, OpsGraphError> {
        Ok(self.run_traced(initial, ctx).await?.state)
    }

    /// Run from the entry node until `END`, recording the visited path
    pub async fn run_traced(&self, initial: S, ctx: &C) -> Result<Execution<S>, OpsGraphError> {
        let run_id = Uuid::new_v4();
        let mut state = initial;
        let mut path = Vec::new();
        let mut current = self.entry.clone();

        log::info!("[{}] Starting workflow '{}' at '{}'", run_id, self.name, current);

        while current != END {
            if path.len() >= self.step_limit {
                log::error!(
                    "[{}] Workflow '{}' exceeded step limit {}",
                    run_id,
                    self.name,
                    self.step_limit
                );
                return Err(WorkflowError::StepLimitExceeded(self.step_limit).into());
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownNode(current.clone()))?;

            log::info!("[{}] Executing node: {}", run_id, current);
            let update = node.run(&state, ctx).await.map_err(|e| {
                log::error!("[{}] Node {} failed: {}", run_id, current, e);
                e
            })?;
            state.merge(update);
            path.push(current.clone());

            current = self.resolve_next(&current, &state)?;
        }

        log::info!(
            "[{}] Workflow '{}' finished after {} steps",
            run_id,
            self.name,
            path.len()
        );

        Ok(Execution {
            run_id,
            state,
            path,
        })
    }
}
