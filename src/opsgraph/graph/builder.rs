// SPDX-License-Identifier: MIT

//! Graph builder
//!
//! `StateGraph` collects nodes and edges and `compile` checks the wiring
//! before anything runs: every edge endpoint exists, every node has exactly
//! one outgoing edge, and the entry point is registered.

use super::executor::CompiledGraph;
use super::types::{Edge, FnNode, GraphState, Node, NodeId, RouteLabel, END};
use crate::adk::error::{OpsGraphError, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Default bound on node executions per run
pub const DEFAULT_STEP_LIMIT: usize = 100;

/// Mutable graph under construction
pub struct StateGraph<S: GraphState, C: Send + Sync + 'static> {
    name: String,
    nodes: HashMap<NodeId, Arc<dyn Node<S, C>>>,
    edges: Vec<(NodeId, Edge<S>)>,
    entry: Option<NodeId>,
    step_limit: usize,
    problems: Vec<WorkflowError>,
}

impl<S: GraphState, C: Send + Sync + 'static> StateGraph<S, C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            entry: None,
            step_limit: DEFAULT_STEP_LIMIT,
            problems: Vec::new(),
        }
    }

    /// Register a node under `id`
    pub fn add_node(&mut self, id: impl Into<NodeId>, node: impl Node<S, C> + 'static) -> &mut Self {
        let id = id.into();
        if id == END {
            self.problems.push(WorkflowError::ReservedNodeId(id));
        } else if self.nodes.contains_key(&id) {
            self.problems.push(WorkflowError::DuplicateNode(id));
        } else {
            self.nodes.insert(id, Arc::new(node));
        }
        self
    }

    /// Register a synchronous closure as a node
    pub fn add_fn_node<F>(&mut self, id: impl Into<NodeId>, f: F) -> &mut Self
    where
        F: Fn(&S, &C) -> Result<S::Update, OpsGraphError> + Send + Sync + 'static,
    {
        self.add_node(id, FnNode(f))
    }

    /// Static edge `from -> to`
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.edges.push((from.into(), Edge::Static(to.into())));
        self
    }

    /// Conditional edge `from -> router -> {label: to}`
    pub fn add_conditional_edges<L, F, I, T>(
        &mut self,
        from: impl Into<NodeId>,
        router: F,
        branches: I,
    ) -> &mut Self
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
        I: IntoIterator<Item = (L, T)>,
        T: Into<NodeId>,
    {
        let branches: HashMap<String, NodeId> = branches
            .into_iter()
            .map(|(label, to)| (label.label().to_string(), to.into()))
            .collect();
        let router = Arc::new(move |state: &S| router(state).label().to_string());
        self.edges
            .push((from.into(), Edge::Conditional { router, branches }));
        self
    }

    /// Record a wiring problem to be returned by `compile`
    pub(crate) fn report(&mut self, problem: WorkflowError) -> &mut Self {
        self.problems.push(problem);
        self
    }

    pub fn set_entry_point(&mut self, id: impl Into<NodeId>) -> &mut Self {
        self.entry = Some(id.into());
        self
    }

    pub fn set_step_limit(&mut self, limit: usize) -> &mut Self {
        self.step_limit = limit;
        self
    }

    /// Validate the wiring and freeze the graph
    pub fn compile(mut self) -> Result<CompiledGraph<S, C>, WorkflowError> {
        if !self.problems.is_empty() {
            return Err(self.problems.remove(0));
        }

        let entry = self.entry.take().ok_or(WorkflowError::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry) {
            return Err(WorkflowError::UnknownNode(entry));
        }

        let mut edges: HashMap<NodeId, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if !self.nodes.contains_key(&from) {
                let to = edge.targets().first().map(|s| s.to_string()).unwrap_or_default();
                return Err(WorkflowError::DanglingEdge { from, to });
            }
            for to in edge.targets() {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(WorkflowError::DanglingEdge {
                        from,
                        to: to.to_string(),
                    });
                }
            }
            if edges.contains_key(&from) {
                return Err(WorkflowError::DuplicateEdge(from));
            }
            edges.insert(from, edge);
        }

        let mut ids: Vec<&NodeId> = self.nodes.keys().collect();
        ids.sort();
        if let Some(orphan) = ids.into_iter().find(|id| !edges.contains_key(*id)) {
            return Err(WorkflowError::MissingEdge(orphan.clone()));
        }

        log::debug!(
            "Compiled graph '{}' with {} nodes, entry '{}'",
            self.name,
            self.nodes.len(),
            entry
        );

        Ok(CompiledGraph::new(
            self.name,
            self.nodes,
            edges,
            entry,
            self.step_limit,
        ))
    }
}
