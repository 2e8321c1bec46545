//! Core graph types: state contract, nodes, route labels and edges

use crate::adk::error::OpsGraphError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Node identifier, unique within a graph
pub type NodeId = String;

/// Terminal marker. Routing to it ends the run.
pub const END: &str = "__end__";

/// Typed workflow state
///
/// A node returns an `Update`: a partial state whose fields are all optional.
/// `merge` overwrites exactly the fields present in the update and leaves
/// every other field untouched, so merging `Update::default()` is a no-op.
pub trait GraphState: Send + Sync + 'static {
    type Update: Default + Send + 'static;

    fn merge(&mut self, update: Self::Update);
}

/// Enumerated result of a route function
///
/// Each conditional edge declares its own label type; the label string is
/// looked up in the edge's branch table.
pub trait RouteLabel: Send + 'static {
    fn label(&self) -> &str;
}

/// A named computation step
#[async_trait]
pub trait Node<S: GraphState, C: Send + Sync + 'static>: Send + Sync {
    async fn run(&self, state: &S, ctx: &C) -> Result<S::Update, OpsGraphError>;
}

/// Adapter for synchronous closures
pub struct FnNode<F>(pub F);

#[async_trait]
impl<S, C, F> Node<S, C> for FnNode<F>
where
    S: GraphState,
    C: Send + Sync + 'static,
    F: Fn(&S, &C) -> Result<S::Update, OpsGraphError> + Send + Sync,
{
    async fn run(&self, state: &S, ctx: &C) -> Result<S::Update, OpsGraphError> {
        (self.0)(state, ctx)
    }
}

pub(crate) type RouteFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Outgoing transition of a node
pub enum Edge<S> {
    /// Always go to the target
    Static(NodeId),
    /// Call the route function on the post-merge state and look its label up
    Conditional {
        router: RouteFn<S>,
        branches: HashMap<String, NodeId>,
    },
}

impl<S> Edge<S> {
    /// All node ids this edge can lead to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Static(to) => vec![to.as_str()],
            Edge::Conditional { branches, .. } => branches.values().map(|s| s.as_str()).collect(),
        }
    }
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Static(to) => f.debug_tuple("Static").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}
