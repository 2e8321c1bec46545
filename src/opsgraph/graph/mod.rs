// SPDX-License-Identifier: MIT

//! State-machine workflow execution
//!
//! A workflow is a `StateGraph` of named nodes joined by static and
//! conditional edges. The executor threads one typed state through the
//! nodes, merging each node's partial update, until it routes to `END`.

pub mod builder;
pub mod executor;
pub mod supervisor;
pub mod types;

pub use builder::{StateGraph, DEFAULT_STEP_LIMIT};
pub use executor::{CompiledGraph, Execution};
pub use supervisor::{mark_completed, Supervisor, SupervisorRoute, TracksProgress, FINISH};
pub use types::{Edge, FnNode, GraphState, Node, NodeId, RouteLabel, END};
