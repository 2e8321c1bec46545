// SPDX-License-Identifier: MIT

//! Supervisor dispatch
//!
//! A router node owns a fixed, ordered list of specialists. After every
//! specialist control returns to the router, which picks the first specialist
//! not yet listed in `steps_completed`, or `FINISH` once all of them are.

use super::builder::StateGraph;
use super::types::{GraphState, NodeId, RouteLabel};
use crate::adk::error::WorkflowError;

/// Sentinel label returned once every specialist has completed
pub const FINISH: &str = "FINISH";

/// State that records which specialists have run
pub trait TracksProgress {
    fn steps_completed(&self) -> &[String];
}

/// Route decision of the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorRoute {
    Dispatch(NodeId),
    Finish,
}

impl RouteLabel for SupervisorRoute {
    fn label(&self) -> &str {
        match self {
            SupervisorRoute::Dispatch(id) => id,
            SupervisorRoute::Finish => FINISH,
        }
    }
}

/// `steps` with `id` appended
pub fn mark_completed(steps: &[String], id: &str) -> Vec<String> {
    let mut steps = steps.to_vec();
    steps.push(id.to_string());
    steps
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    specialists: Vec<NodeId>,
}

impl Supervisor {
    pub fn new<I, T>(specialists: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self {
            specialists: specialists.into_iter().map(Into::into).collect(),
        }
    }

    pub fn specialists(&self) -> &[NodeId] {
        &self.specialists
    }

    /// First specialist not yet completed, in priority order
    pub fn next(&self, completed: &[String]) -> SupervisorRoute {
        self.specialists
            .iter()
            .find(|s| !completed.iter().any(|c| c == *s))
            .map(|s| SupervisorRoute::Dispatch(s.clone()))
            .unwrap_or(SupervisorRoute::Finish)
    }

    /// Add the router node, its dispatch edge and the specialist return edges
    ///
    /// Specialist nodes and the `finish` node are registered by the caller.
    pub fn wire<S, C>(&self, graph: &mut StateGraph<S, C>, router_id: &str, finish: &str)
    where
        S: GraphState + TracksProgress,
        C: Send + Sync + 'static,
    {
        // the finish label shares the branch table with specialist ids
        for specialist in self.specialists.iter().filter(|s| s.as_str() == FINISH) {
            graph.report(WorkflowError::ReservedNodeId(specialist.clone()));
        }

        graph.add_fn_node(router_id, |_: &S, _: &C| Ok(S::Update::default()));

        let mut branches: Vec<(SupervisorRoute, NodeId)> = self
            .specialists
            .iter()
            .map(|s| (SupervisorRoute::Dispatch(s.clone()), s.clone()))
            .collect();
        branches.push((SupervisorRoute::Finish, finish.to_string()));

        let supervisor = self.clone();
        graph.add_conditional_edges(
            router_id,
            move |state: &S| {
                let route = supervisor.next(state.steps_completed());
                log::info!(
                    "Supervisor: {} of {} specialists done, next {}",
                    state.steps_completed().len(),
                    supervisor.specialists.len(),
                    route.label()
                );
                route
            },
            branches,
        );

        for specialist in &self.specialists {
            graph.add_edge(specialist.clone(), router_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opsgraph::graph::types::END;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Progress {
        steps_completed: Vec<String>,
        errors: Vec<String>,
    }

    #[derive(Default)]
    struct ProgressUpdate {
        steps_completed: Option<Vec<String>>,
        errors: Option<Vec<String>>,
    }

    impl GraphState for Progress {
        type Update = ProgressUpdate;

        fn merge(&mut self, update: ProgressUpdate) {
            if let Some(s) = update.steps_completed {
                self.steps_completed = s;
            }
            if let Some(e) = update.errors {
                self.errors = e;
            }
        }
    }

    impl TracksProgress for Progress {
        fn steps_completed(&self) -> &[String] {
            &self.steps_completed
        }
    }

    #[test]
    fn test_next_follows_priority_order() {
        let sup = Supervisor::new(["a", "b", "c"]);
        assert_eq!(sup.next(&[]), SupervisorRoute::Dispatch("a".to_string()));
        assert_eq!(
            sup.next(&["a".to_string()]),
            SupervisorRoute::Dispatch("b".to_string())
        );
        assert_eq!(
            sup.next(&["b".to_string()]),
            SupervisorRoute::Dispatch("a".to_string())
        );
        let all: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sup.next(&all), SupervisorRoute::Finish);
    }

    #[test]
    fn test_labels() {
        assert_eq!(SupervisorRoute::Finish.label(), FINISH);
        assert_eq!(SupervisorRoute::Dispatch("x".to_string()).label(), "x");
    }

    #[test]
    fn test_mark_completed_appends() {
        let steps = vec!["a".to_string()];
        assert_eq!(mark_completed(&steps, "b"), vec!["a", "b"]);
        assert_eq!(steps, vec!["a"]);
    }

    #[test]
    fn test_specialist_named_finish_is_rejected() {
        let sup = Supervisor::new(["first", FINISH]);
        let mut graph = StateGraph::<Progress, ()>::new("hub");
        for id in ["first", FINISH, "compile"] {
            graph.add_fn_node(id, |_: &Progress, _: &()| Ok(ProgressUpdate::default()));
        }
        graph.add_edge("compile", END).set_entry_point("router");
        sup.wire(&mut graph, "router", "compile");

        assert_eq!(
            graph.compile().err(),
            Some(WorkflowError::ReservedNodeId(FINISH.to_string()))
        );
    }

    #[tokio::test]
    async fn test_wired_graph_visits_each_specialist_once() {
        let sup = Supervisor::new(["first", "second", "third"]);
        let mut graph = StateGraph::<Progress, ()>::new("hub");

        for id in ["first", "third"] {
            graph.add_fn_node(id, move |s: &Progress, _: &()| {
                Ok(ProgressUpdate {
                    steps_completed: Some(mark_completed(&s.steps_completed, id)),
                    errors: None,
                })
            });
        }
        // a failing specialist still records itself and returns to the router
        graph.add_fn_node("second", |s: &Progress, _: &()| {
            let mut errors = s.errors.clone();
            errors.push("second: upstream timeout".to_string());
            Ok(ProgressUpdate {
                steps_completed: Some(mark_completed(&s.steps_completed, "second")),
                errors: Some(errors),
            })
        });
        graph.add_fn_node("compile", |_: &Progress, _: &()| Ok(ProgressUpdate::default()));
        graph.add_edge("compile", END);
        graph.set_entry_point("router");
        sup.wire(&mut graph, "router", "compile");

        let exec = graph
            .compile()
            .unwrap()
            .run_traced(Progress::default(), &())
            .await
            .unwrap();

        assert_eq!(
            exec.path,
            vec!["router", "first", "router", "second", "router", "third", "router", "compile"]
        );
        assert_eq!(exec.state.steps_completed, vec!["first", "second", "third"]);
        assert_eq!(exec.state.errors.len(), 1);
    }
}
