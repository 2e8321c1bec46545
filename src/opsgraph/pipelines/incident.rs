// SPDX-License-Identifier: MIT

//! Incident response: a supervisor dispatching three specialists in turn,
//! then compiling their findings into one report.

use crate::adk::error::{OpsGraphError, SinkError, WorkflowError};
use crate::opsgraph::context::{ExecutionContext, RunSettings};
use crate::opsgraph::graph::{
    mark_completed, CompiledGraph, GraphState, Node, StateGraph, Supervisor, TracksProgress, END,
};
use crate::opsgraph::prompts::{render, INCIDENT_LOG_ANALYSIS, INCIDENT_ROOT_CAUSE, INCIDENT_SOLUTION};
use crate::opsgraph::sink::{Artifact, ArtifactSink};
use async_trait::async_trait;
use chrono::Utc;

pub const OUTPUT_DIR: &str = "incident_response";
pub const ROUTER: &str = "router";
pub const COMPILE_REPORT: &str = "compile_report";

const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentState {
    pub log_content: String,
    pub log_analysis: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub incident_report: String,
    pub steps_completed: Vec<String>,
    pub errors: Vec<String>,
}

impl IncidentState {
    pub fn new(log_content: impl Into<String>) -> Self {
        Self {
            log_content: log_content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct IncidentUpdate {
    pub log_analysis: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub incident_report: Option<String>,
    pub steps_completed: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl GraphState for IncidentState {
    type Update = IncidentUpdate;

    fn merge(&mut self, update: IncidentUpdate) {
        if let Some(v) = update.log_analysis {
            self.log_analysis = Some(v);
        }
        if let Some(v) = update.root_cause {
            self.root_cause = Some(v);
        }
        if let Some(v) = update.solution {
            self.solution = Some(v);
        }
        if let Some(v) = update.incident_report {
            self.incident_report = v;
        }
        if let Some(v) = update.steps_completed {
            self.steps_completed = v;
        }
        if let Some(v) = update.errors {
            self.errors = v;
        }
    }
}

impl TracksProgress for IncidentState {
    fn steps_completed(&self) -> &[String] {
        &self.steps_completed
    }
}

/// The three specialists, in dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specialist {
    LogAnalyzer,
    RootCauseInvestigator,
    SolutionRecommender,
}

impl Specialist {
    pub const ALL: [Specialist; 3] = [
        Specialist::LogAnalyzer,
        Specialist::RootCauseInvestigator,
        Specialist::SolutionRecommender,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Specialist::LogAnalyzer => "log_analyzer",
            Specialist::RootCauseInvestigator => "root_cause_investigator",
            Specialist::SolutionRecommender => "solution_recommender",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Specialist::LogAnalyzer => "Log Analyzer",
            Specialist::RootCauseInvestigator => "Root Cause Investigator",
            Specialist::SolutionRecommender => "Solution Recommender",
        }
    }

    fn prompt(&self, state: &IncidentState) -> String {
        let analysis = state.log_analysis.as_deref().unwrap_or_default();
        match self {
            Specialist::LogAnalyzer => {
                render(INCIDENT_LOG_ANALYSIS, &[("log_content", &state.log_content)])
            }
            Specialist::RootCauseInvestigator => render(
                INCIDENT_ROOT_CAUSE,
                &[("log_analysis", analysis), ("log_content", &state.log_content)],
            ),
            Specialist::SolutionRecommender => render(
                INCIDENT_SOLUTION,
                &[
                    ("root_cause", state.root_cause.as_deref().unwrap_or_default()),
                    ("log_analysis", analysis),
                ],
            ),
        }
    }

    fn finding(&self, text: String) -> IncidentUpdate {
        match self {
            Specialist::LogAnalyzer => IncidentUpdate {
                log_analysis: Some(text),
                ..Default::default()
            },
            Specialist::RootCauseInvestigator => IncidentUpdate {
                root_cause: Some(text),
                ..Default::default()
            },
            Specialist::SolutionRecommender => IncidentUpdate {
                solution: Some(text),
                ..Default::default()
            },
        }
    }
}

/// A failed call still records the specialist as done and returns to the router
#[async_trait]
impl Node<IncidentState, ExecutionContext> for Specialist {
    async fn run(&self, state: &IncidentState, ctx: &ExecutionContext) -> Result<IncidentUpdate, OpsGraphError> {
        log::info!("{} running...", self.display_name());
        let steps = mark_completed(&state.steps_completed, self.id());

        let update = match ctx.ask(&self.prompt(state)).await {
            Ok(text) => {
                log::info!("{} finished ({} chars)", self.display_name(), text.len());
                IncidentUpdate {
                    steps_completed: Some(steps),
                    ..self.finding(text)
                }
            }
            Err(e) => {
                log::error!("{} failed: {}", self.display_name(), e);
                let mut errors = state.errors.clone();
                errors.push(format!("{}: {}", self.display_name(), e));
                IncidentUpdate {
                    steps_completed: Some(steps),
                    errors: Some(errors),
                    ..self.finding(format!("Error: {e}"))
                }
            }
        };
        Ok(update)
    }
}

/// Render the final report from the specialists' findings
pub fn compile_report(state: &IncidentState) -> String {
    let section = |title: &str, body: &Option<String>| {
        format!(
            "== {} ==\n{}\n",
            title,
            body.as_deref().map(str::trim).unwrap_or(NOT_AVAILABLE)
        )
    };

    let mut report = format!(
        "INCIDENT RESPONSE REPORT\nGenerated: {}\nSpecialists: {}\n\n",
        Utc::now().to_rfc3339(),
        state.steps_completed.join(" -> ")
    );
    report.push_str(&section("LOG ANALYSIS", &state.log_analysis));
    report.push('\n');
    report.push_str(&section("ROOT CAUSE", &state.root_cause));
    report.push('\n');
    report.push_str(&section("RECOMMENDED SOLUTION", &state.solution));

    if !state.errors.is_empty() {
        report.push_str("\n== ERRORS ==\n");
        for error in &state.errors {
            report.push_str(&format!("- {}\n", error));
        }
    }
    report
}

/// Write the compiled report through `sink`
pub async fn save_report(state: &IncidentState, sink: &dyn ArtifactSink) -> Result<String, SinkError> {
    sink.write(
        &format!("{OUTPUT_DIR}/incident_report.txt"),
        &Artifact::Text(state.incident_report.clone()),
    )
    .await
}

pub fn build_graph(
    settings: &RunSettings,
) -> Result<CompiledGraph<IncidentState, ExecutionContext>, WorkflowError> {
    let supervisor = Supervisor::new(Specialist::ALL.iter().map(Specialist::id));

    let mut graph = StateGraph::<IncidentState, ExecutionContext>::new("incident_response");
    for specialist in Specialist::ALL {
        graph.add_node(specialist.id(), specialist);
    }
    graph
        .add_fn_node(COMPILE_REPORT, |s: &IncidentState, _: &ExecutionContext| {
            log::info!("Compiling incident report from {} specialists", s.steps_completed.len());
            Ok(IncidentUpdate {
                incident_report: Some(compile_report(s)),
                ..Default::default()
            })
        })
        .add_edge(COMPILE_REPORT, END)
        .set_entry_point(ROUTER)
        .set_step_limit(settings.step_limit);
    supervisor.wire(&mut graph, ROUTER, COMPILE_REPORT);
    graph.compile()
}
