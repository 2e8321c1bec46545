// SPDX-License-Identifier: MIT

//! Log analysis workflow: `context -> analyze -> save -> END`

use crate::adk::error::{OpsGraphError, ParseError, WorkflowError};
use crate::opsgraph::context::{ExecutionContext, RunSettings};
use crate::opsgraph::graph::{CompiledGraph, GraphState, Node, StateGraph, END};
use crate::opsgraph::memory::{preview, Metadata};
use crate::opsgraph::prompts::LOG_ANALYZER_SYSTEM;
use crate::opsgraph::sink::Artifact;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const MEMORY_NAMESPACE: &str = "log_analyzer_memory";
pub const OUTPUT_DIR: &str = "log_analyzer";

/// Line separating the JSON report from the executive summary
pub const EXECUTIVE_MARKER: &str = "---EXECUTIVE---";
pub const NO_EXECUTIVE_SUMMARY: &str = "Executive summary not generated.";

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Report used when the JSON section is missing or unreadable
pub fn report_fallback() -> Value {
    json!({"error": "Failed to parse JSON"})
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogAnalysisState {
    pub log_content: String,
    pub context: String,
    pub analysis_text: String,
    pub analysis_json: Value,
    pub executive_summary: String,
    pub saved: Vec<String>,
    pub errors: Vec<String>,
}

impl LogAnalysisState {
    pub fn new(log_content: impl Into<String>) -> Self {
        Self {
            log_content: log_content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct LogAnalysisUpdate {
    pub context: Option<String>,
    pub analysis_text: Option<String>,
    pub analysis_json: Option<Value>,
    pub executive_summary: Option<String>,
    pub saved: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl GraphState for LogAnalysisState {
    type Update = LogAnalysisUpdate;

    fn merge(&mut self, update: LogAnalysisUpdate) {
        if let Some(v) = update.context {
            self.context = v;
        }
        if let Some(v) = update.analysis_text {
            self.analysis_text = v;
        }
        if let Some(v) = update.analysis_json {
            self.analysis_json = v;
        }
        if let Some(v) = update.executive_summary {
            self.executive_summary = v;
        }
        if let Some(v) = update.saved {
            self.saved = v;
        }
        if let Some(v) = update.errors {
            self.errors = v;
        }
    }
}

/// The three parts of an analysis response, each recovered independently
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSections {
    pub text: String,
    pub report: Value,
    pub executive: String,
    /// Sections that fell back to their default
    pub issues: Vec<ParseError>,
}

/// Split narrative text, the fenced JSON report and the executive summary
pub fn parse_analysis(response: &str) -> AnalysisSections {
    let mut issues = Vec::new();

    let (text, json_block, tail) = match response.split_once(JSON_FENCE) {
        Some((before, rest)) => match rest.split_once(FENCE) {
            Some((block, after)) => (before, Some(block), after),
            None => match rest.split_once(EXECUTIVE_MARKER) {
                Some((block, _)) => (before, Some(block), &rest[block.len()..]),
                None => (before, Some(rest), ""),
            },
        },
        None => {
            let before = response
                .split_once(EXECUTIVE_MARKER)
                .map_or(response, |(b, _)| b);
            (before, None, &response[before.len()..])
        }
    };

    let report = match json_block {
        None => {
            issues.push(ParseError::MissingSection("json report".to_string()));
            report_fallback()
        }
        Some(block) => match serde_json::from_str::<Value>(block.trim()) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                issues.push(ParseError::UnexpectedShape {
                    expected: "object".to_string(),
                    found: "non-object JSON".to_string(),
                });
                report_fallback()
            }
            Err(e) => {
                issues.push(ParseError::InvalidJson(e.to_string()));
                report_fallback()
            }
        },
    };

    let executive = match tail.split_once(EXECUTIVE_MARKER) {
        Some((_, summary)) if !summary.trim().is_empty() => summary.trim().to_string(),
        _ => {
            issues.push(ParseError::MissingSection("executive summary".to_string()));
            NO_EXECUTIVE_SUMMARY.to_string()
        }
    };

    AnalysisSections {
        text: text.trim().to_string(),
        report,
        executive,
        issues,
    }
}

fn with_error(errors: &[String], error: String) -> Vec<String> {
    let mut errors = errors.to_vec();
    errors.push(error);
    errors
}

fn string_list(report: &Value, key: &str, n: usize) -> String {
    report
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(n)
                .map(|v| v.as_str().map_or_else(|| v.to_string(), String::from))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

pub struct LoadContext;

#[async_trait]
impl Node<LogAnalysisState, ExecutionContext> for LoadContext {
    async fn run(&self, state: &LogAnalysisState, ctx: &ExecutionContext) -> Result<LogAnalysisUpdate, OpsGraphError> {
        let context = ctx
            .prompt_context(
                &format!("past incidents similar to: {}", preview(&state.log_content, 300)),
                &format!("troubleshooting guide for: {}", preview(&state.log_content, 500)),
                &format!("Now analyze this log:\n{}", state.log_content),
            )
            .await;
        Ok(LogAnalysisUpdate {
            context: Some(context.render()),
            ..Default::default()
        })
    }
}

pub struct Analyze;

#[async_trait]
impl Node<LogAnalysisState, ExecutionContext> for Analyze {
    async fn run(&self, state: &LogAnalysisState, ctx: &ExecutionContext) -> Result<LogAnalysisUpdate, OpsGraphError> {
        log::info!("Analyzing log with retrieved context...");
        let response = match ctx.generate(LOG_ANALYZER_SYSTEM, &state.context).await {
            Ok(r) => r,
            Err(e) => {
                log::error!("LLM call failed: {}", e);
                return Ok(LogAnalysisUpdate {
                    analysis_text: Some(String::new()),
                    analysis_json: Some(json!({})),
                    executive_summary: Some(String::new()),
                    errors: Some(with_error(&state.errors, format!("LLM error: {e}"))),
                    ..Default::default()
                });
            }
        };

        let sections = parse_analysis(&response);
        for issue in &sections.issues {
            log::warn!("Analysis response: {}", issue);
        }
        log::info!("Analysis complete ({} chars of narrative)", sections.text.len());

        ctx.remember(
            "user",
            &format!("Analyze log: {}...", preview(&state.log_content, 100)),
        )
        .await;
        ctx.remember(
            "agent",
            &format!("Analyzed log with {} chars", sections.text.len()),
        )
        .await;

        Ok(LogAnalysisUpdate {
            analysis_text: Some(sections.text),
            analysis_json: Some(sections.report),
            executive_summary: Some(sections.executive),
            ..Default::default()
        })
    }
}

pub struct Save;

#[async_trait]
impl Node<LogAnalysisState, ExecutionContext> for Save {
    async fn run(&self, state: &LogAnalysisState, ctx: &ExecutionContext) -> Result<LogAnalysisUpdate, OpsGraphError> {
        if !state.errors.is_empty() {
            log::warn!("Skipping save due to {} error(s)", state.errors.len());
            return Ok(LogAnalysisUpdate::default());
        }

        let outputs = [
            (
                format!("{OUTPUT_DIR}/analysis_report.txt"),
                Artifact::Text(state.analysis_text.clone()),
            ),
            (
                format!("{OUTPUT_DIR}/analysis_report.json"),
                Artifact::Json(state.analysis_json.clone()),
            ),
            (
                format!("{OUTPUT_DIR}/executive_summary.txt"),
                Artifact::Text(state.executive_summary.clone()),
            ),
        ];
        let mut saved = state.saved.clone();
        for (destination, artifact) in &outputs {
            match ctx.sink.write(destination, artifact).await {
                Ok(location) => saved.push(location),
                Err(e) => {
                    log::error!("Save failed, skipping memory write: {}", e);
                    return Ok(LogAnalysisUpdate {
                        saved: Some(saved),
                        errors: Some(with_error(&state.errors, format!("Save error: {e}"))),
                        ..Default::default()
                    });
                }
            }
        }

        let report = &state.analysis_json;
        let error_count = report.get("error_count").and_then(Value::as_i64).unwrap_or(0);
        let severity = report
            .get("severity")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let interaction = format!(
            "Analyzed log with {} errors (severity: {})\n\nLog preview: {}\n\nRoot causes: {}\nRecommendations: {}",
            error_count,
            severity,
            preview(&state.log_content, 200),
            string_list(report, "root_causes", 3),
            string_list(report, "recommendations", 2)
        );
        let mut metadata = Metadata::new();
        metadata.insert("agent".to_string(), json!("log_analyzer"));
        metadata.insert("type".to_string(), json!("incident_analysis"));
        metadata.insert("error_count".to_string(), json!(error_count));
        metadata.insert("severity".to_string(), json!(severity));

        let mut update = LogAnalysisUpdate {
            saved: Some(saved),
            ..Default::default()
        };
        if let Err(e) = ctx.memory.store(&interaction, metadata).await {
            log::warn!("Memory write failed: {}", e);
            update.errors = Some(with_error(&state.errors, format!("Memory error: {e}")));
        }
        Ok(update)
    }
}

pub fn build_graph(
    settings: &RunSettings,
) -> Result<CompiledGraph<LogAnalysisState, ExecutionContext>, WorkflowError> {
    let mut graph = StateGraph::<LogAnalysisState, ExecutionContext>::new("log_analyzer");
    graph
        .add_node("context", LoadContext)
        .add_node("analyze", Analyze)
        .add_node("save", Save)
        .set_entry_point("context")
        .set_step_limit(settings.step_limit)
        .add_edge("context", "analyze")
        .add_edge("analyze", "save")
        .add_edge("save", END);
    graph.compile()
}
