// SPDX-License-Identifier: MIT

//! Test-case generation workflow
//!
//! ```text
//! context -> generate -> validate -+-> preview -> approval -+-> save -> END
//!                          ^       |                        +-> retry
//!                          |       +-> retry                +-> END (abandon)
//!                          +---------- retry
//! ```

use crate::adk::error::{OpsGraphError, ParseError, WorkflowError};
use crate::opsgraph::approval::{request_approval, ApprovalDecision};
use crate::opsgraph::context::{ExecutionContext, RunSettings};
use crate::opsgraph::graph::{CompiledGraph, GraphState, Node, RouteLabel, StateGraph, END};
use crate::opsgraph::memory::{preview, Metadata};
use crate::opsgraph::prompts::{render, TESTCASE_FEEDBACK, TESTCASE_SYSTEM};
use crate::opsgraph::sink::Artifact;
use crate::opsgraph::validation::{RecordSchema, ValidationResult, TEST_CASE_SCHEMA};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Semantic-store namespace for this workflow
pub const MEMORY_NAMESPACE: &str = "testcase_memory";
/// Output sub-directory for saved artifacts
pub const OUTPUT_DIR: &str = "testcase_generated";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCaseState {
    pub requirement: String,
    /// Rendered prompt context
    pub context: String,
    pub test_cases: Vec<Value>,
    pub validation: ValidationResult,
    pub retry_count: u32,
    pub approval: ApprovalDecision,
    pub feedback: Option<String>,
    pub rejections: u32,
    /// Locations written by the save step
    pub saved: Vec<String>,
    pub errors: Vec<String>,
}

impl TestCaseState {
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct TestCaseUpdate {
    pub context: Option<String>,
    pub test_cases: Option<Vec<Value>>,
    pub validation: Option<ValidationResult>,
    pub retry_count: Option<u32>,
    pub approval: Option<ApprovalDecision>,
    pub feedback: Option<Option<String>>,
    pub rejections: Option<u32>,
    pub saved: Option<Vec<String>>,
    pub errors: Option<Vec<String>>,
}

impl GraphState for TestCaseState {
    type Update = TestCaseUpdate;

    fn merge(&mut self, update: TestCaseUpdate) {
        if let Some(v) = update.context {
            self.context = v;
        }
        if let Some(v) = update.test_cases {
            self.test_cases = v;
        }
        if let Some(v) = update.validation {
            self.validation = v;
        }
        if let Some(v) = update.retry_count {
            self.retry_count = v;
        }
        if let Some(v) = update.approval {
            self.approval = v;
        }
        if let Some(v) = update.feedback {
            self.feedback = v;
        }
        if let Some(v) = update.rejections {
            self.rejections = v;
        }
        if let Some(v) = update.saved {
            self.saved = v;
        }
        if let Some(v) = update.errors {
            self.errors = v;
        }
    }
}

/// Decode a model response that must be a bare JSON array
pub fn parse_test_cases(raw: &str) -> Result<Vec<Value>, ParseError> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ParseError::UnexpectedShape {
            expected: "array".to_string(),
            found: json_kind(&other).to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_field(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" | "),
        Some(other) => other.to_string(),
    }
}

/// CSV table of the records: schema fields first, extra keys after, `steps` joined by ` | `
pub fn records_table(records: &[Value]) -> Artifact {
    let mut headers = TEST_CASE_SCHEMA.required_fields.clone();
    let extras: BTreeSet<&String> = records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|o| o.keys())
        .filter(|k| !headers.contains(*k))
        .collect();
    headers.extend(extras.into_iter().cloned());

    let rows = records
        .iter()
        .map(|r| headers.iter().map(|h| cell(r.get(h))).collect())
        .collect();
    Artifact::Table { headers, rows }
}

fn priorities(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| text_field(r, "priority"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn preview_text(state: &TestCaseState) -> String {
    let mut out = String::from("TEST CASES PREVIEW - AWAITING APPROVAL\n");
    for (i, tc) in state.test_cases.iter().enumerate() {
        let steps = tc.get("steps").and_then(Value::as_array).map_or(0, Vec::len);
        out.push_str(&format!(
            "\n[{}] {}: {}\n    Priority: {}\n    Steps: {}\n    Expected: {}\n",
            i + 1,
            text_field(tc, "id"),
            text_field(tc, "title"),
            text_field(tc, "priority"),
            steps,
            preview(&text_field(tc, "expected"), 50)
        ));
    }
    out.push_str(&format!(
        "\nTotal: {} test cases (validation: {}, retries: {})",
        state.test_cases.len(),
        state.validation,
        state.retry_count
    ));
    out
}

fn details_text(state: &TestCaseState) -> String {
    let mut out = String::from("FULL TEST CASE DETAILS\n");
    for (i, tc) in state.test_cases.iter().enumerate() {
        out.push_str(&format!(
            "\nTest Case #{}\nID:       {}\nTitle:    {}\nPriority: {}\nSteps:\n",
            i + 1,
            text_field(tc, "id"),
            text_field(tc, "title"),
            text_field(tc, "priority")
        ));
        if let Some(steps) = tc.get("steps").and_then(Value::as_array) {
            for (j, step) in steps.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", j + 1, cell(Some(step))));
            }
        }
        out.push_str(&format!("Expected:\n  {}\n", text_field(tc, "expected")));
    }
    out
}

fn with_error(errors: &[String], error: String) -> Vec<String> {
    let mut errors = errors.to_vec();
    errors.push(error);
    errors
}

/// Ask the model for a fresh set; failures become an empty set plus an error entry
async fn generate_cases(
    state: &TestCaseState,
    ctx: &ExecutionContext,
    feedback: Option<&str>,
) -> Result<Vec<Value>, String> {
    let mut prompt = state.context.clone();
    if let Some(feedback) = feedback {
        prompt.push_str("\n\n");
        prompt.push_str(&render(TESTCASE_FEEDBACK, &[("feedback", feedback)]));
    }

    let response = ctx
        .generate(TESTCASE_SYSTEM, &prompt)
        .await
        .map_err(|e| format!("LLM error: {e}"))?;
    parse_test_cases(&response).map_err(|e| format!("Parse error: {e}"))
}

/// Gathers recency, memory and knowledge context for the requirement
pub struct LoadContext;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for LoadContext {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        let head = preview(&state.requirement, 200);
        let context = ctx
            .prompt_context(
                &format!("test case patterns for: {head}"),
                &format!("test case guidelines for: {head}"),
                &format!("Generate test cases for this requirement:\n{}", state.requirement),
            )
            .await;
        Ok(TestCaseUpdate {
            context: Some(context.render()),
            ..Default::default()
        })
    }
}

pub struct Generate;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Generate {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        log::info!("Generating test cases...");
        match generate_cases(state, ctx, None).await {
            Ok(cases) => {
                log::info!("Generated {} test cases", cases.len());
                ctx.remember(
                    "user",
                    &format!("Generate tests: {}...", preview(&state.requirement, 100)),
                )
                .await;
                ctx.remember("agent", &format!("Generated {} test cases", cases.len()))
                    .await;
                Ok(TestCaseUpdate {
                    test_cases: Some(cases),
                    validation: Some(ValidationResult::Pending),
                    ..Default::default()
                })
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                Ok(TestCaseUpdate {
                    test_cases: Some(Vec::new()),
                    validation: Some(ValidationResult::Fail),
                    errors: Some(with_error(&state.errors, e)),
                    ..Default::default()
                })
            }
        }
    }
}

pub struct Validate {
    schema: RecordSchema,
}

impl Validate {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Validate {
    async fn run(&self, state: &TestCaseState, _ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        Ok(TestCaseUpdate {
            validation: Some(self.schema.validate(&state.test_cases)),
            ..Default::default()
        })
    }
}

/// Regenerates with the same context plus any rejection feedback
pub struct Retry;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Retry {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        let retry_count = state.retry_count + 1;
        log::warn!("Retry attempt {}/{}", retry_count, ctx.settings.max_retries);

        let feedback = match state.approval {
            ApprovalDecision::Rejected => state.feedback.as_deref(),
            _ => None,
        };

        let mut update = TestCaseUpdate {
            retry_count: Some(retry_count),
            validation: Some(ValidationResult::Pending),
            approval: Some(ApprovalDecision::Pending),
            ..Default::default()
        };
        match generate_cases(state, ctx, feedback).await {
            Ok(cases) => {
                log::info!("Regenerated {} test cases", cases.len());
                update.test_cases = Some(cases);
            }
            Err(e) => {
                log::error!("Regeneration failed: {}", e);
                update.test_cases = Some(Vec::new());
                update.errors = Some(with_error(&state.errors, e));
            }
        }
        Ok(update)
    }
}

pub struct Preview;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Preview {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        ctx.operator.show(&preview_text(state)).await?;
        log::info!("Preview shown: {} test cases", state.test_cases.len());
        Ok(TestCaseUpdate {
            approval: Some(ApprovalDecision::Pending),
            ..Default::default()
        })
    }
}

/// Blocks on the operator for approve or reject
pub struct Approval;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Approval {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        let outcome = request_approval(ctx.operator.as_ref(), &details_text(state)).await?;
        let rejections = match outcome.decision {
            ApprovalDecision::Rejected => state.rejections + 1,
            _ => state.rejections,
        };
        Ok(TestCaseUpdate {
            approval: Some(outcome.decision),
            feedback: Some(Some(outcome.feedback)),
            rejections: Some(rejections),
            ..Default::default()
        })
    }
}

/// Writes the approved set and records the interaction in memory
pub struct Save;

#[async_trait]
impl Node<TestCaseState, ExecutionContext> for Save {
    async fn run(&self, state: &TestCaseState, ctx: &ExecutionContext) -> Result<TestCaseUpdate, OpsGraphError> {
        let cases = &state.test_cases;
        if cases.is_empty() {
            log::warn!("No test cases to save");
            return Ok(TestCaseUpdate::default());
        }

        let outputs = [
            (
                format!("{OUTPUT_DIR}/raw_output.json"),
                Artifact::Json(Value::Array(cases.clone())),
            ),
            (format!("{OUTPUT_DIR}/test_cases.csv"), records_table(cases)),
        ];
        let mut saved = state.saved.clone();
        for (destination, artifact) in &outputs {
            match ctx.sink.write(destination, artifact).await {
                Ok(location) => saved.push(location),
                Err(e) => {
                    log::error!("Save failed, skipping memory write: {}", e);
                    return Ok(TestCaseUpdate {
                        saved: Some(saved),
                        errors: Some(with_error(&state.errors, format!("Save error: {e}"))),
                        ..Default::default()
                    });
                }
            }
        }

        let ids: Vec<String> = cases.iter().take(5).map(|tc| text_field(tc, "id")).collect();
        let priorities = priorities(cases).join(", ");
        let interaction = format!(
            "Generated {} test cases for: {}\n\nTest cases included:\n{}\n\nPriorities: {}",
            cases.len(),
            preview(&state.requirement, 100),
            ids.join(", "),
            priorities
        );
        let mut metadata = Metadata::new();
        metadata.insert("agent".to_string(), json!("testcase_generator"));
        metadata.insert("type".to_string(), json!("test_generation"));
        metadata.insert("count".to_string(), json!(cases.len()));
        metadata.insert("priorities".to_string(), json!(priorities));

        let mut update = TestCaseUpdate {
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

/// Decision after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterValidation {
    Preview,
    Retry,
}

impl RouteLabel for AfterValidation {
    fn label(&self) -> &str {
        match self {
            AfterValidation::Preview => "preview",
            AfterValidation::Retry => "retry",
        }
    }
}

pub fn route_after_validation(state: &TestCaseState, max_retries: u32) -> AfterValidation {
    match state.validation {
        ValidationResult::Pass => {
            log::info!("Validation passed, routing to preview");
            AfterValidation::Preview
        }
        _ if state.retry_count < max_retries => {
            log::warn!(
                "Routing to retry (attempt {}/{})",
                state.retry_count + 1,
                max_retries
            );
            AfterValidation::Retry
        }
        _ => {
            log::error!("Max retries reached, routing to preview");
            AfterValidation::Preview
        }
    }
}

/// Decision after the human gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterApproval {
    Save,
    Retry,
    Abandon,
}

impl RouteLabel for AfterApproval {
    fn label(&self) -> &str {
        match self {
            AfterApproval::Save => "save",
            AfterApproval::Retry => "retry",
            AfterApproval::Abandon => "abandon",
        }
    }
}

pub fn route_after_approval(state: &TestCaseState, max_rejections: u32) -> AfterApproval {
    match state.approval {
        ApprovalDecision::Approved => AfterApproval::Save,
        ApprovalDecision::Rejected if state.rejections > max_rejections => {
            log::error!(
                "Rejected {} times (limit {}), abandoning without saving",
                state.rejections,
                max_rejections
            );
            AfterApproval::Abandon
        }
        ApprovalDecision::Rejected => AfterApproval::Retry,
        ApprovalDecision::Pending => {
            log::error!("Approval still pending after the gate, abandoning");
            AfterApproval::Abandon
        }
    }
}

/// Longest path the retry and approval bounds allow, with headroom
///
/// Each rejection forces one extra retry on top of `max_retries`, and every
/// pass through the gate costs preview plus approval.
pub fn step_bound(max_retries: u32, max_rejections: u32) -> usize {
    4 * (max_retries as usize + max_rejections as usize + 2)
}

pub fn build_graph(
    settings: &RunSettings,
) -> Result<CompiledGraph<TestCaseState, ExecutionContext>, WorkflowError> {
    let max_retries = settings.max_retries;
    let max_rejections = settings.max_rejections;
    let step_limit = settings
        .step_limit
        .max(step_bound(max_retries, max_rejections));
    if step_limit > settings.step_limit {
        log::debug!(
            "Raising step limit from {} to {} for {} retries and {} rejections",
            settings.step_limit,
            step_limit,
            max_retries,
            max_rejections
        );
    }

    let mut graph = StateGraph::<TestCaseState, ExecutionContext>::new("testcase_generator");
    graph
        .add_node("context", LoadContext)
        .add_node("generate", Generate)
        .add_node("validate", Validate::new(TEST_CASE_SCHEMA.clone()))
        .add_node("retry", Retry)
        .add_node("preview", Preview)
        .add_node("approval", Approval)
        .add_node("save", Save)
        .set_entry_point("context")
        .set_step_limit(step_limit)
        .add_edge("context", "generate")
        .add_edge("generate", "validate")
        .add_conditional_edges(
            "validate",
            move |s: &TestCaseState| route_after_validation(s, max_retries),
            [
                (AfterValidation::Preview, "preview"),
                (AfterValidation::Retry, "retry"),
            ],
        )
        .add_edge("retry", "validate")
        .add_edge("preview", "approval")
        .add_conditional_edges(
            "approval",
            move |s: &TestCaseState| route_after_approval(s, max_rejections),
            [
                (AfterApproval::Save, "save"),
                (AfterApproval::Retry, "retry"),
                (AfterApproval::Abandon, END),
            ],
        )
        .add_edge("save", END);
    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(retry_count: u32) -> TestCaseState {
        TestCaseState {
            validation: ValidationResult::Fail,
            retry_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_empty_update_is_noop() {
        let mut state = TestCaseState::new("login");
        state.retry_count = 2;
        state.errors = vec!["x".to_string()];
        let before = state.clone();
        state.merge(TestCaseUpdate::default());
        assert_eq!(state, before);
    }

    #[test]
    fn test_merge_can_clear_feedback() {
        let mut state = TestCaseState {
            feedback: Some("old".to_string()),
            ..Default::default()
        };
        state.merge(TestCaseUpdate {
            feedback: Some(None),
            ..Default::default()
        });
        assert!(state.feedback.is_none());
    }

    #[test]
    fn test_route_after_validation() {
        let pass = TestCaseState {
            validation: ValidationResult::Pass,
            retry_count: 0,
            ..Default::default()
        };
        assert_eq!(route_after_validation(&pass, 3), AfterValidation::Preview);
        assert_eq!(route_after_validation(&failing(0), 3), AfterValidation::Retry);
        assert_eq!(route_after_validation(&failing(2), 3), AfterValidation::Retry);
        assert_eq!(route_after_validation(&failing(3), 3), AfterValidation::Preview);

        let pending = TestCaseState::default();
        assert_eq!(route_after_validation(&pending, 3), AfterValidation::Retry);
    }

    #[test]
    fn test_route_after_approval() {
        let mut state = TestCaseState {
            approval: ApprovalDecision::Approved,
            ..Default::default()
        };
        assert_eq!(route_after_approval(&state, 3), AfterApproval::Save);

        state.approval = ApprovalDecision::Rejected;
        state.rejections = 3;
        assert_eq!(route_after_approval(&state, 3), AfterApproval::Retry);
        state.rejections = 4;
        assert_eq!(route_after_approval(&state, 3), AfterApproval::Abandon);

        state.approval = ApprovalDecision::Pending;
        assert_eq!(route_after_approval(&state, 3), AfterApproval::Abandon);
    }

    #[test]
    fn test_parse_test_cases_is_strict() {
        assert_eq!(parse_test_cases(" [] ").unwrap().len(), 0);
        assert!(matches!(
            parse_test_cases("```json\n[]\n```"),
            Err(ParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_test_cases(r#"{"id": "TC-001"}"#),
            Err(ParseError::UnexpectedShape {
                expected: "array".to_string(),
                found: "object".to_string()
            })
        );
    }

    #[test]
    fn test_records_table_joins_steps() {
        let records = vec![json!({
            "id": "TC-001",
            "title": "Valid login",
            "steps": ["Open login page", "Submit credentials"],
            "expected": "Dashboard",
            "priority": "High",
            "tags": ["smoke"]
        })];
        match records_table(&records) {
            Artifact::Table { headers, rows } => {
                assert_eq!(headers, vec!["id", "title", "steps", "expected", "priority", "tags"]);
                assert_eq!(rows[0][2], "Open login page | Submit credentials");
                assert_eq!(rows[0][5], "smoke");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_preview_lists_each_case() {
        let state = TestCaseState {
            test_cases: vec![
                json!({"id": "TC-001", "title": "A", "steps": ["x", "y"], "priority": "High"}),
                json!({"id": "TC-002", "title": "B"}),
            ],
            ..Default::default()
        };
        let text = preview_text(&state);
        assert!(text.contains("[1] TC-001: A"));
        assert!(text.contains("[2] TC-002: B"));
        assert!(text.contains("Expected: N/A"));
        assert!(text.contains("Total: 2 test cases"));
    }

    #[test]
    fn test_step_bound_covers_worst_case_path() {
        // context, generate, validate, one retry+validate pair per retry and
        // per rejection, preview+approval per gate visit, then save
        for (retries, rejections) in [(0usize, 0usize), (3, 3), (60, 0), (10, 25)] {
            let worst = 3 + 2 * (retries + rejections) + 2 * (rejections + 1) + 1;
            assert!(step_bound(retries as u32, rejections as u32) >= worst);
        }
        assert_eq!(step_bound(3, 3), 32);
    }

    #[test]
    fn test_graph_compiles() {
        let graph = build_graph(&RunSettings::default()).unwrap();
        assert_eq!(
            graph.node_ids(),
            vec!["approval", "context", "generate", "preview", "retry", "save", "validate"]
        );
        assert_eq!(graph.entry(), "context");
    }
}
