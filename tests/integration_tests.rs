//! Integration tests for the workflow engine and its pipelines
//!
//! These tests run the real graphs end to end against mock collaborators.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use opsgraph_rs::adk::error::{IndexError, ModelError, OpsGraphError, SinkError};
use opsgraph_rs::adk::model::anthropic::AnthropicModel;
use opsgraph_rs::adk::model::hashing::HashingEmbedder;
use opsgraph_rs::adk::model::openai::{OpenAIEmbedder, OpenAIModel};
use opsgraph_rs::adk::model::{Embedder, GenerationConfig, Message, Model};
use opsgraph_rs::opsgraph::approval::Operator;
use opsgraph_rs::opsgraph::context::{ExecutionContext, RunSettings};
use opsgraph_rs::opsgraph::knowledge::{build_index, KnowledgeBase, TextSplitter, KNOWLEDGE_NAMESPACE};
use opsgraph_rs::opsgraph::memory::{
    InMemoryIndex, LocalVectorIndex, Metadata, RecencyBuffer, SearchHit, SemanticStore, VectorIndex,
    NO_PRIOR_CONTEXT,
};
use opsgraph_rs::opsgraph::pipelines::{incident, log_analyzer, testcase};
use opsgraph_rs::opsgraph::sink::{Artifact, ArtifactSink};
use opsgraph_rs::opsgraph::validation::ValidationResult;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Mock Components
// ============================================================================

/// Mock model that replays scripted responses; `None` simulates a provider failure
struct MockModel {
    responses: Vec<Option<String>>,
    response_index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    fn new(responses: Vec<Option<String>>) -> Self {
        Self {
            responses,
            response_index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn always(text: &str) -> Self {
        Self::new(vec![Some(text.to_string()); 256])
    }

    fn calls(&self) -> usize {
        self.response_index.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Model for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        messages: &[Message],
        _config: Option<&GenerationConfig>,
    ) -> Result<String, ModelError> {
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        let idx = self.response_index.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(idx) {
            Some(Some(text)) => Ok(text.clone()),
            Some(None) => Err(ModelError::InvalidResponse("upstream timeout".to_string())),
            None => Err(ModelError::InvalidResponse("Max responses reached".to_string())),
        }
    }
}

/// Sink that records every artifact, or fails every write
#[derive(Default)]
struct RecordingSink {
    writes: Mutex<Vec<(String, Artifact)>>,
    fail: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn written(&self, destination: &str) -> Option<Artifact> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .find(|(d, _)| d == destination)
            .map(|(_, a)| a.clone())
    }

    fn count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactSink for RecordingSink {
    async fn write(&self, destination: &str, artifact: &Artifact) -> Result<String, SinkError> {
        if self.fail {
            return Err(SinkError::Write {
                destination: destination.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((destination.to_string(), artifact.clone()));
        Ok(format!("mem://{destination}"))
    }
}

/// Operator that answers prompts from a script
struct ScriptedOperator {
    answers: Mutex<VecDeque<String>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
            shown: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn show(&self, text: &str) -> Result<(), OpsGraphError> {
        self.shown.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn prompt(&self, _question: &str) -> Result<String, OpsGraphError> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OpsGraphError::operator("script exhausted"))
    }
}

/// Index returning fixed hits regardless of the query
struct FixedIndex(Vec<SearchHit>);

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn add(&self, _: Vec<String>, _: Vec<Metadata>) -> Result<(), IndexError> {
        Ok(())
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        Ok(self.0.iter().take(k).cloned().collect())
    }

    async fn len(&self) -> usize {
        self.0.len()
    }
}

static FIVE_CASES: Lazy<String> = Lazy::new(|| cases(5).to_string());
static TWO_CASES: Lazy<String> = Lazy::new(|| cases(2).to_string());

fn cases(n: usize) -> Value {
    Value::Array(
        (1..=n)
            .map(|i| {
                json!({
                    "id": format!("TC-00{i}"),
                    "title": format!("Login scenario {i}"),
                    "steps": ["Open the login page", "Submit credentials"],
                    "expected": "User lands on the dashboard",
                    "priority": if i % 2 == 0 { "Medium" } else { "High" }
                })
            })
            .collect(),
    )
}

fn memory() -> SemanticStore {
    SemanticStore::new(
        "test_memory",
        Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::default()))),
    )
}

struct Harness {
    model: Arc<MockModel>,
    sink: Arc<RecordingSink>,
    operator: Arc<ScriptedOperator>,
    ctx: ExecutionContext,
}

fn harness(model: MockModel, sink: RecordingSink, answers: &[&str], settings: RunSettings) -> Harness {
    let model = Arc::new(model);
    let sink = Arc::new(sink);
    let operator = Arc::new(ScriptedOperator::new(answers));
    let ctx = ExecutionContext::new(model.clone(), memory(), sink.clone(), operator.clone())
        .with_settings(settings);
    Harness {
        model,
        sink,
        operator,
        ctx,
    }
}

fn count(path: &[String], id: &str) -> usize {
    path.iter().filter(|p| *p == id).count()
}

// ============================================================================
// Test-case pipeline
// ============================================================================

#[tokio::test]
async fn test_always_failing_artifact_gets_four_attempts() {
    let h = harness(MockModel::always(&TWO_CASES), RecordingSink::default(), &["1"], RunSettings::default());
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();

    let exec = graph
        .run_traced(testcase::TestCaseState::new("Users can log in"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(h.model.calls(), 4);
    assert_eq!(exec.state.retry_count, 3);
    assert_eq!(exec.state.validation, ValidationResult::Fail);
    assert_eq!(count(&exec.path, "retry"), 3);
    assert_eq!(count(&exec.path, "preview"), 1);
    // the operator still approves, so the failing set is saved
    assert_eq!(exec.path.last().unwrap(), "save");
}

#[tokio::test]
async fn test_large_retry_budget_still_reaches_gate() {
    let one_case = cases(1).to_string();
    let settings = RunSettings {
        max_retries: 60,
        ..RunSettings::default()
    };
    let h = harness(MockModel::always(&one_case), RecordingSink::default(), &["1"], settings);
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();

    let exec = graph
        .run_traced(testcase::TestCaseState::new("Bulk import"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(h.model.calls(), 61);
    assert_eq!(exec.state.retry_count, 60);
    assert_eq!(count(&exec.path, "preview"), 1);
    assert_eq!(exec.path.last().unwrap(), "save");
    assert!(exec.path.len() > h.ctx.settings.step_limit);
}

#[tokio::test]
async fn test_retry_then_approve_saves_once() {
    let model = MockModel::new(vec![Some(TWO_CASES.clone()), Some(FIVE_CASES.clone())]);
    let h = harness(model, RecordingSink::default(), &["1"], RunSettings::default());
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();

    let exec = graph
        .run_traced(testcase::TestCaseState::new("Users can log in"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(
        exec.path,
        vec!["context", "generate", "validate", "retry", "validate", "preview", "approval", "save"]
    );
    assert_eq!(exec.state.retry_count, 1);
    assert_eq!(exec.state.validation, ValidationResult::Pass);
    assert_eq!(count(&exec.path, "save"), 1);

    match h.sink.written("testcase_generated/raw_output.json") {
        Some(Artifact::Json(Value::Array(saved))) => assert_eq!(saved.len(), 5),
        other => panic!("unexpected raw output: {other:?}"),
    }
    match h.sink.written("testcase_generated/test_cases.csv") {
        Some(Artifact::Table { rows, .. }) => {
            assert_eq!(rows.len(), 5);
            assert_eq!(rows[0][2], "Open the login page | Submit credentials");
        }
        other => panic!("unexpected csv output: {other:?}"),
    }
    assert_eq!(h.sink.count(), 2);

    let records = h.ctx.memory.retrieve("test cases for login", 5).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metadata["agent"], "testcase_generator");
    assert_eq!(records[0].metadata["count"], 5);
    assert_eq!(records[0].metadata["priorities"], "High, Medium");

    let recency = h.ctx.recency.lock().await;
    assert_eq!(recency.len(), 2);
    assert!(recency.window(1).starts_with("agent: Generated 2 test cases"));
}

#[tokio::test]
async fn test_reject_at_retry_two_goes_to_gate_after_third_retry() {
    let model = MockModel::new(vec![
        Some(TWO_CASES.clone()),
        Some(TWO_CASES.clone()),
        Some(FIVE_CASES.clone()),
        Some(TWO_CASES.clone()),
    ]);
    let h = harness(
        model,
        RecordingSink::default(),
        &["2", "missing edge cases", "1"],
        RunSettings::default(),
    );
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();

    let exec = graph
        .run_traced(testcase::TestCaseState::new("Password reset"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(
        exec.path,
        vec![
            "context", "generate", "validate", "retry", "validate", "retry", "validate",
            "preview", "approval", "retry", "validate", "preview", "approval", "save"
        ]
    );
    assert_eq!(h.model.calls(), 4);
    assert_eq!(exec.state.retry_count, 3);
    assert_eq!(exec.state.rejections, 1);
    assert!(h.model.last_prompt().contains("missing edge cases"));
}

#[tokio::test]
async fn test_view_then_approve_does_not_change_state() {
    let h = harness(
        MockModel::always(&FIVE_CASES),
        RecordingSink::default(),
        &["view", "approve"],
        RunSettings::default(),
    );
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();
    let state = graph
        .run(testcase::TestCaseState::new("Search"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(state.retry_count, 0);
    assert_eq!(state.saved.len(), 2);
    let shown = h.operator.shown.lock().unwrap();
    assert!(shown.iter().any(|s| s.starts_with("FULL TEST CASE DETAILS")));
}

#[tokio::test]
async fn test_rejection_limit_abandons_without_saving() {
    let settings = RunSettings {
        max_rejections: 1,
        ..RunSettings::default()
    };
    let h = harness(
        MockModel::always(&FIVE_CASES),
        RecordingSink::default(),
        &["2", "", "2", "still wrong"],
        settings,
    );
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();
    let exec = graph
        .run_traced(testcase::TestCaseState::new("Checkout"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(exec.path.last().unwrap(), "approval");
    assert_eq!(exec.state.rejections, 2);
    assert_eq!(h.sink.count(), 0);
    assert_eq!(h.ctx.memory.retrieve("Checkout", 3).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_save_failure_is_recorded_and_skips_memory() {
    let h = harness(
        MockModel::always(&FIVE_CASES),
        RecordingSink::failing(),
        &["1"],
        RunSettings::default(),
    );
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();
    let state = graph
        .run(testcase::TestCaseState::new("Profile page"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("Save error"));
    assert!(state.saved.is_empty());
    assert_eq!(h.ctx.memory.retrieve("Profile page", 3).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_generation_prompt_uses_placeholders_without_context() {
    let h = harness(MockModel::always(&FIVE_CASES), RecordingSink::default(), &["1"], RunSettings::default());
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();
    graph
        .run(testcase::TestCaseState::new("Logout clears the session"), &h.ctx)
        .await
        .unwrap();

    let prompt = h.model.prompts.lock().unwrap()[0].clone();
    assert_eq!(prompt.matches(NO_PRIOR_CONTEXT).count(), 3);
    assert!(prompt.ends_with("Logout clears the session"));
}

#[tokio::test]
async fn test_model_failure_becomes_error_entry() {
    let model = MockModel::new(vec![None, Some(FIVE_CASES.clone())]);
    let h = harness(model, RecordingSink::default(), &["1"], RunSettings::default());
    let graph = testcase::build_graph(&h.ctx.settings).unwrap();
    let state = graph
        .run(testcase::TestCaseState::new("Upload avatar"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(state.retry_count, 1);
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("LLM error"));
    assert_eq!(state.saved.len(), 2);
}

// ============================================================================
// Log analyzer pipeline
// ============================================================================

const ANALYSIS: &str = "Summary\nConnection pool exhausted at 09:17.\n\n```json\n{\"summary\": \"DB pool exhausted\", \"error_count\": 3, \"root_causes\": [\"pool too small\"], \"recommendations\": [\"raise pool size\"], \"severity\": \"high\"}\n```\n\n---EXECUTIVE---\nCheckout was unavailable for ten minutes.";

#[tokio::test]
async fn test_log_analysis_saves_three_artifacts_and_memory() {
    let h = harness(MockModel::always(ANALYSIS), RecordingSink::default(), &[], RunSettings::default());
    let graph = log_analyzer::build_graph(&h.ctx.settings).unwrap();
    let state = graph
        .run(log_analyzer::LogAnalysisState::new("09:17 ERROR pool exhausted"), &h.ctx)
        .await
        .unwrap();

    assert!(state.errors.is_empty());
    assert_eq!(state.executive_summary, "Checkout was unavailable for ten minutes.");
    assert_eq!(h.sink.count(), 3);
    assert_eq!(
        h.sink.written("log_analyzer/analysis_report.txt"),
        Some(Artifact::Text("Summary\nConnection pool exhausted at 09:17.".to_string()))
    );

    let records = h.ctx.memory.retrieve("pool exhausted", 1).await.unwrap();
    assert_eq!(records[0].metadata["severity"], "high");
    assert_eq!(records[0].metadata["error_count"], 3);
    assert!(records[0].content.starts_with("Analyzed log with 3 errors (severity: high)"));
}

#[tokio::test]
async fn test_log_analysis_skips_save_on_model_error() {
    let h = harness(MockModel::new(vec![None]), RecordingSink::default(), &[], RunSettings::default());
    let graph = log_analyzer::build_graph(&h.ctx.settings).unwrap();
    let state = graph
        .run(log_analyzer::LogAnalysisState::new("ERROR"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(state.errors.len(), 1);
    assert_eq!(h.sink.count(), 0);
    assert_eq!(h.ctx.memory.retrieve("ERROR", 1).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_log_analysis_with_knowledge_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("db_pool.md"),
        "# Connection pool exhausted\n\nRaise max connections and look for leaked handles.",
    )
    .unwrap();
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::default())));
    build_index(dir.path(), index.as_ref(), TextSplitter::default())
        .await
        .unwrap();

    let mut h = harness(MockModel::always(ANALYSIS), RecordingSink::default(), &[], RunSettings::default());
    h.ctx = h.ctx.with_knowledge(KnowledgeBase::new(index));
    let graph = log_analyzer::build_graph(&h.ctx.settings).unwrap();
    graph
        .run(log_analyzer::LogAnalysisState::new("ERROR connection pool exhausted"), &h.ctx)
        .await
        .unwrap();

    assert!(h.model.last_prompt().contains("[Source: db_pool.md]"));
}

// ============================================================================
// Incident response
// ============================================================================

#[tokio::test]
async fn test_supervisor_runs_each_specialist_once_despite_failure() {
    let model = MockModel::new(vec![
        Some("3 critical errors in payments".to_string()),
        None,
        Some("Restart the payments pool".to_string()),
    ]);
    let h = harness(model, RecordingSink::default(), &[], RunSettings::default());
    let graph = incident::build_graph(&h.ctx.settings).unwrap();

    let exec = graph
        .run_traced(incident::IncidentState::new("ERROR payments timeout"), &h.ctx)
        .await
        .unwrap();

    assert_eq!(
        exec.path,
        vec![
            "router", "log_analyzer", "router", "root_cause_investigator", "router",
            "solution_recommender", "router", "compile_report"
        ]
    );
    let state = exec.state;
    assert_eq!(
        state.steps_completed,
        vec!["log_analyzer", "root_cause_investigator", "solution_recommender"]
    );
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("Root Cause Investigator: "));
    assert!(state.root_cause.as_deref().unwrap().starts_with("Error: "));
    assert!(state.incident_report.contains("Restart the payments pool"));
    assert!(state.incident_report.contains("== ERRORS =="));

    let location = incident::save_report(&state, h.sink.as_ref()).await.unwrap();
    assert_eq!(location, "mem://incident_response/incident_report.txt");
}

// ============================================================================
// Memory
// ============================================================================

#[tokio::test]
async fn test_similarity_is_one_minus_distance() {
    let hit = |content: &str, distance: f32| SearchHit {
        content: content.to_string(),
        metadata: Metadata::new(),
        distance,
    };
    let store = SemanticStore::new(
        "ranked",
        Arc::new(FixedIndex(vec![hit("close", 0.1), hit("far", 0.9)])),
    );

    let records = store.retrieve("anything", 2).await.unwrap();
    assert_eq!(records[0].content, "close");
    assert!((records[0].similarity - 0.9).abs() < 1e-6);
    assert!((records[1].similarity - 0.1).abs() < 1e-6);
    assert!(records[0].similarity > records[1].similarity);
}

#[test]
fn test_recency_buffer_keeps_last_capacity_messages() {
    let capacity = 4;
    let mut buffer = RecencyBuffer::new(capacity);
    for i in 0..capacity + 3 {
        buffer.append("user", format!("message {i}"));
        assert!(buffer.len() <= capacity);
    }
    let kept: Vec<String> = buffer.messages().map(|m| m.content.clone()).collect();
    assert_eq!(kept, vec!["message 3", "message 4", "message 5", "message 6"]);
}

#[tokio::test]
async fn test_missing_knowledge_index_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err: OpsGraphError = LocalVectorIndex::open_existing(
        dir.path(),
        KNOWLEDGE_NAMESPACE,
        Arc::new(HashingEmbedder::default()),
    )
    .await
    .err()
    .unwrap()
    .into();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_memory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
    {
        let index = LocalVectorIndex::open(dir.path(), "log_analyzer_memory", embedder.clone())
            .await
            .unwrap();
        SemanticStore::new("log_analyzer_memory", Arc::new(index))
            .store("Analyzed log with 2 errors (severity: low)", Metadata::new())
            .await
            .unwrap();
    }
    let index = LocalVectorIndex::open(dir.path(), "log_analyzer_memory", embedder)
        .await
        .unwrap();
    let ctx = SemanticStore::new("log_analyzer_memory", Arc::new(index))
        .context("errors severity", 2)
        .await
        .unwrap();
    assert!(ctx.starts_with("[Past Interaction 1 - "));
}

// ============================================================================
// HTTP model clients
// ============================================================================

#[tokio::test]
async fn test_openai_chat_completion() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "[]"}}]
        })))
        .mount(&mock_server)
        .await;

    let model = OpenAIModel::with_endpoint(
        "test-key".to_string(),
        mock_server.uri(),
        "gpt-4o-mini".to_string(),
    )
    .unwrap();
    let text = model.generate(&[Message::user("hi")], None).await.unwrap();
    assert_eq!(text, "[]");
}

#[tokio::test]
async fn test_openai_rate_limit() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&mock_server)
        .await;

    let model = OpenAIModel::with_endpoint("k".to_string(), mock_server.uri(), "gpt-4o".to_string())
        .unwrap();
    let err = model.generate(&[Message::user("hi")], None).await.unwrap_err();
    assert!(matches!(err, ModelError::RateLimited { retry_after_secs: Some(7) }));
}

#[tokio::test]
async fn test_openai_embeddings_are_reordered() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .mount(&mock_server)
        .await;

    let embedder = OpenAIEmbedder::with_endpoint(
        "k".to_string(),
        mock_server.uri(),
        "text-embedding-3-small".to_string(),
    )
    .unwrap();
    let vectors = embedder
        .embed(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_anthropic_messages() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "root cause: disk full"}]
        })))
        .mount(&mock_server)
        .await;

    let model = AnthropicModel::with_endpoint(
        "test-key".to_string(),
        mock_server.uri(),
        "claude-3-5-sonnet-latest".to_string(),
    )
    .unwrap();
    let text = model
        .generate(&[Message::system("be brief"), Message::user("why?")], None)
        .await
        .unwrap();
    assert_eq!(text, "root cause: disk full");
}
