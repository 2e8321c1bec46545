use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use opsgraph_rs::adk::model::hashing::HashingEmbedder;
use opsgraph_rs::adk::model::Embedder;
use opsgraph_rs::opsgraph::approval::{AutoApproveOperator, Operator, StdinOperator};
use opsgraph_rs::opsgraph::config::AppConfig;
use opsgraph_rs::opsgraph::context::{ExecutionContext, RunSettings};
use opsgraph_rs::opsgraph::input::pick_input;
use opsgraph_rs::opsgraph::knowledge::{build_index, KnowledgeBase, TextSplitter, KNOWLEDGE_NAMESPACE};
use opsgraph_rs::opsgraph::memory::{InMemoryIndex, LocalVectorIndex, SemanticStore, VectorIndex};
use opsgraph_rs::opsgraph::pipelines::{incident, log_analyzer, testcase};
use opsgraph_rs::opsgraph::sink::{ArtifactSink, FsSink};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "LLM workflow orchestration for ops tasks", long_about = None)]
struct Args {
    /// Path to a YAML config file (defaults to ./opsgraph.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the knowledge-base index from markdown documents
    Index,
    /// Analyze a log file with knowledge-base and memory context
    AnalyzeLog {
        /// Log file; defaults to the newest file in <data_dir>/logs
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Generate test cases from a requirement, with human approval
    GenerateTests {
        /// Requirement file; defaults to the newest file in <data_dir>/requirements
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Approve the first result without prompting
        #[arg(long)]
        auto_approve: bool,
    },
    /// Run the incident response specialists over a log file
    Incident {
        /// Log file; defaults to the newest file in <data_dir>/logs
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Index => run_index(&config).await,
        Commands::AnalyzeLog { file } => run_log_analysis(&config, file).await,
        Commands::GenerateTests { file, auto_approve } => {
            run_test_generation(&config, file, auto_approve).await
        }
        Commands::Incident { file } => run_incident(&config, file).await,
    }
}

async fn run_index(config: &AppConfig) -> anyhow::Result<()> {
    let embedder = config.create_embedder()?;
    let index = LocalVectorIndex::create(config.index_dir(), KNOWLEDGE_NAMESPACE, embedder).await?;
    let count = build_index(&config.knowledge_base_dir(), &index, TextSplitter::default()).await?;
    log::info!("Knowledge index written to {}", index.path().display());

    log::info!("Running test search...");
    for (i, hit) in index.search("how to test login API", 2).await?.iter().enumerate() {
        let source = hit.metadata.get("source").and_then(|v| v.as_str()).unwrap_or("Unknown");
        log::info!("[{}] {} (similarity: {:.2})", i + 1, source, 1.0 - hit.distance);
    }
    println!("Indexed {} chunks into {}", count, index.path().display());
    Ok(())
}

async fn open_memory(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
    namespace: &str,
) -> anyhow::Result<SemanticStore> {
    let index = LocalVectorIndex::open(config.index_dir(), namespace, embedder).await?;
    Ok(SemanticStore::new(namespace, Arc::new(index)))
}

async fn open_knowledge(config: &AppConfig, embedder: Arc<dyn Embedder>) -> anyhow::Result<KnowledgeBase> {
    let index = LocalVectorIndex::open_existing(config.index_dir(), KNOWLEDGE_NAMESPACE, embedder)
        .await
        .context("knowledge index unavailable; run the `index` command first")?;
    Ok(KnowledgeBase::new(Arc::new(index)))
}

/// Shared collaborators for one workflow run
async fn session(
    config: &AppConfig,
    namespace: &str,
    with_knowledge: bool,
    operator: Arc<dyn Operator>,
) -> anyhow::Result<ExecutionContext> {
    let model = config.create_model()?;
    let embedder = config.create_embedder()?;
    let sink: Arc<dyn ArtifactSink> = Arc::new(FsSink::new(&config.output_dir));

    let memory = open_memory(config, embedder.clone(), namespace).await?;
    let mut ctx = ExecutionContext::new(model, memory, sink, operator)
        .with_recency_capacity(config.memory.recency_capacity)
        .with_settings(RunSettings::from(config));
    if with_knowledge {
        ctx = ctx.with_knowledge(open_knowledge(config, embedder).await?);
    }
    Ok(ctx)
}

async fn read_input(file: Option<PathBuf>, dir: PathBuf) -> anyhow::Result<String> {
    let path = pick_input(file.as_deref(), &dir)?;
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    log::info!("Read {} ({} chars)", path.display(), content.len());
    Ok(content)
}

fn report_errors(errors: &[String]) {
    if errors.is_empty() {
        log::info!("Workflow completed successfully");
    } else {
        log::error!("Workflow completed with errors: {:?}", errors);
        for error in errors {
            eprintln!("error: {}", error);
        }
    }
}

async fn run_log_analysis(config: &AppConfig, file: Option<PathBuf>) -> anyhow::Result<()> {
    let log_content = read_input(file, config.data_dir.join("logs")).await?;
    let ctx = session(
        config,
        log_analyzer::MEMORY_NAMESPACE,
        true,
        Arc::new(AutoApproveOperator),
    )
    .await?;

    let graph = log_analyzer::build_graph(&ctx.settings)?;
    let state = graph
        .run(log_analyzer::LogAnalysisState::new(log_content), &ctx)
        .await?;

    report_errors(&state.errors);
    for location in &state.saved {
        println!("Saved {}", location);
    }
    if state.errors.is_empty() {
        println!("\n{}", state.executive_summary);
    }
    Ok(())
}

async fn run_test_generation(
    config: &AppConfig,
    file: Option<PathBuf>,
    auto_approve: bool,
) -> anyhow::Result<()> {
    let requirement = read_input(file, config.data_dir.join("requirements")).await?;
    let operator: Arc<dyn Operator> = if auto_approve {
        Arc::new(AutoApproveOperator)
    } else {
        Arc::new(StdinOperator::new())
    };
    let ctx = session(config, testcase::MEMORY_NAMESPACE, true, operator).await?;

    let graph = testcase::build_graph(&ctx.settings)?;
    let state = graph
        .run(testcase::TestCaseState::new(requirement), &ctx)
        .await?;

    report_errors(&state.errors);
    if state.saved.is_empty() {
        println!(
            "No test cases saved (approval: {:?}, retries: {})",
            state.approval, state.retry_count
        );
    }
    for location in &state.saved {
        println!("Saved {}", location);
    }
    Ok(())
}

async fn run_incident(config: &AppConfig, file: Option<PathBuf>) -> anyhow::Result<()> {
    let log_content = read_input(file, config.data_dir.join("logs")).await?;

    let model = config.create_model()?;
    let sink: Arc<dyn ArtifactSink> = Arc::new(FsSink::new(&config.output_dir));
    // specialists never consult memory, so an unpersisted store is enough
    let scratch: Arc<dyn VectorIndex> = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::default())));
    let ctx = ExecutionContext::new(
        model,
        SemanticStore::new("incident_response", scratch),
        sink.clone(),
        Arc::new(AutoApproveOperator),
    )
    .with_settings(RunSettings::from(config));

    let graph = incident::build_graph(&ctx.settings)?;
    let state = graph.run(incident::IncidentState::new(log_content), &ctx).await?;

    report_errors(&state.errors);
    log::info!("Specialists executed: {}", state.steps_completed.join(", "));
    let location = incident::save_report(&state, sink.as_ref()).await?;
    println!("Incident report saved: {}", location);
    println!("\n{}", state.incident_report);
    Ok(())
}
