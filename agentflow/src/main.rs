use agentflow::logger::Logger;
use agentflow::runtime::{EventNormalizer, NodeEvent, StaticProvider};
use agentflow::yaml::{DocumentRunner, WorkflowLoader};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run and validate AgentFlow workflow documents
#[derive(Parser, Debug)]
#[command(name = "agentflow", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a workflow and print every node output as JSON
    Run(RunArgs),
    /// Check a workflow document without running it
    Validate {
        /// Workflow document (.json, .yaml or .yml)
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Workflow document (.json, .yaml or .yml)
    file: PathBuf,

    /// Start from this node, overriding the document's start node
    #[arg(long)]
    start: Option<String>,

    /// Answer LLM nodes locally instead of calling a hosted provider
    #[arg(long)]
    offline: bool,

    /// Fixed offline reply; the prompt is echoed when omitted
    #[arg(long, requires = "offline")]
    reply: Option<String>,

    /// Delay before each node, in milliseconds
    #[arg(long, value_name = "MS")]
    pacing_ms: Option<u64>,

    /// Per-node time limit in milliseconds; 0 disables it
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Stream node events to stderr as JSON lines
    #[arg(long)]
    events: bool,
}

fn load(file: &Path) -> Result<agentflow::yaml::WorkflowDocument> {
    let document = WorkflowLoader::from_file(file)?;
    let report = WorkflowLoader::validate(&document)
        .with_context(|| format!("Invalid workflow: {}", file.display()))?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(document)
}

async fn run(args: RunArgs) -> Result<()> {
    let mut document = load(&args.file)?;
    let engine = &mut document.options.engine;
    if let Some(ms) = args.pacing_ms {
        engine.pacing_delay_ms = Some(ms);
    }
    if let Some(ms) = args.timeout_ms {
        engine.node_timeout_ms = Some(ms);
    }

    let mut runner = if args.offline {
        let provider = match args.reply {
            Some(reply) => StaticProvider::reply(reply),
            None => StaticProvider::echo(),
        };
        DocumentRunner::with_provider(document, Some(Arc::new(provider)))
    } else {
        DocumentRunner::new(document)?
    };
    if let Some(start) = args.start {
        runner = runner.with_start_node(start);
    }

    let normalizer = EventNormalizer::default();
    let print_event = |event: NodeEvent| match serde_json::to_string(&normalizer.normalize(event)) {
        Ok(line) => eprintln!("{line}"),
        Err(err) => tracing::warn!(error = %err, "failed to encode event"),
    };
    let report = if args.events {
        runner.run(Some(&print_event)).await
    } else {
        runner.run(None).await
    };

    let outputs: BTreeMap<_, _> = report.outputs.iter().collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&outputs).with_context(|| "Failed to encode outputs")?
    );

    Logger::log_run_summary(&report.context);
    if !report.stalled.is_empty() {
        eprintln!("stalled nodes: {}", report.stalled.join(", "));
    }
    if report.cancelled {
        bail!("Run cancelled");
    }
    if !report.is_success() {
        Logger::log_node_details(&report.context);
        bail!("Run finished with {} error(s)", report.context.errors.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    Logger::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate { file } => {
            let document = load(&file)?;
            println!(
                "{}: {} nodes, {} connections",
                document.display_name(),
                document.nodes.len(),
                document.connections.len()
            );
            Ok(())
        }
    }
}
