//! Redscout - AI-driven security assessment agent.
//!
//! This is the main entry point for the redscout CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use redscout_core::{Config, ConsoleGate, Orchestrator, ReviewGate, RunOutcome};
use redscout_provider::Role;
use redscout_sandbox::DockerSandbox;
use redscout_tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Parser)]
#[command(name = "redscout")]
#[command(author, version, about = "AI-driven security assessment agent", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "redscout.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a security assessment against a target
    Run {
        /// Target host or URL to assess
        target: String,

        /// Maximum reasoning steps (overrides the configured cap)
        #[arg(long)]
        max_steps: Option<u32>,

        /// Skip the operator review gate
        #[arg(long)]
        no_review: bool,
    },
    /// Show detailed guidance, optionally for a topic
    Help {
        /// Help topic (config, tools)
        topic: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "redscout=debug,redscout_core=debug,redscout_provider=debug,\
         redscout_sandbox=debug,redscout_tools=debug"
    } else {
        "redscout=info,redscout_core=info,redscout_sandbox=info,redscout_tools=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Session ids name the sandbox container, so concurrent runs must
/// never collide.
fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}-{:x}", std::process::id(), nanos)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            target,
            max_steps,
            no_review,
        } => run_assessment(&cli.config, &target, max_steps, no_review).await,
        Commands::Help { topic } => {
            show_help(&cli.config, topic.as_deref());
            Ok(())
        }
    }
}

async fn run_assessment(
    config_path: &PathBuf,
    target: &str,
    max_steps: Option<u32>,
    no_review: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(cap) = max_steps {
        config.agent.max_iterations = cap;
    }
    if no_review {
        config.agent.review = false;
    }
    config.validate()?;

    // Backend resolution happens before any sandbox exists; a bad
    // selection fails here.
    let model = config.build_model()?;

    let session_id = new_session_id();
    info!(session_id, target, "preparing session");

    let sandbox = Arc::new(
        DockerSandbox::new(config.runtime.clone(), &session_id)
            .await
            .context("failed to set up the sandbox runtime")?,
    );

    let gate: Option<Box<dyn ReviewGate>> = if config.agent.review {
        Some(Box::new(ConsoleGate))
    } else {
        None
    };

    let orchestrator = Orchestrator::new(
        &config.agent,
        model,
        sandbox,
        ToolRegistry::with_builtins(),
        gate,
    );

    let report = orchestrator.run(target).await?;

    if let Some(summary) = report
        .conversation
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
    {
        println!("{}", summary.content);
    }

    if report.outcome == RunOutcome::IterationCapReached {
        eprintln!(
            "Run stopped after {} steps without a completion signal.",
            report.iterations
        );
    }
    Ok(())
}

fn show_help(config_path: &PathBuf, topic: Option<&str>) {
    match topic.map(str::to_lowercase).as_deref() {
        None => show_general_help(),
        Some("config") => show_config_help(config_path),
        Some("tools") => show_tools_help(),
        Some(other) => {
            println!("Unknown help topic: {}", other);
            println!("Available topics: config, tools");
        }
    }
}

fn show_general_help() {
    println!(
        "\
Redscout - AI-driven security assessment agent

DESCRIPTION:
    Redscout drives a reasoning backend through a bounded security
    assessment of a target. Every action the agent takes runs inside a
    disposable, least-privilege container that is destroyed when the
    run ends.

USAGE:
    redscout [OPTIONS] COMMAND [ARGS]...

COMMANDS:
    run     Run a security assessment against a target
    help    Show detailed guidance

GETTING STARTED:
    1. Configure a backend (see 'redscout help config')
    2. Make sure Docker is running
    3. Run an assessment: redscout run http://example.com

For more detailed guidance, use:
    redscout help <topic>  where topic is: config, tools"
    );
}

fn show_config_help(config_path: &PathBuf) {
    let config = Config::load_or_default(config_path).unwrap_or_default();
    println!(
        "\
Configuration Guide

CONFIGURATION FILE: {path}

Current configuration:
    Sandbox image:     {image}
    Network:           {network}
    Memory limit:      {memory}
    Container prefix:  {prefix}

    Backend:           {source:?}
    Google model:      {google}
    OpenAI model:      {openai}
    Max iterations:    {cap}
    Operator review:   {review}

ENVIRONMENT VARIABLES:
    GOOGLE_API_KEY - API key for the Google backend
    OPENAI_API_KEY - API key for the OpenAI backend
    Local models need agent.local_model_path in the config file.

SETUP STEPS:
    1. Write a redscout.toml with your preferred backend
    2. Set the matching API key in the environment
    3. Ensure Docker is running
    4. Run your first assessment",
        path = config_path.display(),
        image = config.runtime.image(),
        network = config.runtime.network_name,
        memory = config.runtime.memory_limit,
        prefix = config.runtime.container_prefix,
        source = config.agent.source,
        google = config.agent.google_model,
        openai = config.agent.openai_model,
        cap = config.agent.max_iterations,
        review = config.agent.review,
    );
}

fn show_tools_help() {
    println!("Available capabilities:\n");
    let registry = ToolRegistry::with_builtins();
    let mut tools: Vec<_> = registry.all().collect();
    tools.sort_by(|a, b| a.name().cmp(b.name()));
    for tool in tools {
        println!("  {}\n      {}\n", tool.name(), tool.description());
    }
    println!("Every capability executes inside the sandbox container.");
}
