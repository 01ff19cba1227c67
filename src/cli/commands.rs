//! CLI command definitions for genobench.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::agent::mock::ScriptedTurn;
use crate::agent::ScriptedAgent;
use crate::config::BenchConfig;
use crate::events::TracingSink;
use crate::extract::ExtractorConfig;
use crate::report::ReportWriter;
use crate::runner::suite::BenchmarkRunner;
use crate::suite::catalog;
use crate::suite::registry::{RunFilter, SuiteRegistry};

/// Default output directory for reports.
const DEFAULT_OUTPUT_DIR: &str = "./reports";

/// Tool-calling benchmark harness for the genome workbench assistant.
#[derive(Parser)]
#[command(name = "genobench")]
#[command(about = "Benchmark an assistant's tool-calling against genome workbench suites")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List registered suites and their tests.
    List(ListArgs),

    /// Run benchmark suites and write reports.
    Run(RunArgs),
}

/// Arguments for `genobench list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Configuration file (YAML).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra suite definition files (YAML) to register alongside the
    /// built-in catalog.
    #[arg(long = "suite-file")]
    pub suite_files: Vec<PathBuf>,
}

/// Arguments for `genobench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file (YAML).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overrides the configured data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Restrict the run to these suite ids. Repeatable.
    #[arg(short, long = "suite")]
    pub suites: Vec<String>,

    /// Restrict the run to these test ids. Repeatable.
    #[arg(short, long = "test")]
    pub tests: Vec<String>,

    /// Extra suite definition files (YAML) to register alongside the
    /// built-in catalog.
    #[arg(long = "suite-file")]
    pub suite_files: Vec<PathBuf>,

    /// Replay script (YAML list of agent responses) standing in for a live
    /// agent transport.
    #[arg(long)]
    pub script: PathBuf,

    /// Directory reports are written to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

/// Parses CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Executes the parsed command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::List(args) => list(args),
        Commands::Run(args) => run(args).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BenchConfig> {
    Ok(match path {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::default(),
    })
}

fn build_registry(
    config: &BenchConfig,
    suite_files: &[PathBuf],
) -> anyhow::Result<SuiteRegistry> {
    let mut registry = catalog::builtin_registry(config)?;
    for path in suite_files {
        registry.register_yaml_file(path)?;
    }
    Ok(registry)
}

fn list(args: ListArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;
    let registry = build_registry(&config, &args.suite_files)?;

    for suite in registry.suites() {
        println!("{} - {} ({} tests)", suite.id, suite.name, suite.len());
        for test in suite.tests() {
            println!(
                "  {:<12} [{}] {}",
                test.id,
                test.category,
                test.instruction
            );
        }
    }
    println!("{} suites, {} tests", registry.suites().len(), registry.test_count());
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    let registry = build_registry(&config, &args.suite_files)?;
    let agent = Arc::new(load_script(&args.script)?);

    let filter = RunFilter {
        suite_ids: (!args.suites.is_empty()).then(|| args.suites.iter().cloned().collect()),
        test_ids: (!args.tests.is_empty()).then(|| args.tests.iter().cloned().collect()),
    };

    let runner = BenchmarkRunner::new(
        registry,
        agent,
        Arc::new(config),
        &ExtractorConfig::for_tools(catalog::known_tools()),
    )?
    .with_events(Arc::new(TracingSink));

    let result = runner.run(&filter).await?;
    let written = ReportWriter::new(&args.output_dir).write_all(&result)?;
    for path in &written {
        info!(path = %path.display(), "Report written");
    }
    println!(
        "Run {}: {}/{} passed ({:.1}%)",
        result.run_id,
        result.overall.summary.passed,
        result.overall.summary.total,
        result.overall.summary.pass_rate(),
    );
    Ok(())
}

/// Loads a replay script: a YAML list of response strings, one per test in
/// execution order.
fn load_script(path: &PathBuf) -> anyhow::Result<ScriptedAgent> {
    let contents = std::fs::read_to_string(path)?;
    let responses: Vec<String> = serde_yaml::from_str(&contents)?;
    Ok(ScriptedAgent::new(
        responses.into_iter().map(ScriptedTurn::text).collect(),
    ))
}
