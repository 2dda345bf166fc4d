//! Run a graph description with the demo node types.

use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};

use cgstream_config::validate_graph;
use cgstream_core::scheduler::{ScheduleMode, TracingHooks};
use cgstream_registry::create_graph;

use super::common::{describe_status, load_config, load_description, mode_name};
use crate::nodes::demo_registry;

/// Iterations when neither the command line nor the configuration sets a limit.
const DEFAULT_ITERATIONS: u32 = 10;

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Sync,
    Async,
}

impl From<ModeArg> for ScheduleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sync => ScheduleMode::Sync,
            ModeArg::Async => ScheduleMode::Async,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Graph description (.toml, .json or .bin)
    graph: PathBuf,

    /// Number of iterations [default: from the configuration, else 10]
    #[arg(short = 'n', long)]
    iterations: Option<u32>,

    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scheduling mode, overriding the description and the configuration
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Skip validation before instantiating the graph
    #[arg(long)]
    no_check: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let desc = load_description(&args.graph)?;
    let registry = demo_registry()?;

    if !args.no_check {
        validate_graph(&desc, &registry).map_err(|e| anyhow::anyhow!("{}: {}", args.graph.display(), e))?;
    }

    let mut graph = create_graph(&desc, &registry)?;
    let mode = args.mode.map_or_else(|| config.schedule_mode(&desc), ScheduleMode::from);
    graph.set_mode(mode)?;

    let iterations = args
        .iterations
        .or(config.scheduler.iterations)
        .unwrap_or(DEFAULT_ITERATIONS);

    print_header(&args.graph, &desc);
    println!("Mode:       {}", mode_name(mode));

    let report = graph.run(&mut TracingHooks, Some(iterations));
    tracing::info!(iterations = report.iterations, code = report.error_code(), "graph run finished");

    println!("Iterations: {}", report.iterations);
    println!("Status:     {}", describe_status(&report));

    if !report.is_clean() {
        anyhow::bail!("graph failed with status {}", report.error_code());
    }
    Ok(())
}

fn print_header(path: &Path, desc: &cgstream_registry::GraphDescription) {
    println!("Graph:      {}", path.display());
    println!(
        "Size:       {} nodes, {} FIFOs, {} bytes",
        desc.nodes.len(),
        desc.fifos.len(),
        desc.memory()
    );
}
