//! cgstream CLI - load, check and run static dataflow graphs.

mod commands;
mod nodes;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cgstream")]
#[command(author, version, about = "Static dataflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a graph description and run it
    Run(commands::run::RunArgs),

    /// Validate a graph description and verify its schedule
    Check(commands::check::CheckArgs),

    /// List the node types known to the demo registry
    Nodes(commands::nodes::NodesArgs),

    /// Run the built-in graph while an event pauses and resumes processing
    Demo(commands::demo::DemoArgs),

    /// Encode an event to its hexadecimal wire form
    Pack(commands::pack::PackArgs),

    /// Decode events from their hexadecimal wire form
    Unpack(commands::pack::UnpackArgs),
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Nodes(args) => commands::nodes::run(args),
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Pack(args) => commands::pack::run_pack(args),
        Commands::Unpack(args) => commands::pack::run_unpack(args),
    }
}
