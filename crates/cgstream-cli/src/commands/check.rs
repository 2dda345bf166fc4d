//! Validate a graph description.

use clap::Args;
use std::path::PathBuf;

use cgstream_config::validate_graph;

use super::common::load_description;
use crate::nodes::demo_registry;

#[derive(Args)]
pub struct CheckArgs {
    /// Graph description (.toml, .json or .bin)
    graph: PathBuf,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let desc = load_description(&args.graph)?;
    let registry = demo_registry()?;

    println!("Graph: {}", args.graph.display());
    println!("  buffers:  {} ({} bytes)", desc.buffers.len(), desc.memory());
    println!("  fifos:    {}", desc.fifos.len());
    println!("  nodes:    {}", desc.nodes.len());
    println!("  schedule: {} entries", desc.schedule.len());
    println!();

    match validate_graph(&desc, &registry) {
        Ok(()) => {
            println!("OK: schedule verified for one iteration");
            Ok(())
        }
        Err(err) => {
            let errors = err.errors();
            for e in &errors {
                println!("  error: {e}");
            }
            anyhow::bail!("{} problem(s) found in {}", errors.len(), args.graph.display())
        }
    }
}
