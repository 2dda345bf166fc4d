//! List node types.

use clap::Args;

use crate::nodes::demo_registry;

#[derive(Args)]
pub struct NodesArgs {
    /// Print only the UUIDs, one per line
    #[arg(long)]
    uuids: bool,
}

pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    let registry = demo_registry()?;

    if args.uuids {
        for descriptor in registry.all() {
            println!("{}", descriptor.uuid);
        }
        return Ok(());
    }

    println!("Node Types");
    println!("==========");
    println!();
    for descriptor in registry.all() {
        println!("  {:12} {}  {}", descriptor.name, descriptor.uuid, descriptor.description);
    }
    println!();
    println!("{} node types", registry.len());
    Ok(())
}
