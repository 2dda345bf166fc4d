//! Node registry and runtime graph loader for cgstream.
//!
//! Static graphs are normally compiled together with their schedule. This
//! crate covers the other case: the schedule and the graph structure arrive
//! as data (a [`GraphDescription`]) and node types are resolved at runtime
//! through a [`NodeRegistry`] keyed by UUID.
//!
//! # Features
//!
//! - **Descriptions**: TOML, JSON and a compact binary form of the same data
//! - **Registry**: one factory per node type UUID, built-in `Duplicate`
//! - **Typed edges**: factories request ports with the element type they
//!   expect and get an error on mismatch
//! - **Loader**: [`create_graph`] allocates FIFOs, builds nodes, and returns
//!   a [`RuntimeGraph`] that runs the schedule
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::scheduler::NoHooks;
//! use cgstream_registry::{DUPLICATE_UUID, GraphDescription, NodeRegistry, create_graph};
//!
//! let desc = GraphDescription::from_toml(&format!(
//!     r#"
//!     schedule = [0]
//!     async_mode = true
//!
//!     [[buffers]]
//!     length = 48
//!
//!     [[fifos]]
//!     id = 0
//!     buffer = 0
//!     length = 4
//!     delay = 4
//!
//!     [[fifos]]
//!     id = 1
//!     buffer = 0
//!     length = 4
//!
//!     [[nodes]]
//!     uuid = "{DUPLICATE_UUID}"
//!     name = "dup"
//!     inputs = [{{ fifo = 0, samples = 4 }}]
//!     outputs = [{{ fifo = 1, samples = 4 }}]
//!     "#
//! ))
//! .unwrap();
//!
//! let mut graph = create_graph(&desc, &NodeRegistry::new()).unwrap();
//! let report = graph.run(&mut NoHooks, Some(1));
//! assert_eq!(report.iterations, 1);
//! assert!(graph.node("dup").is_some());
//! ```

mod description;
mod error;
mod graph;
mod registry;
mod sample;

pub use description::{BufferDescription, FifoDescription, GraphDescription, NodeDescription, PortDescription};
pub use error::LoadError;
pub use graph::{RuntimeContext, RuntimeGraph, create_graph};
pub use registry::{DUPLICATE_UUID, NodeDescriptor, NodeFactory, NodeRegistry};
pub use sample::{Sample, SampleType};
