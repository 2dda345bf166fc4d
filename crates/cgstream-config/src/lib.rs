//! Configuration and graph files for cgstream.
//!
//! # Features
//!
//! - **Engine settings**: scheduler mode and iteration limit, event queue
//!   sizing and default time-to-live, log filter ([`EngineConfig`])
//! - **Graph files**: load and save descriptions as TOML, JSON or binary,
//!   picked from the file extension ([`load_graph`], [`save_graph`])
//! - **Validation**: structural checks and a one-iteration simulation of
//!   the schedule, reporting every problem at once ([`validate_graph`])
//!
//! # Example
//!
//! ```rust,no_run
//! use cgstream_config::{EngineConfig, load_graph, validate_graph};
//! use cgstream_registry::{NodeRegistry, create_graph};
//!
//! let config = EngineConfig::load("engine.toml").unwrap();
//! let desc = load_graph("graphs/chain.toml").unwrap();
//! let registry = NodeRegistry::new();
//! validate_graph(&desc, &registry).unwrap();
//!
//! let mut graph = create_graph(&desc, &registry).unwrap();
//! let report = graph.run(&mut cgstream_core::scheduler::NoHooks, config.scheduler.iterations);
//! println!("{} iterations", report.iterations);
//! ```

mod engine;
mod error;
mod graph_file;

/// Graph and configuration validation.
pub mod validation;

pub use engine::{EngineConfig, EventConfig, LoggingConfig, SchedulerConfig, SchedulerMode};
pub use error::ConfigError;
pub use graph_file::{GraphFormat, load_graph, save_graph};
pub use validation::{ValidationError, ValidationResult, validate_graph};
