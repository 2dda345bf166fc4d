//! Graph and configuration validation.
//!
//! [`validate_graph`] looks at a description the way the loader will, but
//! collects every problem instead of stopping at the first one, then
//! simulates one iteration of the schedule against the FIFO capacities.
//!
//! # Example
//!
//! ```rust
//! use cgstream_config::{ValidationError, validate_graph};
//! use cgstream_registry::{GraphDescription, NodeRegistry};
//!
//! let desc = GraphDescription::default();
//! let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
//! assert_eq!(err, ValidationError::EmptySchedule);
//! ```

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use cgstream_core::scheduler::ScheduleError;
use cgstream_registry::{GraphDescription, NodeRegistry, create_graph};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Configuration value out of range.
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// Dotted key of the setting.
        key: String,
        /// What is wrong.
        reason: String,
    },

    /// Nothing to run.
    #[error("schedule is empty")]
    EmptySchedule,

    /// Node type missing from the registry.
    #[error("node {node} has unknown type {uuid}")]
    UnknownNodeType {
        /// Node label.
        node: String,
        /// Unregistered type.
        uuid: Uuid,
    },

    /// Two nodes share a name.
    #[error("node name '{0}' is used twice")]
    DuplicateName(String),

    /// Two FIFOs share an identifier.
    #[error("FIFO {0} is declared twice")]
    DuplicateFifo(u32),

    /// FIFO placed in a buffer that does not exist.
    #[error("FIFO {fifo} references unknown buffer {buffer}")]
    UnknownBuffer {
        /// FIFO identifier.
        fifo: u32,
        /// Offending buffer index.
        buffer: usize,
    },

    /// FIFO larger than its buffer.
    #[error("FIFO {fifo} needs {needed} bytes but its buffer holds {available}")]
    FifoTooLarge {
        /// FIFO identifier.
        fifo: u32,
        /// Bytes the FIFO needs.
        needed: usize,
        /// Bytes the buffer holds.
        available: usize,
    },

    /// FIFO primed with more samples than it holds.
    #[error("FIFO {fifo} has delay {delay} but length {length}")]
    DelayTooLarge {
        /// FIFO identifier.
        fifo: u32,
        /// Initial samples.
        delay: usize,
        /// Capacity in samples.
        length: usize,
    },

    /// Port bound to a FIFO that does not exist.
    #[error("node {node} references unknown FIFO {fifo}")]
    UnknownFifo {
        /// Node label.
        node: String,
        /// Offending FIFO identifier.
        fifo: u32,
    },

    /// Port that moves no samples.
    #[error("node {node} moves no samples on FIFO {fifo}")]
    ZeroRate {
        /// Node label.
        node: String,
        /// FIFO identifier.
        fifo: u32,
    },

    /// Schedule entry out of range.
    #[error("schedule entry {position} names unknown node {node}")]
    UnknownScheduledNode {
        /// Position in the schedule.
        position: usize,
        /// Offending node index.
        node: usize,
    },

    /// A node would read more than its input holds.
    #[error("schedule entry {position}: node {node} underflows FIFO {fifo}")]
    Underflow {
        /// Position in the schedule.
        position: usize,
        /// Node label.
        node: String,
        /// FIFO identifier.
        fifo: u32,
    },

    /// A node would write past the capacity of its output.
    #[error("schedule entry {position}: node {node} overflows FIFO {fifo}")]
    Overflow {
        /// Position in the schedule.
        position: usize,
        /// Node label.
        node: String,
        /// FIFO identifier.
        fifo: u32,
    },

    /// Repeating the schedule would drift.
    #[error("FIFO {fifo} holds {end} samples after one iteration, expected {start}")]
    NotPeriodic {
        /// FIFO identifier.
        fifo: u32,
        /// Occupancy at start.
        start: usize,
        /// Occupancy after one iteration.
        end: usize,
    },

    /// A factory refused the node.
    #[error("graph cannot be instantiated: {0}")]
    Instantiation(String),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Individual errors, flattening [`ValidationError::Multiple`].
    pub fn errors(&self) -> Vec<&ValidationError> {
        match self {
            Self::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate a graph description against a registry.
///
/// Structural problems are reported together. When the structure is sound
/// the schedule is simulated for one iteration and finally the graph is
/// instantiated once, so that factory checks (arity, sample types,
/// parameters) run too.
pub fn validate_graph(desc: &GraphDescription, registry: &NodeRegistry) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if desc.schedule.is_empty() {
        errors.push(ValidationError::EmptySchedule);
    }
    check_fifos(desc, &mut errors);
    check_nodes(desc, registry, &mut errors);

    if errors.is_empty()
        && let Err(e) = check_schedule(desc)
    {
        errors.push(e);
    }

    if errors.is_empty()
        && let Err(e) = create_graph(desc, registry)
    {
        errors.push(ValidationError::Instantiation(e.to_string()));
    }

    tracing::debug!(
        nodes = desc.nodes.len(),
        fifos = desc.fifos.len(),
        errors = errors.len(),
        "graph validated"
    );
    collect(errors)
}

fn check_fifos(desc: &GraphDescription, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for fifo in &desc.fifos {
        if !seen.insert(fifo.id) {
            errors.push(ValidationError::DuplicateFifo(fifo.id));
        }
        if fifo.delay > fifo.length {
            errors.push(ValidationError::DelayTooLarge {
                fifo: fifo.id,
                delay: fifo.delay,
                length: fifo.length,
            });
        }
        match desc.buffers.get(fifo.buffer) {
            None => errors.push(ValidationError::UnknownBuffer {
                fifo: fifo.id,
                buffer: fifo.buffer,
            }),
            Some(buffer) if fifo.byte_size() > buffer.length => errors.push(ValidationError::FifoTooLarge {
                fifo: fifo.id,
                needed: fifo.byte_size(),
                available: buffer.length,
            }),
            Some(_) => {}
        }
    }
}

fn check_nodes(desc: &GraphDescription, registry: &NodeRegistry, errors: &mut Vec<ValidationError>) {
    let mut names = HashSet::new();
    for node in &desc.nodes {
        if registry.get(&node.uuid).is_none() {
            errors.push(ValidationError::UnknownNodeType {
                node: node.label(),
                uuid: node.uuid,
            });
        }
        if let Some(name) = &node.name
            && !names.insert(name.as_str())
        {
            errors.push(ValidationError::DuplicateName(name.clone()));
        }
        for port in node.inputs.iter().chain(node.outputs.iter()) {
            if desc.fifo(port.fifo).is_none() {
                errors.push(ValidationError::UnknownFifo {
                    node: node.label(),
                    fifo: port.fifo,
                });
            } else if port.samples == 0 {
                errors.push(ValidationError::ZeroRate {
                    node: node.label(),
                    fifo: port.fifo,
                });
            }
        }
    }
}

/// Runs the occupancy simulation and maps positions in the result back to
/// FIFO identifiers and node labels.
fn check_schedule(desc: &GraphDescription) -> ValidationResult<()> {
    let fifo_id = |index: usize| desc.fifos.get(index).map_or(u32::MAX, |f| f.id);
    let label = |index: usize| desc.nodes.get(index).map_or_else(|| format!("#{index}"), |n| n.label());

    desc.verify_schedule().map_err(|e| match e {
        ScheduleError::UnknownNode { position, node } => ValidationError::UnknownScheduledNode { position, node },
        ScheduleError::UnknownFifo { node, fifo } => ValidationError::UnknownFifo {
            node: label(node),
            fifo: fifo_id(fifo),
        },
        ScheduleError::Underflow { position, node, fifo } => ValidationError::Underflow {
            position,
            node: label(node),
            fifo: fifo_id(fifo),
        },
        ScheduleError::Overflow { position, node, fifo } => ValidationError::Overflow {
            position,
            node: label(node),
            fifo: fifo_id(fifo),
        },
        ScheduleError::NotPeriodic { fifo, start, end } => ValidationError::NotPeriodic {
            fifo: fifo_id(fifo),
            start,
            end,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgstream_registry::{BufferDescription, DUPLICATE_UUID, FifoDescription, NodeDescription, SampleType};

    fn fifo(id: u32, length: usize, delay: usize) -> FifoDescription {
        FifoDescription {
            id,
            buffer: 0,
            length,
            delay,
            plain: false,
            sample_type: SampleType::F32,
        }
    }

    /// Duplicate node fed by a primed FIFO, copying to one output.
    fn primed_duplicate() -> GraphDescription {
        GraphDescription {
            buffers: vec![BufferDescription { length: 64 }],
            fifos: vec![fifo(10, 4, 4), fifo(11, 4, 0)],
            nodes: vec![NodeDescription::new(DUPLICATE_UUID, 0).named("dup").input(10, 4).output(11, 4)],
            schedule: vec![0],
            async_mode: false,
        }
    }

    /// Two duplicates passing one block around a loop.
    fn ring() -> GraphDescription {
        let mut desc = primed_duplicate();
        desc.nodes.push(NodeDescription::new(DUPLICATE_UUID, 1).input(11, 4).output(10, 4));
        desc.schedule = vec![0, 1];
        desc
    }

    #[test]
    fn test_valid_graph() {
        assert_eq!(validate_graph(&ring(), &NodeRegistry::new()), Ok(()));
    }

    #[test]
    fn test_non_periodic_schedule() {
        // FIFO 10 drains and FIFO 11 fills
        let err = validate_graph(&primed_duplicate(), &NodeRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotPeriodic {
                fifo: 10,
                start: 4,
                end: 0
            }
        );
    }

    #[test]
    fn test_underflow_reports_fifo_id() {
        let mut desc = primed_duplicate();
        desc.fifos[0].delay = 0;
        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Underflow {
                position: 0,
                node: "dup".into(),
                fifo: 10
            }
        );
        assert_eq!(err.to_string(), "schedule entry 0: node dup underflows FIFO 10");
    }

    #[test]
    fn test_structural_errors_are_collected() {
        let mut desc = primed_duplicate();
        desc.schedule.clear();
        desc.fifos.push(fifo(11, 4, 0));
        desc.fifos[0].buffer = 3;
        desc.nodes.push(NodeDescription::new(Uuid::from_u128(1), 1).named("dup").input(99, 0));

        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        let errors = err.errors();
        assert!(errors.contains(&&ValidationError::EmptySchedule));
        assert!(errors.contains(&&ValidationError::DuplicateFifo(11)));
        assert!(errors.contains(&&ValidationError::UnknownBuffer { fifo: 10, buffer: 3 }));
        assert!(errors.contains(&&ValidationError::DuplicateName("dup".into())));
        assert!(errors.contains(&&ValidationError::UnknownFifo {
            node: "dup".into(),
            fifo: 99
        }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownNodeType { .. })));
        assert!(err.to_string().starts_with("multiple validation errors: "));
    }

    #[test]
    fn test_fifo_sizes() {
        let mut desc = primed_duplicate();
        desc.buffers[0].length = 8;
        desc.fifos[1].delay = 5;
        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        let errors = err.errors();
        assert!(errors.contains(&&ValidationError::FifoTooLarge {
            fifo: 10,
            needed: 16,
            available: 8
        }));
        assert!(errors.contains(&&ValidationError::DelayTooLarge {
            fifo: 11,
            delay: 5,
            length: 4
        }));
    }

    #[test]
    fn test_zero_rate() {
        let mut desc = primed_duplicate();
        desc.nodes[0].outputs[0].samples = 0;
        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ZeroRate {
                node: "dup".into(),
                fifo: 11
            }
        );
    }

    #[test]
    fn test_factory_errors_surface() {
        let mut desc = ring();
        desc.fifos[1].sample_type = SampleType::I8;

        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        assert!(matches!(err, ValidationError::Instantiation(ref m) if m.contains("FIFO 11")), "{err}");
    }

    #[test]
    fn test_unknown_scheduled_node() {
        let mut desc = primed_duplicate();
        desc.schedule = vec![0, 3];
        let err = validate_graph(&desc, &NodeRegistry::new()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownScheduledNode { position: 1, node: 3 });
    }
}
