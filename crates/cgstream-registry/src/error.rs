//! Error types for graph loading.

use thiserror::Error;
use uuid::Uuid;

use cgstream_core::scheduler::ScheduleError;

use crate::sample::SampleType;

/// Errors that can occur while decoding or instantiating a graph.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No factory registered for a node type
    #[error("unknown node type {0}")]
    UnknownNode(Uuid),

    /// A factory is already registered for this node type
    #[error("node type {0} is already registered")]
    DuplicateUuid(Uuid),

    /// A port or lookup names a FIFO that does not exist
    #[error("unknown FIFO {0}")]
    UnknownFifo(u32),

    /// Two FIFOs share an identifier
    #[error("FIFO {0} is declared twice")]
    DuplicateFifo(u32),

    /// A FIFO names a buffer that does not exist
    #[error("FIFO {fifo} references unknown buffer {buffer}")]
    UnknownBuffer {
        /// FIFO identifier.
        fifo: u32,
        /// Offending buffer index.
        buffer: usize,
    },

    /// A FIFO does not fit in its buffer
    #[error("FIFO {fifo} needs {needed} bytes but buffer {buffer} holds {available}")]
    FifoTooLarge {
        /// FIFO identifier.
        fifo: u32,
        /// Buffer index.
        buffer: usize,
        /// Bytes the FIFO needs.
        needed: usize,
        /// Bytes the buffer holds.
        available: usize,
    },

    /// A node port expects another element type than its FIFO carries
    #[error("FIFO {fifo} carries {found} samples but the node expects {expected}")]
    EdgeType {
        /// FIFO identifier.
        fifo: u32,
        /// Type requested by the node.
        expected: SampleType,
        /// Type declared by the FIFO.
        found: SampleType,
    },

    /// A factory asked for a port the node does not declare
    #[error("node {node} has no {direction} port {port}")]
    MissingPort {
        /// Node label.
        node: String,
        /// `"input"` or `"output"`.
        direction: &'static str,
        /// Port index.
        port: usize,
    },

    /// A schedule entry names a node that does not exist
    #[error("schedule entry {position} names unknown node {node}")]
    InvalidSchedule {
        /// Position in the schedule.
        position: usize,
        /// Offending node index.
        node: u16,
    },

    /// A synchronous schedule does not fit the FIFO sizes
    #[error("schedule cannot run synchronously: {0}")]
    Unbalanced(#[source] ScheduleError),

    /// A factory rejected its description
    #[error("invalid node {node}: {reason}")]
    InvalidNode {
        /// Node label.
        node: String,
        /// What is wrong.
        reason: String,
    },

    /// TOML decoding failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML encoding failed
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON decoding or encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary decoding or encoding failed
    #[error("binary graph error: {0}")]
    Binary(#[from] bincode::Error),
}

impl LoadError {
    /// Create an invalid node error.
    pub fn invalid_node(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.into(),
            reason: reason.into(),
        }
    }
}
