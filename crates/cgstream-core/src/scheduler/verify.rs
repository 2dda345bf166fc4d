//! Offline check that a schedule respects FIFO capacities.
//!
//! Simulates one iteration on occupancy counters only. Each scheduled node
//! must find enough data on all of its inputs and enough room on all of its
//! outputs before it runs, exactly the condition an asynchronous
//! `prepare_for_running` would test. After the iteration every FIFO must be
//! back at its initial occupancy, otherwise repeating the schedule drifts.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Per-run traffic of one node: `(fifo index, samples)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRates {
    /// FIFOs read and samples consumed per run.
    pub inputs: Vec<(usize, usize)>,
    /// FIFOs written and samples produced per run.
    pub outputs: Vec<(usize, usize)>,
}

impl NodeRates {
    /// Creates rates from input and output lists.
    pub fn new(inputs: Vec<(usize, usize)>, outputs: Vec<(usize, usize)>) -> Self {
        Self { inputs, outputs }
    }
}

/// Size and priming of one FIFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FifoSpec {
    /// Capacity in samples.
    pub capacity: usize,
    /// Samples buffered at start.
    pub delay: usize,
}

/// First violation found while simulating a schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// A schedule entry names a node that does not exist.
    UnknownNode {
        /// Position in the schedule.
        position: usize,
        /// Offending node index.
        node: usize,
    },
    /// A node references a FIFO that does not exist.
    UnknownFifo {
        /// Node index.
        node: usize,
        /// Offending FIFO index.
        fifo: usize,
    },
    /// A node would read more than is buffered.
    Underflow {
        /// Position in the schedule.
        position: usize,
        /// Node index.
        node: usize,
        /// FIFO index.
        fifo: usize,
    },
    /// A node would write past capacity.
    Overflow {
        /// Position in the schedule.
        position: usize,
        /// Node index.
        node: usize,
        /// FIFO index.
        fifo: usize,
    },
    /// A FIFO ends the iteration with a different occupancy than it started.
    NotPeriodic {
        /// FIFO index.
        fifo: usize,
        /// Occupancy at start.
        start: usize,
        /// Occupancy at end.
        end: usize,
    },
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownNode { position, node } => {
                write!(f, "schedule[{position}] references unknown node {node}")
            }
            Self::UnknownFifo { node, fifo } => write!(f, "node {node} references unknown fifo {fifo}"),
            Self::Underflow {
                position,
                node,
                fifo,
            } => write!(f, "schedule[{position}]: node {node} underflows fifo {fifo}"),
            Self::Overflow {
                position,
                node,
                fifo,
            } => write!(f, "schedule[{position}]: node {node} overflows fifo {fifo}"),
            Self::NotPeriodic { fifo, start, end } => {
                write!(f, "fifo {fifo} holds {end} samples after one iteration, expected {start}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScheduleError {}

/// Simulates one iteration of `order` and reports the first violation.
pub fn verify_schedule(order: &[u16], nodes: &[NodeRates], fifos: &[FifoSpec]) -> Result<(), ScheduleError> {
    for (node, rates) in nodes.iter().enumerate() {
        for &(fifo, _) in rates.inputs.iter().chain(rates.outputs.iter()) {
            if fifo >= fifos.len() {
                return Err(ScheduleError::UnknownFifo { node, fifo });
            }
        }
    }

    let mut occupancy: Vec<usize> = fifos.iter().map(|f| f.delay.min(f.capacity)).collect();

    for (position, &node) in order.iter().enumerate() {
        let node = usize::from(node);
        let rates = nodes.get(node).ok_or(ScheduleError::UnknownNode { position, node })?;

        for &(fifo, samples) in &rates.inputs {
            if occupancy[fifo] < samples {
                return Err(ScheduleError::Underflow {
                    position,
                    node,
                    fifo,
                });
            }
        }
        for &(fifo, samples) in &rates.outputs {
            if occupancy[fifo] + samples > fifos[fifo].capacity {
                return Err(ScheduleError::Overflow {
                    position,
                    node,
                    fifo,
                });
            }
        }

        for &(fifo, samples) in &rates.inputs {
            occupancy[fifo] -= samples;
        }
        for &(fifo, samples) in &rates.outputs {
            occupancy[fifo] += samples;
        }
    }

    for (fifo, (spec, &end)) in fifos.iter().zip(occupancy.iter()).enumerate() {
        let start = spec.delay.min(spec.capacity);
        if start != end {
            return Err(ScheduleError::NotPeriodic { fifo, start, end });
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(steps = order.len(), fifos = fifos.len(), "schedule verified");
    Ok(())
}
