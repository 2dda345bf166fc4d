//! Serializable description of a scheduled graph.
//!
//! A description lists the memory buffers, the FIFOs carved out of them,
//! the node instances with their ports, and the precomputed schedule. It is
//! normally produced offline by the scheduling tool and loaded at runtime
//! with [`create_graph`](crate::create_graph).
//!
//! # TOML format
//!
//! ```toml
//! schedule = [0, 1, 2]
//! async_mode = false
//!
//! [[buffers]]
//! length = 40
//!
//! [[fifos]]
//! id = 0
//! buffer = 0
//! length = 5
//! sample_type = "f32"
//!
//! [[nodes]]
//! uuid = "c0089f59-2f33-4ec4-9023-30f69f0f4833"
//! id = 0
//! name = "source"
//! outputs = [{ fifo = 0, samples = 5 }]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cgstream_core::CG_UNIDENTIFIED_NODE;
use cgstream_core::scheduler::{FifoSpec, NodeRates, ScheduleError, verify_schedule};

use crate::error::LoadError;
use crate::sample::SampleType;

/// Raw memory region FIFOs are allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDescription {
    /// Size in bytes.
    pub length: usize,
}

/// One edge of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoDescription {
    /// Identifier referenced by node ports.
    pub id: u32,
    /// Index of the backing buffer.
    pub buffer: usize,
    /// Capacity in samples.
    pub length: usize,
    /// Samples already buffered at start.
    #[serde(default)]
    pub delay: usize,
    /// Plain buffer without cursors.
    #[serde(default)]
    pub plain: bool,
    /// Element type.
    #[serde(default)]
    pub sample_type: SampleType,
}

impl FifoDescription {
    /// Bytes the FIFO occupies in its buffer.
    pub fn byte_size(&self) -> usize {
        self.length.saturating_mul(self.sample_type.size())
    }
}

/// Port of a node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescription {
    /// FIFO identifier.
    pub fifo: u32,
    /// Samples moved per run.
    pub samples: usize,
}

fn unidentified() -> i32 {
    CG_UNIDENTIFIED_NODE
}

/// One node instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Node type, resolved through the registry.
    pub uuid: Uuid,
    /// Identifier for the external world.
    #[serde(default = "unidentified")]
    pub id: i32,
    /// Name used to look the node up after loading.
    #[serde(default)]
    pub name: Option<String>,
    /// Input ports in declaration order.
    #[serde(default)]
    pub inputs: Vec<PortDescription>,
    /// Output ports in declaration order.
    #[serde(default)]
    pub outputs: Vec<PortDescription>,
    /// Numeric construction parameters.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl NodeDescription {
    /// Creates a node of type `uuid` without ports.
    pub fn new(uuid: Uuid, id: i32) -> Self {
        Self {
            uuid,
            id,
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Sets the lookup name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends an input port.
    pub fn input(mut self, fifo: u32, samples: usize) -> Self {
        self.inputs.push(PortDescription { fifo, samples });
        self
    }

    /// Appends an output port.
    pub fn output(mut self, fifo: u32, samples: usize) -> Self {
        self.outputs.push(PortDescription { fifo, samples });
        self
    }

    /// Sets a construction parameter.
    pub fn param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Name for messages: the node name, or its id.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.id),
        }
    }
}

/// Complete graph: memory, edges, nodes and schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Backing buffers.
    #[serde(default)]
    pub buffers: Vec<BufferDescription>,
    /// Edges.
    #[serde(default)]
    pub fifos: Vec<FifoDescription>,
    /// Node instances; schedule entries index this list.
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    /// Precomputed execution order of one iteration.
    #[serde(default)]
    pub schedule: Vec<u16>,
    /// Ask nodes before running them and skip infeasible ones.
    #[serde(default)]
    pub async_mode: bool,
}

impl GraphDescription {
    /// Parses a TOML description.
    pub fn from_toml(s: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(s)?)
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String, LoadError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parses a JSON description.
    pub fn from_json(s: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes the compact binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Encodes to the compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoadError> {
        Ok(bincode::serialize(self)?)
    }

    /// Looks a FIFO up by identifier.
    pub fn fifo(&self, id: u32) -> Option<&FifoDescription> {
        self.fifos.iter().find(|f| f.id == id)
    }

    /// Position of a FIFO in [`fifos`](Self::fifos).
    pub fn fifo_index(&self, id: u32) -> Option<usize> {
        self.fifos.iter().position(|f| f.id == id)
    }

    /// Total bytes of all buffers.
    pub fn memory(&self) -> usize {
        self.buffers.iter().map(|b| b.length).sum()
    }

    /// Simulates one iteration of the schedule against the FIFO sizes.
    ///
    /// Node and FIFO numbers in the error are positions in
    /// [`nodes`](Self::nodes) and [`fifos`](Self::fifos). Ports naming an
    /// undeclared FIFO are ignored here; instantiation reports them.
    pub fn verify_schedule(&self) -> Result<(), ScheduleError> {
        let rates = |ports: &[PortDescription]| -> Vec<(usize, usize)> {
            ports
                .iter()
                .filter_map(|p| self.fifo_index(p.fifo).map(|i| (i, p.samples)))
                .collect()
        };
        let nodes: Vec<NodeRates> = self
            .nodes
            .iter()
            .map(|n| NodeRates::new(rates(&n.inputs), rates(&n.outputs)))
            .collect();
        let fifos: Vec<FifoSpec> = self
            .fifos
            .iter()
            .map(|f| FifoSpec {
                capacity: f.length,
                delay: f.delay,
            })
            .collect();
        verify_schedule(&self.schedule, &nodes, &fifos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: Uuid = Uuid::from_u128(0xc0089f59_2f33_4ec4_9023_30f69f0f4833);

    fn two_node_graph() -> GraphDescription {
        GraphDescription {
            buffers: vec![BufferDescription { length: 20 }],
            fifos: vec![FifoDescription {
                id: 0,
                buffer: 0,
                length: 5,
                delay: 0,
                plain: false,
                sample_type: SampleType::F32,
            }],
            nodes: vec![
                NodeDescription::new(SOURCE, 0).named("src").output(0, 5),
                NodeDescription::new(SOURCE, 1).input(0, 5).param("gain", 0.5),
            ],
            schedule: vec![0, 1],
            async_mode: false,
        }
    }

    #[test]
    fn toml_defaults() {
        let desc = GraphDescription::from_toml(
            r#"
            schedule = [0]

            [[buffers]]
            length = 8

            [[fifos]]
            id = 3
            buffer = 0
            length = 2

            [[nodes]]
            uuid = "c0089f59-2f33-4ec4-9023-30f69f0f4833"
            outputs = [{ fifo = 3, samples = 2 }]
            "#,
        )
        .unwrap();
        assert!(!desc.async_mode);
        let fifo = desc.fifo(3).unwrap();
        assert_eq!((fifo.delay, fifo.plain, fifo.sample_type), (0, false, SampleType::F32));
        assert_eq!(desc.nodes[0].id, CG_UNIDENTIFIED_NODE);
        assert_eq!(desc.nodes[0].uuid, SOURCE);
        assert_eq!(desc.nodes[0].label(), "#-1");
    }

    #[test]
    fn encodings_agree() {
        let desc = two_node_graph();
        assert_eq!(GraphDescription::from_toml(&desc.to_toml().unwrap()).unwrap(), desc);
        assert_eq!(GraphDescription::from_json(&desc.to_json().unwrap()).unwrap(), desc);
        assert_eq!(GraphDescription::from_bytes(&desc.to_bytes().unwrap()).unwrap(), desc);
    }

    #[test]
    fn binary_form_is_compact() {
        let desc = two_node_graph();
        assert!(desc.to_bytes().unwrap().len() < desc.to_json().unwrap().len());
    }

    #[test]
    fn bad_inputs_are_decode_errors() {
        assert!(matches!(GraphDescription::from_toml("schedule = 3"), Err(LoadError::Toml(_))));
        assert!(matches!(GraphDescription::from_json("{"), Err(LoadError::Json(_))));
        assert!(matches!(GraphDescription::from_bytes(&[1, 2]), Err(LoadError::Binary(_))));
    }

    #[test]
    fn lookups() {
        let desc = two_node_graph();
        assert_eq!(desc.fifo_index(0), Some(0));
        assert!(desc.fifo(9).is_none());
        assert_eq!(desc.memory(), 20);
        assert_eq!(desc.fifos[0].byte_size(), 20);
        assert_eq!(desc.nodes[1].params["gain"], 0.5);
    }
}
