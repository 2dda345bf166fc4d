//! Node type registry.

use uuid::Uuid;

use cgstream_core::{Duplicate, Node};

use crate::error::LoadError;
use crate::graph::RuntimeContext;
use crate::sample::{Sample, with_sample_type};

/// Type identifier of the built-in [`Duplicate`] node.
///
/// One identifier covers every element type: the factory picks the type
/// from the FIFO behind input 0.
pub const DUPLICATE_UUID: Uuid = Uuid::from_u128(0xbf9e5977_aaf3_4a54_b843_94f4a929805b);

/// Describes a node type in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Type identifier used in graph descriptions.
    pub uuid: Uuid,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the node.
    pub description: &'static str,
}

/// Factory function type for creating nodes.
pub type NodeFactory = fn(&RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of the node types a graph description may instantiate.
///
/// Maps each UUID to exactly one factory. [`NodeRegistry::new`] knows the
/// built-in [`Duplicate`] node; applications register their own types on
/// top.
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a registry with the built-in nodes registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin_nodes();
        registry
    }

    /// Create a registry without any node type.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    fn register_builtin_nodes(&mut self) {
        self.entries.push(RegistryEntry {
            descriptor: NodeDescriptor {
                uuid: DUPLICATE_UUID,
                name: "Duplicate",
                description: "Copies one input block to every output",
            },
            factory: make_duplicate,
        });
    }

    /// Register a node type.
    ///
    /// Fails if a factory already exists for the same UUID.
    pub fn register(&mut self, descriptor: NodeDescriptor, factory: NodeFactory) -> Result<(), LoadError> {
        if self.get(&descriptor.uuid).is_some() {
            return Err(LoadError::DuplicateUuid(descriptor.uuid));
        }
        tracing::debug!(uuid = %descriptor.uuid, name = descriptor.name, "node type registered");
        self.entries.push(RegistryEntry { descriptor, factory });
        Ok(())
    }

    /// Get a descriptor by UUID.
    pub fn get(&self, uuid: &Uuid) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.uuid == *uuid)
            .map(|e| &e.descriptor)
    }

    /// Create the node described by `ctx`.
    pub fn create(&self, ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
        let uuid = ctx.node().uuid;
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.uuid == uuid)
            .ok_or(LoadError::UnknownNode(uuid))?;
        (entry.factory)(ctx)
    }

    /// Returns descriptors for all registered node types.
    pub fn all(&self) -> Vec<&NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns the number of registered node types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn make_duplicate(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    let ty = ctx.input_type(0)?;
    with_sample_type!(ty, T => duplicate::<T>(ctx))
}

fn duplicate<T: Sample>(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    let node = ctx.node();
    if node.inputs.len() != 1 || node.outputs.is_empty() {
        return Err(LoadError::invalid_node(
            node.label(),
            "duplicate needs one input and at least one output",
        ));
    }
    let input = ctx.input::<T>(0)?;
    let mut outputs = Vec::with_capacity(node.outputs.len());
    for output in ctx.outputs::<T>()? {
        if output.samples() != input.samples() {
            return Err(LoadError::invalid_node(
                node.label(),
                "duplicate outputs must move as many samples as the input",
            ));
        }
        outputs.push(output.edge().clone());
    }
    Ok(Box::new(Duplicate::new(input.edge().clone(), input.samples(), outputs)))
}
