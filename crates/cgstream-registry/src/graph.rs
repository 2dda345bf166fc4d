//! Graph instantiation from a description.
//!
//! [`create_graph`] allocates every FIFO, asks the registry to build each
//! node through a [`RuntimeContext`], and returns a [`RuntimeGraph`] that
//! owns the lot and runs the description's schedule.

use std::any::Any;
use std::collections::HashMap;

use cgstream_core::{
    EdgeRef, Fifo, Input, Node, Output, PlainBuffer, RunReport, ScheduleError, ScheduleMode, SchedulerHooks,
    StaticScheduler, edge_ref,
};

use crate::description::{FifoDescription, GraphDescription, NodeDescription, PortDescription};
use crate::error::LoadError;
use crate::registry::NodeRegistry;
use crate::sample::{Sample, SampleType, with_sample_type};

/// Type-erased FIFO. `edge` holds an `EdgeRef<T>` for `sample_type`.
struct RuntimeFifo {
    sample_type: SampleType,
    edge: Box<dyn Any>,
}

type FifoTable = HashMap<u32, RuntimeFifo>;

fn allocate<T: Sample>(desc: &FifoDescription) -> Box<dyn Any> {
    let edge: EdgeRef<T> = if desc.plain {
        edge_ref(PlainBuffer::<T>::with_capacity(desc.length))
    } else {
        edge_ref(Fifo::<T>::with_capacity(desc.length, desc.delay))
    };
    Box::new(edge)
}

fn allocate_fifos(desc: &GraphDescription) -> Result<FifoTable, LoadError> {
    let mut fifos = FifoTable::with_capacity(desc.fifos.len());
    for fifo in &desc.fifos {
        let buffer = desc.buffers.get(fifo.buffer).ok_or(LoadError::UnknownBuffer {
            fifo: fifo.id,
            buffer: fifo.buffer,
        })?;
        if fifo.byte_size() > buffer.length {
            return Err(LoadError::FifoTooLarge {
                fifo: fifo.id,
                buffer: fifo.buffer,
                needed: fifo.byte_size(),
                available: buffer.length,
            });
        }
        let edge = with_sample_type!(fifo.sample_type, T => allocate::<T>(fifo));
        let entry = RuntimeFifo {
            sample_type: fifo.sample_type,
            edge,
        };
        if fifos.insert(fifo.id, entry).is_some() {
            return Err(LoadError::DuplicateFifo(fifo.id));
        }
    }
    Ok(fifos)
}

/// What a node factory sees: its own description and the graph's FIFOs.
pub struct RuntimeContext<'a> {
    fifos: &'a FifoTable,
    node: &'a NodeDescription,
}

impl<'a> RuntimeContext<'a> {
    /// Description of the node being built.
    pub fn node(&self) -> &'a NodeDescription {
        self.node
    }

    /// Construction parameter, if present.
    pub fn param(&self, key: &str) -> Option<f64> {
        self.node.params.get(key).copied()
    }

    /// Construction parameter, or `default` if absent.
    pub fn param_or(&self, key: &str, default: f64) -> f64 {
        self.param(key).unwrap_or(default)
    }

    /// Fails unless the node declares exactly these port counts.
    pub fn expect_ports(&self, inputs: usize, outputs: usize) -> Result<(), LoadError> {
        let node = self.node;
        if node.inputs.len() != inputs || node.outputs.len() != outputs {
            return Err(LoadError::invalid_node(
                node.label(),
                format!(
                    "expected {inputs} inputs and {outputs} outputs, found {} and {}",
                    node.inputs.len(),
                    node.outputs.len()
                ),
            ));
        }
        Ok(())
    }

    /// Element type of a FIFO.
    pub fn fifo_type(&self, fifo: u32) -> Result<SampleType, LoadError> {
        self.fifos
            .get(&fifo)
            .map(|f| f.sample_type)
            .ok_or(LoadError::UnknownFifo(fifo))
    }

    /// Element type of the FIFO behind input `port`.
    pub fn input_type(&self, port: usize) -> Result<SampleType, LoadError> {
        let p = self.port(&self.node.inputs, "input", port)?;
        self.fifo_type(p.fifo)
    }

    /// Typed handle to a FIFO.
    pub fn edge<T: Sample>(&self, fifo: u32) -> Result<EdgeRef<T>, LoadError> {
        let entry = self.fifos.get(&fifo).ok_or(LoadError::UnknownFifo(fifo))?;
        typed_edge(fifo, entry)
    }

    fn port(&self, ports: &[PortDescription], direction: &'static str, port: usize) -> Result<PortDescription, LoadError> {
        ports.get(port).copied().ok_or_else(|| LoadError::MissingPort {
            node: self.node.label(),
            direction,
            port,
        })
    }

    /// Input port `port` of the node.
    pub fn input<T: Sample>(&self, port: usize) -> Result<Input<T>, LoadError> {
        let p = self.port(&self.node.inputs, "input", port)?;
        Ok(Input::new(self.edge(p.fifo)?, p.samples))
    }

    /// Output port `port` of the node.
    pub fn output<T: Sample>(&self, port: usize) -> Result<Output<T>, LoadError> {
        let p = self.port(&self.node.outputs, "output", port)?;
        Ok(Output::new(self.edge(p.fifo)?, p.samples))
    }

    /// Every input port, all of type `T`.
    pub fn inputs<T: Sample>(&self) -> Result<Vec<Input<T>>, LoadError> {
        (0..self.node.inputs.len()).map(|i| self.input(i)).collect()
    }

    /// Every output port, all of type `T`.
    pub fn outputs<T: Sample>(&self) -> Result<Vec<Output<T>>, LoadError> {
        (0..self.node.outputs.len()).map(|i| self.output(i)).collect()
    }
}

fn typed_edge<T: Sample>(fifo: u32, entry: &RuntimeFifo) -> Result<EdgeRef<T>, LoadError> {
    entry
        .edge
        .downcast_ref::<EdgeRef<T>>()
        .cloned()
        .ok_or(LoadError::EdgeType {
            fifo,
            expected: T::TYPE,
            found: entry.sample_type,
        })
}

/// A loaded graph, ready to run.
pub struct RuntimeGraph {
    nodes: Vec<Box<dyn Node>>,
    names: HashMap<String, usize>,
    schedule: Vec<u16>,
    mode: ScheduleMode,
    fifos: FifoTable,
    unbalanced: Option<ScheduleError>,
}

impl RuntimeGraph {
    /// Runs the schedule until a node reports a status or `iterations`
    /// complete (`None` for no limit).
    pub fn run<H: SchedulerHooks + ?Sized>(&mut self, hooks: &mut H, iterations: Option<u32>) -> RunReport {
        StaticScheduler::new(&self.schedule, self.mode).run_with_hooks(&mut self.nodes[..], hooks, iterations)
    }

    /// Node registered under `name`.
    pub fn node(&self, name: &str) -> Option<&dyn Node> {
        let &index = self.names.get(name)?;
        self.nodes.get(index).map(|n| n.as_ref())
    }

    /// Mutable access to the node registered under `name`.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut dyn Node> {
        let &index = self.names.get(name)?;
        let node: &mut dyn Node = self.nodes.get_mut(index)?.as_mut();
        Some(node)
    }

    /// Typed handle to a FIFO, to inspect or feed it from outside.
    pub fn fifo<T: Sample>(&self, id: u32) -> Result<EdgeRef<T>, LoadError> {
        let entry = self.fifos.get(&id).ok_or(LoadError::UnknownFifo(id))?;
        typed_edge(id, entry)
    }

    /// Execution order of one iteration.
    pub fn schedule(&self) -> &[u16] {
        &self.schedule
    }

    /// Invocation mode.
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Overrides the mode taken from the description.
    ///
    /// Switching to [`ScheduleMode::Sync`] fails when the schedule does not
    /// fit the FIFO sizes, since nodes would then read or write past them.
    pub fn set_mode(&mut self, mode: ScheduleMode) -> Result<(), LoadError> {
        if mode == ScheduleMode::Sync
            && let Some(err) = self.unbalanced
        {
            return Err(LoadError::Unbalanced(err));
        }
        self.mode = mode;
        Ok(())
    }

    /// Returns `true` if the schedule fits the FIFO sizes and may run in
    /// synchronous mode.
    pub fn is_balanced(&self) -> bool {
        self.unbalanced.is_none()
    }

    /// Number of node instances.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds a runnable graph from a description.
///
/// FIFOs are allocated first, each checked against its buffer. Nodes are
/// then created in declaration order and receive their id through
/// [`Node::set_id`]. A synchronous description must pass
/// [`GraphDescription::verify_schedule`]; an asynchronous one may not, as
/// its nodes skip blocked invocations.
pub fn create_graph(desc: &GraphDescription, registry: &NodeRegistry) -> Result<RuntimeGraph, LoadError> {
    for (position, &node) in desc.schedule.iter().enumerate() {
        if usize::from(node) >= desc.nodes.len() {
            return Err(LoadError::InvalidSchedule { position, node });
        }
    }

    let fifos = allocate_fifos(desc)?;

    let mut nodes = Vec::with_capacity(desc.nodes.len());
    let mut names = HashMap::new();
    for (index, node_desc) in desc.nodes.iter().enumerate() {
        let ctx = RuntimeContext {
            fifos: &fifos,
            node: node_desc,
        };
        let mut node = registry.create(&ctx)?;
        node.set_id(node_desc.id);
        if let Some(name) = &node_desc.name
            && names.insert(name.clone(), index).is_some()
        {
            return Err(LoadError::invalid_node(name.clone(), "name is used twice"));
        }
        nodes.push(node);
    }

    let unbalanced = desc.verify_schedule().err();
    let mode = if desc.async_mode {
        ScheduleMode::Async
    } else if let Some(err) = unbalanced {
        return Err(LoadError::Unbalanced(err));
    } else {
        ScheduleMode::Sync
    };
    tracing::debug!(
        nodes = nodes.len(),
        fifos = fifos.len(),
        schedule = desc.schedule.len(),
        ?mode,
        "graph created"
    );

    Ok(RuntimeGraph {
        nodes,
        names,
        schedule: desc.schedule.clone(),
        mode,
        fifos,
        unbalanced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::BufferDescription;
    use crate::registry::{DUPLICATE_UUID, NodeDescriptor};
    use cgstream_core::scheduler::NoHooks;
    use cgstream_core::{Edge, GenericSink, GenericSource, NodeIdentity, NodeResult, Status};
    use uuid::Uuid;

    const RAMP: Uuid = Uuid::from_u128(1);
    const DRAIN: Uuid = Uuid::from_u128(2);

    struct Ramp {
        io: GenericSource<i32>,
        next: i32,
        id: NodeIdentity,
    }

    impl Node for Ramp {
        fn prepare_for_running(&mut self) -> NodeResult {
            self.io.prepare()
        }

        fn run(&mut self) -> NodeResult {
            for s in self.io.output.write()?.iter_mut() {
                *s = self.next;
                self.next += 1;
            }
            Ok(())
        }

        fn node_id(&self) -> i32 {
            self.id.get()
        }

        fn set_id(&mut self, id: i32) {
            self.id.set(id);
        }
    }

    struct Drain {
        io: GenericSink<i32>,
    }

    impl Node for Drain {
        fn prepare_for_running(&mut self) -> NodeResult {
            self.io.prepare()
        }

        fn run(&mut self) -> NodeResult {
            self.io.input.read()?;
            Ok(())
        }
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                NodeDescriptor {
                    uuid: RAMP,
                    name: "Ramp",
                    description: "Counts upwards",
                },
                |ctx| {
                    ctx.expect_ports(0, 1)?;
                    let out = ctx.output::<i32>(0)?;
                    Ok(Box::new(Ramp {
                        io: GenericSource::new(out.edge().clone(), out.samples()),
                        next: 0,
                        id: NodeIdentity::default(),
                    }))
                },
            )
            .unwrap();
        registry
            .register(
                NodeDescriptor {
                    uuid: DRAIN,
                    name: "Drain",
                    description: "Discards its input",
                },
                |ctx| {
                    let input = ctx.input::<i32>(0)?;
                    Ok(Box::new(Drain {
                        io: GenericSink::new(input.edge().clone(), input.samples()),
                    }))
                },
            )
            .unwrap();
        registry
    }

    fn fifo(id: u32, length: usize) -> FifoDescription {
        FifoDescription {
            id,
            buffer: id as usize,
            length,
            delay: 0,
            plain: false,
            sample_type: SampleType::I32,
        }
    }

    /// ramp -> dup -> (drain, tap)
    fn fan_out() -> GraphDescription {
        GraphDescription {
            buffers: vec![BufferDescription { length: 16 }; 3],
            fifos: vec![fifo(0, 4), fifo(1, 4), fifo(2, 4)],
            nodes: vec![
                NodeDescription::new(RAMP, 10).named("ramp").output(0, 4),
                NodeDescription::new(DUPLICATE_UUID, 11)
                    .named("dup")
                    .input(0, 4)
                    .output(1, 4)
                    .output(2, 4),
                NodeDescription::new(DRAIN, 12).input(1, 4),
                NodeDescription::new(DRAIN, 13).named("tap").input(2, 4),
            ],
            schedule: vec![0, 1, 2, 3],
            async_mode: false,
        }
    }

    #[test]
    fn loads_and_runs() {
        let mut graph = create_graph(&fan_out(), &registry()).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.mode(), ScheduleMode::Sync);
        assert!(graph.is_balanced());

        let report = graph.run(&mut NoHooks, Some(1));
        assert_eq!(report.iterations, 1);
        assert_eq!(report.status, Err(Status::StopScheduler));
        for id in 0..3 {
            assert_eq!(graph.fifo::<i32>(id).unwrap().borrow().nb_samples_in_fifo(), 0);
        }

        // Second block, stopped before the tap drains it
        graph.node_mut("ramp").unwrap().run().unwrap();
        graph.node_mut("dup").unwrap().run().unwrap();
        let side = graph.fifo::<i32>(2).unwrap();
        let mut side = side.borrow_mut();
        assert_eq!(side.nb_samples_in_fifo(), 4);
        assert_eq!(side.get_read_buffer(4), &[4, 5, 6, 7]);
    }

    #[test]
    fn ids_and_names() {
        let mut graph = create_graph(&fan_out(), &registry()).unwrap();
        assert_eq!(graph.node("ramp").map(|n| n.node_id()), Some(10));
        assert_eq!(graph.node("dup").map(|n| n.node_id()), Some(11));
        assert_eq!(graph.node("tap").map(|n| n.node_id()), Some(13));
        assert!(graph.node("missing").is_none());
        assert!(graph.node_mut("ramp").unwrap().run().is_ok());
    }

    #[test]
    fn async_mode_skips_blocked_nodes() {
        let mut desc = fan_out();
        desc.schedule = vec![0, 1, 2];
        desc.async_mode = true;
        let mut graph = create_graph(&desc, &registry()).unwrap();
        assert!(!graph.is_balanced());
        // Nobody drains fifo 2, so the duplicate blocks from the second pass.
        let report = graph.run(&mut NoHooks, Some(3));
        assert_eq!(report.iterations, 3);
        assert_eq!(graph.fifo::<i32>(2).unwrap().borrow().nb_samples_in_fifo(), 4);
        assert_eq!(graph.fifo::<i32>(0).unwrap().borrow().nb_samples_in_fifo(), 4);
    }

    #[test]
    fn sync_schedule_must_fit_the_fifos() {
        // Reads a block of 4 from FIFOs holding 2
        let desc = GraphDescription {
            buffers: vec![BufferDescription { length: 8 }; 2],
            fifos: vec![fifo(0, 2), fifo(1, 2)],
            nodes: vec![NodeDescription::new(DUPLICATE_UUID, 0).input(0, 4).output(1, 4)],
            schedule: vec![0],
            async_mode: false,
        };
        assert!(matches!(
            create_graph(&desc, &NodeRegistry::new()),
            Err(LoadError::Unbalanced(ScheduleError::Underflow {
                position: 0,
                node: 0,
                fifo: 0
            }))
        ));

        let mut desc = fan_out();
        desc.schedule = vec![0, 1, 2];
        let err = create_graph(&desc, &registry()).err().unwrap();
        assert!(matches!(err, LoadError::Unbalanced(ScheduleError::NotPeriodic { fifo: 2, .. })));
    }

    #[test]
    fn sync_override_needs_a_balanced_schedule() {
        let mut desc = fan_out();
        desc.schedule = vec![0, 1, 2];
        desc.async_mode = true;
        let mut graph = create_graph(&desc, &registry()).unwrap();
        assert!(matches!(graph.set_mode(ScheduleMode::Sync), Err(LoadError::Unbalanced(_))));
        assert_eq!(graph.mode(), ScheduleMode::Async);

        let mut graph = create_graph(&fan_out(), &registry()).unwrap();
        graph.set_mode(ScheduleMode::Async).unwrap();
        graph.set_mode(ScheduleMode::Sync).unwrap();
        assert_eq!(graph.mode(), ScheduleMode::Sync);
    }

    #[test]
    fn fifo_must_fit_its_buffer() {
        let mut desc = fan_out();
        desc.buffers[1].length = 15;
        assert!(matches!(
            create_graph(&desc, &registry()),
            Err(LoadError::FifoTooLarge {
                fifo: 1,
                needed: 16,
                available: 15,
                ..
            })
        ));
    }

    #[test]
    fn structural_errors() {
        let registry = registry();

        let mut desc = fan_out();
        desc.fifos[2].id = 1;
        assert!(matches!(create_graph(&desc, &registry), Err(LoadError::DuplicateFifo(1))));

        let mut desc = fan_out();
        desc.fifos[0].buffer = 7;
        assert!(matches!(
            create_graph(&desc, &registry),
            Err(LoadError::UnknownBuffer { fifo: 0, buffer: 7 })
        ));

        let mut desc = fan_out();
        desc.schedule.push(4);
        assert!(matches!(
            create_graph(&desc, &registry),
            Err(LoadError::InvalidSchedule { position: 4, node: 4 })
        ));

        let mut desc = fan_out();
        desc.nodes[2].inputs[0].fifo = 9;
        assert!(matches!(create_graph(&desc, &registry), Err(LoadError::UnknownFifo(9))));

        let mut desc = fan_out();
        desc.nodes[2].uuid = Uuid::from_u128(99);
        assert!(matches!(create_graph(&desc, &registry), Err(LoadError::UnknownNode(_))));

        let mut desc = fan_out();
        desc.nodes[2].name = Some("ramp".into());
        assert!(matches!(create_graph(&desc, &registry), Err(LoadError::InvalidNode { .. })));
    }

    #[test]
    fn edge_types_are_checked() {
        let mut desc = fan_out();
        desc.fifos[1].sample_type = SampleType::F32;
        desc.fifos[2].sample_type = SampleType::F32;
        assert!(matches!(
            create_graph(&desc, &registry()),
            Err(LoadError::EdgeType {
                fifo: 1,
                expected: SampleType::I32,
                found: SampleType::F32,
            })
        ));
    }

    #[test]
    fn missing_port_is_reported() {
        let mut desc = fan_out();
        desc.nodes[2].inputs.clear();
        let err = create_graph(&desc, &registry()).err().unwrap();
        assert_eq!(err.to_string(), "node #12 has no input port 0");
    }

    #[test]
    fn plain_buffers_and_delays() {
        let mut desc = fan_out();
        desc.fifos[1].plain = true;
        desc.buffers[2].length = 24;
        desc.fifos[2].length = 6;
        desc.fifos[2].delay = 2;
        let graph = create_graph(&desc, &registry()).unwrap();
        assert_eq!(graph.fifo::<i32>(2).unwrap().borrow().nb_samples_in_fifo(), 2);
        assert!(!graph.fifo::<i32>(1).unwrap().borrow().will_overflow_with(100));
        assert!(matches!(graph.fifo::<u8>(1), Err(LoadError::EdgeType { .. })));
    }
}
