//! Integration tests for cgstream-registry.
//!
//! Loads a small diamond graph (source → duplicate → processing + adder)
//! from its TOML and binary descriptions, with application node types
//! registered next to the built-in duplicate.

use std::ops::ControlFlow;

use uuid::Uuid;

use cgstream_core::scheduler::{HookFlow, NoHooks};
use cgstream_core::{
    Edge, GenericNode, GenericNode21, GenericSource, Node, NodeIdentity, NodeResult, SchedulerHooks, Status,
};
use cgstream_registry::{
    GraphDescription, LoadError, NodeDescriptor, NodeRegistry, RuntimeContext, SampleType, create_graph,
};

const SOURCE: Uuid = Uuid::from_u128(0xc0089f59_2f33_4ec4_9023_30f69f0f4833);
const PROCESSING: Uuid = Uuid::from_u128(0x3ff62b0c_9ad8_445d_bbe9_208d87423446);
const ADDER: Uuid = Uuid::from_u128(0x6a73381c_cd11_4f13_ba96_34757c2c4a59);

// ============================================================================
// Application nodes
// ============================================================================

struct Ramp {
    io: GenericSource<f32>,
    id: NodeIdentity,
}

impl Node for Ramp {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        for (i, s) in self.io.output.write()?.iter_mut().enumerate() {
            *s = i as f32;
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

struct Offset {
    io: GenericNode<f32, f32>,
    inc: f32,
}

impl Node for Offset {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        let a = self.io.input.read()?;
        let mut b = self.io.output.write()?;
        for (o, i) in b.iter_mut().zip(a.iter()) {
            *o = i + self.inc;
        }
        Ok(())
    }
}

struct Adder {
    io: GenericNode21<f32, f32, f32>,
}

impl Node for Adder {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        let a = self.io.input1.read()?;
        let b = self.io.input2.read()?;
        let mut c = self.io.output.write()?;
        for ((c, a), b) in c.iter_mut().zip(a.iter()).zip(b.iter()) {
            *c = a + b;
        }
        Ok(())
    }
}

fn make_ramp(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(0, 1)?;
    let out = ctx.output::<f32>(0)?;
    Ok(Box::new(Ramp {
        io: GenericSource::new(out.edge().clone(), out.samples()),
        id: NodeIdentity::default(),
    }))
}

fn make_offset(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(1, 1)?;
    let input = ctx.input::<f32>(0)?;
    let output = ctx.output::<f32>(0)?;
    Ok(Box::new(Offset {
        io: GenericNode::new(input.edge().clone(), input.samples(), output.edge().clone(), output.samples()),
        inc: ctx.param_or("inc", 1.0) as f32,
    }))
}

fn make_adder(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(2, 1)?;
    Ok(Box::new(Adder {
        io: GenericNode21::new(ctx.input(0)?, ctx.input(1)?, ctx.output(0)?),
    }))
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    let app: [(Uuid, &'static str, cgstream_registry::NodeFactory); 3] = [
        (SOURCE, "Source", make_ramp),
        (PROCESSING, "Processing", make_offset),
        (ADDER, "Adder", make_adder),
    ];
    for (uuid, name, factory) in app {
        registry
            .register(
                NodeDescriptor {
                    uuid,
                    name,
                    description: "test node",
                },
                factory,
            )
            .unwrap();
    }
    registry
}

// The adder output (FIFO 4) is read by the tests, not by a node.
const DIAMOND: &str = r#"
schedule = [0, 1, 2, 3]
async_mode = true

[[buffers]]
length = 20

[[fifos]]
id = 0
buffer = 0
length = 5

[[fifos]]
id = 1
buffer = 0
length = 5

[[fifos]]
id = 2
buffer = 0
length = 5

[[fifos]]
id = 3
buffer = 0
length = 5

[[fifos]]
id = 4
buffer = 0
length = 5

[[nodes]]
uuid = "c0089f59-2f33-4ec4-9023-30f69f0f4833"
id = 0
name = "source"
outputs = [{ fifo = 0, samples = 5 }]

[[nodes]]
uuid = "bf9e5977-aaf3-4a54-b843-94f4a929805b"
id = 1
inputs = [{ fifo = 0, samples = 5 }]
outputs = [{ fifo = 1, samples = 5 }, { fifo = 2, samples = 5 }]

[[nodes]]
uuid = "3ff62b0c-9ad8-445d-bbe9-208d87423446"
id = 2
name = "processing"
inputs = [{ fifo = 1, samples = 5 }]
outputs = [{ fifo = 3, samples = 5 }]
params = { inc = 1.0 }

[[nodes]]
uuid = "6a73381c-cd11-4f13-ba96-34757c2c4a59"
id = 3
name = "adder"
inputs = [{ fifo = 2, samples = 5 }, { fifo = 3, samples = 5 }]
outputs = [{ fifo = 4, samples = 5 }]
"#;

fn drain(graph: &cgstream_registry::RuntimeGraph, fifo: u32) -> Vec<f32> {
    let edge = graph.fifo::<f32>(fifo).unwrap();
    let mut edge = edge.borrow_mut();
    let n = edge.nb_samples_in_fifo();
    edge.get_read_buffer(n).to_vec()
}

// ============================================================================
// Loading and running
// ============================================================================

#[test]
fn diamond_from_toml() {
    let desc = GraphDescription::from_toml(DIAMOND).unwrap();
    let mut graph = create_graph(&desc, &registry()).unwrap();

    let report = graph.run(&mut NoHooks, Some(1));
    assert_eq!(report.iterations, 1);
    assert_eq!(report.status, Err(Status::StopScheduler));
    assert!(report.is_clean());

    // x + (x + 1) for x = 0..5
    assert_eq!(drain(&graph, 4), [1.0, 3.0, 5.0, 7.0, 9.0]);
    assert_eq!(graph.node("source").map(|n| n.node_id()), Some(0));
}

#[test]
fn binary_description_loads_identically() {
    let desc = GraphDescription::from_toml(DIAMOND).unwrap();
    let bytes = desc.to_bytes().unwrap();
    let decoded = GraphDescription::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, desc);

    let mut graph = create_graph(&decoded, &registry()).unwrap();
    graph.run(&mut NoHooks, Some(1));
    assert_eq!(drain(&graph, 4), [1.0, 3.0, 5.0, 7.0, 9.0]);
}

#[test]
fn parameters_reach_factories() {
    let mut desc = GraphDescription::from_toml(DIAMOND).unwrap();
    desc.nodes[2].params.insert("inc".into(), 10.0);
    let mut graph = create_graph(&desc, &registry()).unwrap();
    graph.run(&mut NoHooks, Some(1));
    assert_eq!(drain(&graph, 4), [10.0, 12.0, 14.0, 16.0, 18.0]);
}

#[derive(Default)]
struct SkipCounter {
    skipped: Vec<(u32, usize)>,
}

impl SchedulerHooks for SkipCounter {
    fn async_node_not_executed(&mut self, iteration: u32, node: usize) -> HookFlow {
        self.skipped.push((iteration, node));
        ControlFlow::Continue(())
    }
}

#[test]
fn async_graph_reports_skips_through_hooks() {
    let desc = GraphDescription::from_toml(DIAMOND).unwrap();
    let mut graph = create_graph(&desc, &registry()).unwrap();

    let mut hooks = SkipCounter::default();
    let report = graph.run(&mut hooks, Some(3));
    assert_eq!(report.iterations, 3);

    // Nothing drains fifo 4: the adder blocks first, and the back-pressure
    // reaches the duplicate and the processing node one iteration later.
    assert_eq!(hooks.skipped, [(1, 3), (2, 1), (2, 2), (2, 3)]);
}

// ============================================================================
// Rejected descriptions
// ============================================================================

#[test]
fn undrained_output_cannot_run_synchronously() {
    let mut desc = GraphDescription::from_toml(DIAMOND).unwrap();
    desc.async_mode = false;
    let err = create_graph(&desc, &registry()).err().unwrap();
    assert!(matches!(err, LoadError::Unbalanced(_)));
    assert_eq!(
        err.to_string(),
        "schedule cannot run synchronously: fifo 4 holds 5 samples after one iteration, expected 0"
    );

    let mut graph = create_graph(&GraphDescription::from_toml(DIAMOND).unwrap(), &registry()).unwrap();
    assert!(!graph.is_balanced());
    assert!(graph.set_mode(cgstream_core::ScheduleMode::Sync).is_err());
}

#[test]
fn unknown_node_type_without_application_registry() {
    let desc = GraphDescription::from_toml(DIAMOND).unwrap();
    let err = create_graph(&desc, &NodeRegistry::new()).err().unwrap();
    assert!(matches!(err, LoadError::UnknownNode(u) if u == SOURCE));
}

#[test]
fn wrong_sample_type_is_rejected() {
    let mut desc = GraphDescription::from_toml(DIAMOND).unwrap();
    desc.fifos[3].sample_type = SampleType::I32;
    let err = create_graph(&desc, &registry()).err().unwrap();
    assert_eq!(err.to_string(), "FIFO 3 carries i32 samples but the node expects f32");
}

#[test]
fn arity_is_checked_by_factories() {
    let mut desc = GraphDescription::from_toml(DIAMOND).unwrap();
    desc.nodes[3].inputs.pop();
    let err = create_graph(&desc, &registry()).err().unwrap();
    assert_eq!(
        err.to_string(),
        "invalid node adder: expected 2 inputs and 1 outputs, found 1 and 1"
    );
}

#[test]
fn json_and_toml_describe_the_same_graph() {
    let desc = GraphDescription::from_toml(DIAMOND).unwrap();
    let json = desc.to_json().unwrap();
    assert!(json.contains("\"sample_type\": \"f32\""));
    assert_eq!(GraphDescription::from_json(&json).unwrap(), desc);
}
