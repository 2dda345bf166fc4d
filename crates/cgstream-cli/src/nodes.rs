//! Demo node types and their registry.
//!
//! Four `f32` nodes cover the usual graph shapes: a ramp source, an
//! incrementing processing node that can be paused through events, a
//! counting sink, and a two-input adder. Together with the built-in
//! duplicate they describe any of the graphs under `graphs/`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use uuid::Uuid;

use cgstream_core::event::{Event, EventReceiver, K_PAUSE, K_RESUME, K_VALUE, Priority};
use cgstream_core::{
    EventOutput, GenericNode, GenericNode21, GenericSink, GenericSource, Node, NodeIdentity, NodeResult, Status,
};
use cgstream_registry::{LoadError, NodeDescriptor, NodeFactory, NodeRegistry, RuntimeContext};

pub const SOURCE_UUID: Uuid = Uuid::from_u128(0xc0089f59_2f33_4ec4_9023_30f69f0f4833);
pub const PROCESSING_UUID: Uuid = Uuid::from_u128(0x3ff62b0c_9ad8_445d_bbe9_208d87423446);
pub const SINK_UUID: Uuid = Uuid::from_u128(0xc30ea9ea_e9c3_4638_bbc6_021fa3549d93);
pub const ADDER_UUID: Uuid = Uuid::from_u128(0x6a73381c_cd11_4f13_ba96_34757c2c4a59);

// ============================================================================
// Source
// ============================================================================

/// Writes `0, 1, .., n - 1` on every run.
pub struct Source {
    io: GenericSource<f32>,
    id: NodeIdentity,
}

impl Source {
    pub fn new(io: GenericSource<f32>) -> Self {
        Self {
            io,
            id: NodeIdentity::default(),
        }
    }
}

impl Node for Source {
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

// ============================================================================
// Processing
// ============================================================================

/// Event-facing half of a [`Processing`] node.
///
/// `K_PAUSE` and `K_RESUME` toggle processing, `K_VALUE` with a number
/// replaces the increment.
#[derive(Debug)]
pub struct ProcessingControl {
    paused: AtomicBool,
    inc: AtomicU32,
}

impl ProcessingControl {
    pub fn new(inc: f32) -> Self {
        Self {
            paused: AtomicBool::new(false),
            inc: AtomicU32::new(inc.to_bits()),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn inc(&self) -> f32 {
        f32::from_bits(self.inc.load(Ordering::Relaxed))
    }
}

impl EventReceiver for ProcessingControl {
    fn process_event(&self, _port: u32, event: Event) {
        match event.event_id {
            K_PAUSE => self.paused.store(true, Ordering::Release),
            K_RESUME => self.paused.store(false, Ordering::Release),
            K_VALUE => {
                event.apply(|(inc,): (f32,)| self.inc.store(inc.to_bits(), Ordering::Relaxed));
            }
            _ => return,
        }
        tracing::debug!(event_id = event.event_id, paused = self.is_paused(), "processing control");
    }
}

/// Adds the increment to every sample.
///
/// While paused the node is skipped in asynchronous mode and forwards its
/// input unchanged in synchronous mode.
pub struct Processing {
    io: GenericNode<f32, f32>,
    control: Arc<ProcessingControl>,
    id: NodeIdentity,
}

impl Processing {
    pub fn new(io: GenericNode<f32, f32>, control: Arc<ProcessingControl>) -> Self {
        Self {
            io,
            control,
            id: NodeIdentity::default(),
        }
    }
}

impl Node for Processing {
    fn prepare_for_running(&mut self) -> NodeResult {
        if self.control.is_paused() {
            return Err(Status::SkipExecution);
        }
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        let inc = if self.control.is_paused() { 0.0 } else { self.control.inc() };
        let src = self.io.input.read()?;
        let mut dst = self.io.output.write()?;
        for (o, i) in dst.iter_mut().zip(src.iter()) {
            *o = i + inc;
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

// ============================================================================
// Sink
// ============================================================================

/// Counters shared between a [`Sink`] and whoever inspects it.
#[derive(Debug, Default)]
pub struct SinkStats {
    blocks: AtomicUsize,
    last_sum: AtomicU32,
}

impl SinkStats {
    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn last_sum(&self) -> f32 {
        f32::from_bits(self.last_sum.load(Ordering::Relaxed))
    }
}

/// Consumes blocks, counting them and reporting each block's sum to the
/// application when it has an event output.
pub struct Sink {
    io: GenericSink<f32>,
    stats: Arc<SinkStats>,
    reports: Option<EventOutput>,
    id: NodeIdentity,
}

impl Sink {
    pub fn new(io: GenericSink<f32>, stats: Arc<SinkStats>) -> Self {
        Self {
            io,
            stats,
            reports: None,
            id: NodeIdentity::default(),
        }
    }

    /// Sends `K_VALUE(sum)` to the application handler after every block.
    pub fn with_reports(mut self, output: EventOutput) -> Self {
        self.reports = Some(output);
        self
    }
}

impl Node for Sink {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        let sum: f32 = self.io.input.read()?.iter().sum();
        self.stats.blocks.fetch_add(1, Ordering::Relaxed);
        self.stats.last_sum.store(sum.to_bits(), Ordering::Relaxed);
        tracing::debug!(node = self.id.get(), sum, "sink block");
        if let Some(reports) = &self.reports
            && !reports.send_async_to_app(self.id.get(), Priority::Normal, K_VALUE, (sum,))
        {
            tracing::warn!(node = self.id.get(), "sink report dropped");
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

// ============================================================================
// Adder
// ============================================================================

/// Adds two inputs sample by sample.
pub struct Adder {
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

// ============================================================================
// Registry
// ============================================================================

fn make_source(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(0, 1)?;
    let out = ctx.output::<f32>(0)?;
    Ok(Box::new(Source::new(GenericSource::new(out.edge().clone(), out.samples()))))
}

fn make_processing(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(1, 1)?;
    let input = ctx.input::<f32>(0)?;
    let output = ctx.output::<f32>(0)?;
    if input.samples() != output.samples() {
        return Err(LoadError::invalid_node(
            ctx.node().label(),
            "processing consumes and produces the same number of samples",
        ));
    }
    let io = GenericNode::new(input.edge().clone(), input.samples(), output.edge().clone(), output.samples());
    let control = Arc::new(ProcessingControl::new(ctx.param_or("inc", 1.0) as f32));
    Ok(Box::new(Processing::new(io, control)))
}

fn make_sink(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(1, 0)?;
    let input = ctx.input::<f32>(0)?;
    Ok(Box::new(Sink::new(
        GenericSink::new(input.edge().clone(), input.samples()),
        Arc::default(),
    )))
}

fn make_adder(ctx: &RuntimeContext<'_>) -> Result<Box<dyn Node>, LoadError> {
    ctx.expect_ports(2, 1)?;
    Ok(Box::new(Adder {
        io: GenericNode21::new(ctx.input(0)?, ctx.input(1)?, ctx.output(0)?),
    }))
}

/// Registry with the built-in duplicate and the four demo nodes.
pub fn demo_registry() -> Result<NodeRegistry, LoadError> {
    let demo: [(Uuid, &'static str, &'static str, NodeFactory); 4] = [
        (SOURCE_UUID, "Source", "Ramp 0..n of f32 samples", make_source),
        (PROCESSING_UUID, "Processing", "Adds the `inc` parameter to every sample", make_processing),
        (SINK_UUID, "Sink", "Counts incoming blocks", make_sink),
        (ADDER_UUID, "Adder", "Sums two inputs", make_adder),
    ];

    let mut registry = NodeRegistry::new();
    for (uuid, name, description, factory) in demo {
        registry.register(
            NodeDescriptor {
                uuid,
                name,
                description,
            },
            factory,
        )?;
    }
    Ok(registry)
}
