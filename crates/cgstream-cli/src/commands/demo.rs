//! Built-in demo: a source → processing → sink chain run asynchronously
//! while events pause and later resume the processing node.

use clap::Args;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cgstream_config::EventConfig;
use cgstream_core::event::{Event, EventReceiver, K_PAUSE, K_RESUME, K_VALUE, Priority};
use cgstream_core::scheduler::{HookFlow, ScheduleMode};
use cgstream_core::{
    EventQueue, EventThread, Fifo, GenericNode, GenericSink, GenericSource, Message, Node, SchedulerHooks,
    StaticScheduler, edge_ref,
};

use super::common::{describe_status, load_config};
use crate::nodes::{Processing, ProcessingControl, Sink, SinkStats, Source};

/// Samples per block.
const BLOCK: usize = 5;

/// Source, processing, sink.
const SCHEDULE: [u16; 3] = [0, 1, 2];

#[derive(Args)]
pub struct DemoArgs {
    /// Number of iterations
    #[arg(short = 'n', long, default_value = "10")]
    iterations: u32,

    /// Iteration at which processing is paused
    #[arg(long, default_value = "3")]
    pause_at: u32,

    /// Iteration at which processing resumes
    #[arg(long, default_value = "6")]
    resume_at: u32,

    /// Dispatch events between iterations instead of on the event thread
    #[arg(long)]
    inline_events: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Sends the pause and resume events and, without an event thread, drains
/// the queue at the start of every iteration.
struct Director {
    queue: Arc<EventQueue>,
    events: EventConfig,
    control: Arc<ProcessingControl>,
    pause_at: u32,
    resume_at: u32,
    inline: bool,
    skipped: usize,
}

impl Director {
    fn send(&self, event_id: u32, iteration: u32) {
        let target: Arc<dyn EventReceiver> = self.control.clone();
        let event = self.events.apply_ttl(Event::new(event_id, Priority::High));
        if self.queue.push(Message::local(target, 0, event)) {
            tracing::info!(iteration, event_id, "control event queued");
        } else {
            tracing::warn!(iteration, event_id, "control event dropped");
        }
    }
}

impl SchedulerHooks for Director {
    fn before_iteration(&mut self, iteration: u32) -> HookFlow {
        if iteration == self.pause_at {
            self.send(K_PAUSE, iteration);
        }
        if iteration == self.resume_at {
            self.send(K_RESUME, iteration);
        }
        if self.inline {
            self.queue.execute_pending();
        }
        ControlFlow::Continue(())
    }

    fn async_node_not_executed(&mut self, iteration: u32, node: usize) -> HookFlow {
        tracing::debug!(iteration, node, "node skipped");
        self.skipped += 1;
        ControlFlow::Continue(())
    }
}

pub fn run(args: DemoArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.inline_events {
        config.events.worker_thread = false;
    }

    let queue = Arc::new(config.events.event_queue());
    let app_events = Arc::new(AtomicUsize::new(0));
    {
        let app_events = Arc::clone(&app_events);
        queue.set_app_handler(move |src, event| {
            if event.event_id != K_VALUE {
                return false;
            }
            tracing::trace!(src, sum = event.get::<f32>(), "sink report");
            app_events.fetch_add(1, Ordering::Relaxed);
            true
        });
    }

    let fifo0 = edge_ref(Fifo::<f32>::with_capacity(2 * BLOCK, 0));
    let fifo1 = edge_ref(Fifo::<f32>::with_capacity(BLOCK, 0));

    let control = Arc::new(ProcessingControl::new(1.0));
    let stats = Arc::new(SinkStats::default());

    let mut nodes: Vec<Box<dyn Node>> = vec![
        Box::new(Source::new(GenericSource::new(fifo0.clone(), BLOCK))),
        Box::new(Processing::new(
            GenericNode::new(fifo0, BLOCK, fifo1.clone(), BLOCK),
            Arc::clone(&control),
        )),
        Box::new(
            Sink::new(GenericSink::new(fifo1, BLOCK), Arc::clone(&stats))
                .with_reports(config.events.event_output(Arc::clone(&queue))),
        ),
    ];
    for (id, node) in nodes.iter_mut().enumerate() {
        node.set_id(id as i32);
    }

    let thread = if config.events.worker_thread {
        Some(EventThread::spawn(Arc::clone(&queue))?)
    } else {
        None
    };

    let mut director = Director {
        queue: Arc::clone(&queue),
        events: config.events.clone(),
        control,
        pause_at: args.pause_at,
        resume_at: args.resume_at,
        inline: thread.is_none(),
        skipped: 0,
    };
    let report =
        StaticScheduler::new(&SCHEDULE, ScheduleMode::Async).run_with_hooks(&mut nodes, &mut director, Some(args.iterations));

    match thread {
        Some(thread) => thread.stop(),
        None => {
            queue.execute_pending();
            queue.end();
        }
    }

    println!("Iterations:  {}", report.iterations);
    println!("Status:      {}", describe_status(&report));
    println!("Skipped:     {} node runs", director.skipped);
    println!("Sink blocks: {}", stats.blocks());
    println!("Last sum:    {}", stats.last_sum());
    println!("App events:  {}", app_events.load(Ordering::Relaxed));

    if !report.is_clean() {
        anyhow::bail!("demo failed with status {}", report.error_code());
    }
    Ok(())
}
