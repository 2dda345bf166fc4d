//! Criterion benchmarks for cgstream-core primitives
//!
//! Run with: cargo bench -p cgstream-core
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cgstream_core::event::{Event, EventReceiver, K_VALUE, Priority};
use cgstream_core::queue::{EventQueue, Message};
use cgstream_core::{Edge, Fifo, GenericNode, GenericSink, GenericSource, Node, NodeResult, ScheduleMode, StaticScheduler, edge_ref};

const BLOCK_SIZES: &[usize] = &[16, 64, 256, 1024];

fn bench_fifo(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fifo");

    for &block in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::new("write_read", block), &block, |b, &block| {
            let mut fifo = Fifo::<f32>::with_capacity(block * 2, 0);
            b.iter(|| {
                fifo.get_write_buffer(block).fill(black_box(0.5));
                black_box(fifo.get_read_buffer(block)[0]);
            });
        });

        // Unaligned rates force a compaction on most writes.
        group.bench_with_input(BenchmarkId::new("compacting", block), &block, |b, &block| {
            let mut fifo = Fifo::<f32>::with_capacity(block * 2, block / 2);
            b.iter(|| {
                fifo.get_write_buffer(block).fill(black_box(0.5));
                black_box(fifo.get_read_buffer(block)[0]);
            });
        });
    }

    group.finish();
}

struct Source(GenericSource<f32>);

impl Node for Source {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.0.prepare()
    }

    fn run(&mut self) -> NodeResult {
        self.0.output.write()?.fill(1.0);
        Ok(())
    }
}

struct Gain(GenericNode<f32, f32>);

impl Node for Gain {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.0.prepare()
    }

    fn run(&mut self) -> NodeResult {
        let input = self.0.input.read()?;
        for (o, i) in self.0.output.write()?.iter_mut().zip(input.iter()) {
            *o = *i * 0.5;
        }
        Ok(())
    }
}

struct Sink(GenericSink<f32>);

impl Node for Sink {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.0.prepare()
    }

    fn run(&mut self) -> NodeResult {
        black_box(self.0.input.read()?[0]);
        Ok(())
    }
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("StaticScheduler");

    for (name, mode) in [("sync", ScheduleMode::Sync), ("async", ScheduleMode::Async)] {
        group.bench_function(BenchmarkId::new("three_nodes_x100", name), |b| {
            let f0 = edge_ref(Fifo::<f32>::with_capacity(64, 0));
            let f1 = edge_ref(Fifo::<f32>::with_capacity(64, 0));
            let mut nodes: Vec<Box<dyn Node>> = vec![
                Box::new(Source(GenericSource::new(f0.clone(), 64))),
                Box::new(Gain(GenericNode::new(f0, 64, f1.clone(), 64))),
                Box::new(Sink(GenericSink::new(f1, 64))),
            ];
            let scheduler = StaticScheduler::new(&[0, 1, 2], mode);
            b.iter(|| black_box(scheduler.run(&mut nodes, Some(100))));
        });
    }

    group.finish();
}

struct Discard;

impl EventReceiver for Discard {
    fn process_event(&self, port: u32, event: Event) {
        black_box((port, event));
    }
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("EventQueue");
    let node: Arc<dyn EventReceiver> = Arc::new(Discard);

    group.bench_function("push_execute_pending_20", |b| {
        let queue = EventQueue::new();
        b.iter(|| {
            for i in 0..20u32 {
                let priority = Priority::from_raw(i % 3);
                queue.push(Message::local(node.clone(), 0, Event::with_value(K_VALUE, priority, i)));
            }
            black_box(queue.execute_pending());
        });
    });

    group.bench_function("event_clone_list", |b| {
        let event = Event::with_args(K_VALUE, Priority::Normal, (1.0f32, 2i32, 3u8));
        b.iter(|| black_box(event.clone_event()));
    });

    group.finish();
}

criterion_group!(benches, bench_fifo, bench_scheduler, bench_queue);
criterion_main!(benches);
