//! Static schedulers walking a precomputed execution order.
//!
//! The schedule is an immutable list of node indices describing one
//! iteration of the graph. The scheduler makes no decisions of its own: it
//! invokes nodes in exactly that order, iteration after iteration, until a
//! node reports a status or the iteration limit is reached.
//!
//! # Architecture
//!
//! ```text
//! Idle ──► before_schedule ──► ┌─ before_iteration ─────────────┐
//!                              │  for index in schedule:        │
//!                              │    [async] prepare_for_running │──skip──► next index
//!                              │    run                         │──error─► after_schedule
//!                              └─ after_iteration ◄─────────────┘
//! ```
//!
//! - [`ScheduleMode::Sync`]: every node is run directly. FIFO sizes were
//!   proven compatible offline, so no feasibility check happens.
//! - [`ScheduleMode::Async`]: each node is asked first; a
//!   [`Status::SkipExecution`] answer skips it for this pass without error.
//!
//! Any other status ends the call and is reported in [`RunReport::status`].
//! [`Status::StopScheduler`] is the clean way to finish.
//! [`PausableScheduler`] additionally remembers where a
//! [`Status::PausedScheduler`] happened and resumes from there.
//! With `std`, a `PauseGate` used as hooks lets another thread freeze the
//! loop between two iterations.
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::{Node, NodeResult, ScheduleMode, StaticScheduler, Status};
//!
//! struct Tick(u32);
//! impl Node for Tick {
//!     fn run(&mut self) -> NodeResult {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut nodes = [Tick(0), Tick(0)];
//! let scheduler = StaticScheduler::new(&[0, 1, 1], ScheduleMode::Sync);
//! let report = scheduler.run(&mut nodes, Some(4));
//! assert_eq!(report.iterations, 4);
//! assert_eq!(report.status, Err(Status::StopScheduler));
//! assert_eq!(nodes[1].0, 8);
//! ```

#[cfg(feature = "std")]
mod gate;
pub mod hooks;
mod pausable;
mod verify;

#[cfg(feature = "std")]
pub use gate::{GateState, PauseGate};
pub use hooks::{HookFlow, NoHooks, SchedulerHooks};
#[cfg(feature = "tracing")]
pub use hooks::TracingHooks;
pub use pausable::{CallbackState, CallbackStatus, PausableScheduler};
pub use verify::{FifoSpec, NodeRates, ScheduleError, verify_schedule};

use core::ops::ControlFlow;

use crate::node::Node;
use crate::status::{NodeResult, Status, status_code};

/// How nodes are invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScheduleMode {
    /// Run every scheduled node unconditionally.
    #[default]
    Sync,
    /// Ask each node with `prepare_for_running` and skip infeasible ones.
    Async,
}

/// Outcome of a scheduling call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Number of fully completed iterations.
    pub iterations: u32,
    /// Status that ended the call.
    pub status: NodeResult,
}

impl RunReport {
    /// Numeric status code, as returned through `int *error`.
    pub fn error_code(&self) -> i32 {
        status_code(&self.status)
    }

    /// Returns `true` if the call ended without a fatal error.
    pub fn is_clean(&self) -> bool {
        match self.status {
            Ok(()) => true,
            Err(status) => !status.is_error(),
        }
    }
}

/// Scheduler over a fixed execution order.
#[derive(Clone, Copy, Debug)]
pub struct StaticScheduler<'a> {
    order: &'a [u16],
    mode: ScheduleMode,
}

impl<'a> StaticScheduler<'a> {
    /// Creates a scheduler over `order`, a list of node indices.
    pub fn new(order: &'a [u16], mode: ScheduleMode) -> Self {
        Self { order, mode }
    }

    /// Execution order of one iteration.
    pub fn order(&self) -> &'a [u16] {
        self.order
    }

    /// Invocation mode.
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Runs until a node reports a status or `iterations` complete.
    ///
    /// `None` runs without limit. Reaching the limit ends the call with
    /// [`Status::StopScheduler`].
    pub fn run<N: Node>(&self, nodes: &mut [N], iterations: Option<u32>) -> RunReport {
        self.run_with_hooks(nodes, &mut NoHooks, iterations)
    }

    /// Same as [`run`](Self::run) with observation hooks.
    pub fn run_with_hooks<N, H>(&self, nodes: &mut [N], hooks: &mut H, iterations: Option<u32>) -> RunReport
    where
        N: Node,
        H: SchedulerHooks + ?Sized,
    {
        drive(self.order, self.mode, nodes, hooks, iterations, Cursor::default()).report
    }
}

/// Position inside the schedule where execution starts.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Cursor {
    pub position: usize,
    pub iterations: u32,
}

pub(crate) struct Outcome {
    pub report: RunReport,
    /// Schedule position of the node that paused, if any.
    pub paused_at: Option<usize>,
}

macro_rules! hook {
    ($call:expr, $label:lifetime) => {
        if let ControlFlow::Break(status) = $call {
            break $label Err(status);
        }
    };
}

/// Shared loop behind both schedulers.
pub(crate) fn drive<N, H>(
    order: &[u16],
    mode: ScheduleMode,
    nodes: &mut [N],
    hooks: &mut H,
    limit: Option<u32>,
    start: Cursor,
) -> Outcome
where
    N: Node,
    H: SchedulerHooks + ?Sized,
{
    let mut nb = start.iterations;
    let mut first = start.position;
    let mut paused_at = None;

    let status: NodeResult = 'run: {
        hook!(hooks.before_schedule(nb), 'run);
        if order.is_empty() || limit.is_some_and(|l| nb >= l) {
            break 'run Err(Status::StopScheduler);
        }

        loop {
            if first == 0 {
                hook!(hooks.before_iteration(nb), 'run);
            }
            for (pos, &index) in order.iter().enumerate().skip(first) {
                let index = usize::from(index);
                let Some(node) = nodes.get_mut(index) else {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(pos, index, "schedule references a missing node");
                    break 'run Err(Status::BufferError);
                };

                if mode == ScheduleMode::Async {
                    hook!(hooks.async_before_node_check(nb, index), 'run);
                    match node.prepare_for_running() {
                        Ok(()) => {}
                        Err(Status::SkipExecution) => {
                            hook!(hooks.async_node_not_executed(nb, index), 'run);
                            continue;
                        }
                        Err(status) => {
                            if status == Status::PausedScheduler {
                                paused_at = Some(pos);
                            }
                            break 'run Err(status);
                        }
                    }
                    hook!(hooks.async_after_node_check(nb, index), 'run);
                }

                hook!(hooks.before_node_execution(nb, index), 'run);
                let result = node.run();
                hook!(hooks.after_node_execution(nb, index, &result), 'run);
                if let Err(status) = result {
                    if status == Status::PausedScheduler {
                        paused_at = Some(pos);
                    }
                    break 'run Err(status);
                }
            }
            first = 0;
            hook!(hooks.after_iteration(nb), 'run);
            nb += 1;
            if limit.is_some_and(|l| nb >= l) {
                break 'run Err(Status::StopScheduler);
            }
        }
    };

    let report = RunReport {
        iterations: nb,
        status,
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(iterations = nb, code = report.error_code(), "schedule ended");
    hooks.after_schedule(&report);
    Outcome { report, paused_at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::{Edge, Fifo, edge_ref};
    use crate::generic::{GenericNode, GenericSink, GenericSource};

    struct Source {
        io: GenericSource<f32>,
        next: f32,
    }

    impl Node for Source {
        fn prepare_for_running(&mut self) -> NodeResult {
            self.io.prepare()
        }

        fn run(&mut self) -> NodeResult {
            let mut out = self.io.output.write()?;
            for slot in out.iter_mut() {
                *slot = self.next;
                self.next += 1.0;
            }
            Ok(())
        }
    }

    struct Processing {
        io: GenericNode<f32, f32>,
    }

    impl Node for Processing {
        fn prepare_for_running(&mut self) -> NodeResult {
            self.io.prepare()
        }

        fn run(&mut self) -> NodeResult {
            let src = self.io.input.read()?;
            let mut dst = self.io.output.write()?;
            for (o, i) in dst.iter_mut().zip(src.iter()) {
                *o = *i + 1.0;
            }
            Ok(())
        }
    }

    struct Sink {
        io: GenericSink<f32>,
        received: Vec<f32>,
    }

    impl Node for Sink {
        fn prepare_for_running(&mut self) -> NodeResult {
            self.io.prepare()
        }

        fn run(&mut self) -> NodeResult {
            self.received.extend_from_slice(&self.io.input.read()?);
            Ok(())
        }
    }

    /// Node 0 = processing 7 -> 7, node 1 = sink 5, node 2 = source 5.
    const SCHEDULE: [u16; 19] = [2, 2, 0, 1, 2, 0, 1, 2, 2, 0, 1, 1, 2, 0, 1, 2, 0, 1, 1];

    fn build() -> Vec<Box<dyn Node>> {
        let fifo0 = edge_ref(Fifo::<f32>::with_capacity(11, 0));
        let fifo1 = edge_ref(Fifo::<f32>::with_capacity(11, 0));
        vec![
            Box::new(Processing {
                io: GenericNode::new(fifo0.clone(), 7, fifo1.clone(), 7),
            }),
            Box::new(Sink {
                io: GenericSink::new(fifo1, 5),
                received: Vec::new(),
            }),
            Box::new(Source {
                io: GenericSource::new(fifo0, 5),
                next: 0.0,
            }),
        ]
    }

    #[test]
    fn sync_schedule_runs_to_limit() {
        let mut nodes = build();
        let report = StaticScheduler::new(&SCHEDULE, ScheduleMode::Sync).run(&mut nodes, Some(10));
        assert_eq!(report.iterations, 10);
        assert_eq!(report.status, Err(Status::StopScheduler));
        assert!(report.is_clean());
        assert_eq!(report.error_code(), -8);
    }

    #[test]
    fn async_schedule_never_skips_a_sized_graph() {
        struct CountSkips(u32);
        impl SchedulerHooks for CountSkips {
            fn async_node_not_executed(&mut self, _: u32, _: usize) -> HookFlow {
                self.0 += 1;
                ControlFlow::Continue(())
            }
        }

        let mut nodes = build();
        let mut skips = CountSkips(0);
        let report = StaticScheduler::new(&SCHEDULE, ScheduleMode::Async).run_with_hooks(
            &mut nodes,
            &mut skips,
            Some(3),
        );
        assert_eq!(report.iterations, 3);
        assert_eq!(skips.0, 0);
    }

    #[test]
    fn async_mode_skips_infeasible_nodes() {
        let edge = edge_ref(Fifo::<f32>::with_capacity(4, 0));
        let mut nodes: Vec<Box<dyn Node>> = vec![
            Box::new(Sink {
                io: GenericSink::new(edge.clone(), 4),
                received: Vec::new(),
            }),
            Box::new(Source {
                io: GenericSource::new(edge.clone(), 2),
                next: 0.0,
            }),
        ];
        // Sink first: skipped on the first pass, fed after two source runs.
        let report = StaticScheduler::new(&[0, 1], ScheduleMode::Async).run(&mut nodes, Some(3));
        assert_eq!(report.status, Err(Status::StopScheduler));
        assert_eq!(edge.borrow().nb_samples_in_fifo(), 2);
    }

    #[test]
    fn error_aborts_and_is_reported() {
        struct Failing;
        impl Node for Failing {
            fn run(&mut self) -> NodeResult {
                Err(Status::OsError)
            }
        }
        let mut nodes = [Failing];
        let report = StaticScheduler::new(&[0], ScheduleMode::Sync).run(&mut nodes, None);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.status, Err(Status::OsError));
        assert!(!report.is_clean());
    }

    #[test]
    fn missing_node_is_a_buffer_error() {
        let mut nodes: Vec<Box<dyn Node>> = Vec::new();
        let report = StaticScheduler::new(&[3], ScheduleMode::Sync).run(&mut nodes, Some(1));
        assert_eq!(report.status, Err(Status::BufferError));
    }

    #[test]
    fn hook_break_ends_schedule() {
        struct StopAfterTwo(u32);
        impl SchedulerHooks for StopAfterTwo {
            fn after_iteration(&mut self, iteration: u32) -> HookFlow {
                if iteration == 1 {
                    ControlFlow::Break(Status::StopScheduler)
                } else {
                    ControlFlow::Continue(())
                }
            }

            fn after_schedule(&mut self, report: &RunReport) {
                self.0 = report.iterations;
            }
        }

        let mut nodes = build();
        let mut hooks = StopAfterTwo(99);
        let report = StaticScheduler::new(&SCHEDULE, ScheduleMode::Sync).run_with_hooks(&mut nodes, &mut hooks, None);
        assert_eq!(report.status, Err(Status::StopScheduler));
        // Break happens before the counter advances.
        assert_eq!(report.iterations, 1);
        assert_eq!(hooks.0, 1);
    }

    #[test]
    fn empty_schedule_stops_immediately() {
        let mut nodes: [Box<dyn Node>; 0] = [];
        let report = StaticScheduler::new(&[], ScheduleMode::Async).run(&mut nodes, None);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.status, Err(Status::StopScheduler));
    }
}
