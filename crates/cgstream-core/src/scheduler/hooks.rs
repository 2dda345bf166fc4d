//! Observation points around scheduler transitions.
//!
//! Every method has a no-op default, so an implementation overrides only the
//! points it cares about. Returning [`ControlFlow::Break`] from a hook ends
//! the schedule with the given status; `after_schedule` still runs.

use core::ops::ControlFlow;

use super::RunReport;
use crate::status::{NodeResult, Status};

/// Outcome of a hook: keep going or end the schedule with a status.
pub type HookFlow = ControlFlow<Status>;

/// Callbacks invoked by the schedulers.
///
/// `iteration` is the number of iterations completed so far and `node` the
/// node index taken from the schedule.
#[allow(unused_variables)]
pub trait SchedulerHooks {
    /// Before the first iteration.
    fn before_schedule(&mut self, iteration: u32) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// At the start of each iteration.
    fn before_iteration(&mut self, iteration: u32) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// Asynchronous mode: before the feasibility check of a node.
    fn async_before_node_check(&mut self, iteration: u32, node: usize) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// Asynchronous mode: after a successful feasibility check.
    fn async_after_node_check(&mut self, iteration: u32, node: usize) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// Asynchronous mode: the node was skipped this pass.
    fn async_node_not_executed(&mut self, iteration: u32, node: usize) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// Before a node runs.
    fn before_node_execution(&mut self, iteration: u32, node: usize) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// After a node ran, with its result.
    fn after_node_execution(&mut self, iteration: u32, node: usize, result: &NodeResult) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// After a full iteration.
    fn after_iteration(&mut self, iteration: u32) -> HookFlow {
        ControlFlow::Continue(())
    }

    /// Once, when the schedule ends for any reason.
    fn after_schedule(&mut self, report: &RunReport) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl SchedulerHooks for NoHooks {}

/// Hooks that trace every transition.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHooks;

#[cfg(feature = "tracing")]
impl SchedulerHooks for TracingHooks {
    fn before_schedule(&mut self, iteration: u32) -> HookFlow {
        tracing::trace!(iteration, "schedule start");
        ControlFlow::Continue(())
    }

    fn async_node_not_executed(&mut self, iteration: u32, node: usize) -> HookFlow {
        tracing::trace!(iteration, node, "node skipped");
        ControlFlow::Continue(())
    }

    fn after_node_execution(&mut self, iteration: u32, node: usize, result: &NodeResult) -> HookFlow {
        tracing::trace!(iteration, node, ?result, "node executed");
        ControlFlow::Continue(())
    }

    fn after_schedule(&mut self, report: &RunReport) {
        tracing::trace!(iterations = report.iterations, status = ?report.status, "schedule end");
    }
}
