//! Scheduler that can yield to its caller in the middle of an iteration.
//!
//! A node returning [`Status::PausedScheduler`] suspends the loop. The
//! scheduler stores where it stopped in a [`CallbackState`] and returns the
//! pause to the caller, typically a bare-metal superloop waiting for a frame
//! interrupt. The next call restores the iteration count and starts at the
//! node that paused, so that node gets another chance before the rest of the
//! iteration continues.

use super::{Cursor, RunReport, ScheduleMode, SchedulerHooks, drive};
use crate::node::Node;
use crate::scheduler::NoHooks;
use crate::status::Status;

/// Lifecycle of a pausable scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallbackStatus {
    /// No call made yet, or the last call ended for a reason other than pause.
    #[default]
    NotStarted,
    /// A call is in progress.
    Running,
    /// The last call was paused and the next one resumes.
    Paused,
}

/// Saved continuation of a paused schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallbackState {
    /// Lifecycle state.
    pub status: CallbackStatus,
    /// Iterations completed when the pause happened.
    pub nb_sched: u32,
    /// Schedule position of the node that paused.
    pub schedule_state_id: usize,
}

/// Static scheduler with resumable pause support.
#[derive(Debug)]
pub struct PausableScheduler<'a> {
    order: &'a [u16],
    mode: ScheduleMode,
    state: CallbackState,
}

impl<'a> PausableScheduler<'a> {
    /// Creates a scheduler in the `NotStarted` state.
    pub fn new(order: &'a [u16], mode: ScheduleMode) -> Self {
        Self {
            order,
            mode,
            state: CallbackState::default(),
        }
    }

    /// Current saved state.
    pub fn state(&self) -> CallbackState {
        self.state
    }

    /// Returns `true` if the next call resumes a paused schedule.
    pub fn is_paused(&self) -> bool {
        self.state.status == CallbackStatus::Paused
    }

    /// Forgets any saved continuation.
    pub fn reset(&mut self) {
        self.state = CallbackState::default();
    }

    /// Runs or resumes the schedule.
    ///
    /// The iteration limit counts iterations across resumed calls.
    pub fn run<N: Node>(&mut self, nodes: &mut [N], iterations: Option<u32>) -> RunReport {
        self.run_with_hooks(nodes, &mut NoHooks, iterations)
    }

    /// Same as [`run`](Self::run) with observation hooks.
    pub fn run_with_hooks<N, H>(&mut self, nodes: &mut [N], hooks: &mut H, iterations: Option<u32>) -> RunReport
    where
        N: Node,
        H: SchedulerHooks + ?Sized,
    {
        let start = if self.is_paused() {
            Cursor {
                position: self.state.schedule_state_id,
                iterations: self.state.nb_sched,
            }
        } else {
            Cursor::default()
        };
        self.state.status = CallbackStatus::Running;

        let outcome = drive(self.order, self.mode, nodes, hooks, iterations, start);

        self.state = match (outcome.report.status, outcome.paused_at) {
            (Err(Status::PausedScheduler), Some(position)) => CallbackState {
                status: CallbackStatus::Paused,
                nb_sched: outcome.report.iterations,
                schedule_state_id: position,
            },
            _ => CallbackState::default(),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?self.state, "pausable scheduler returned");
        outcome.report
    }
}
