//! Pause rendezvous with the dataflow thread.
//!
//! A controlling thread requests a pause; the dataflow thread acknowledges
//! it at the end of the current iteration and blocks until resumed. Used
//! together with [`EventQueue::pause_and_wait`](crate::queue::EventQueue::pause_and_wait)
//! it freezes both threads of a graph at a known point.

use core::ops::ControlFlow;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::hooks::{HookFlow, SchedulerHooks};

/// Where the dataflow thread stands with respect to a pause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GateState {
    /// Iterations run freely.
    #[default]
    Running,
    /// A pause was asked for and not yet acknowledged.
    PauseRequested,
    /// The dataflow thread is parked between two iterations.
    Paused,
}

/// Shared handle between the dataflow thread and a controller.
///
/// Pass `&gate` as scheduler hooks (or call [`checkpoint`](Self::checkpoint)
/// from your own `after_iteration`) on the dataflow side.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use cgstream_core::scheduler::{GateState, PauseGate};
///
/// let gate = Arc::new(PauseGate::new());
/// gate.request_pause();
/// // No dataflow thread reached a checkpoint yet.
/// assert!(!gate.wait_paused(Duration::from_millis(1)));
/// assert_eq!(gate.state(), GateState::PauseRequested);
/// gate.resume();
/// assert_eq!(gate.state(), GateState::Running);
/// ```
#[derive(Debug, Default)]
pub struct PauseGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl PauseGate {
    /// Creates a gate in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        *self.state.lock()
    }

    /// Asks the dataflow thread to stop after its current iteration.
    pub fn request_pause(&self) {
        let mut state = self.state.lock();
        if *state == GateState::Running {
            *state = GateState::PauseRequested;
        }
    }

    /// Waits up to `timeout` for the dataflow thread to acknowledge a pause.
    ///
    /// Returns `true` once it is parked.
    pub fn wait_paused(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state == GateState::PauseRequested {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state == GateState::Paused
    }

    /// Lets the dataflow thread continue, or cancels a pending request.
    pub fn resume(&self) {
        *self.state.lock() = GateState::Running;
        self.changed.notify_all();
    }

    /// Dataflow side: acknowledges a pending pause and blocks until resumed.
    ///
    /// Returns `true` if the thread was parked.
    pub fn checkpoint(&self) -> bool {
        let mut state = self.state.lock();
        if *state != GateState::PauseRequested {
            return false;
        }
        *state = GateState::Paused;
        self.changed.notify_all();
        #[cfg(feature = "tracing")]
        tracing::debug!("dataflow thread paused");
        while *state == GateState::Paused {
            self.changed.wait(&mut state);
        }
        true
    }
}

impl SchedulerHooks for &PauseGate {
    fn after_iteration(&mut self, _iteration: u32) -> HookFlow {
        self.checkpoint();
        ControlFlow::Continue(())
    }
}
