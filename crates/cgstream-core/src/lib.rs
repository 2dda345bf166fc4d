//! cgstream core - static dataflow runtime primitives
//!
//! This crate runs synchronous dataflow graphs whose execution order was
//! computed offline. Nodes exchange samples through fixed-size FIFOs and
//! control messages through a prioritized event queue.
//!
//! # Core Abstractions
//!
//! ## Dataflow
//!
//! - [`Edge`] - FIFO behaviour shared by [`Fifo`] and [`PlainBuffer`]
//! - [`Input`] / [`Output`] - Typed node ports with a fixed sample rate
//! - [`Node`] - Object-safe trait every schedulable node implements
//! - [`GenericNode`] and friends - Port layouts for common node shapes
//! - [`Duplicate`] - Copies one input to several outputs
//!
//! ## Scheduling
//!
//! - [`StaticScheduler`] - Walks the precomputed schedule (sync or async)
//! - [`PausableScheduler`] - Resumes at the node that paused
//! - [`SchedulerHooks`] - Observation points around every transition
//! - [`verify_schedule`] - Offline FIFO capacity check of a schedule
//!
//! ## Events
//!
//! - [`event::Event`] - Prioritized, typed message with optional TTL
//! - [`event::Value`] - Closed set of payload types with a widening lattice
//! - [`queue::EventQueue`] - Strict-priority queue and dispatch loop (std)
//! - [`output::EventOutput`] - Fan-out publisher (std)
//! - [`MemServer`] - Interface to shared-memory buffer owners
//!
//! # no_std Support
//!
//! FIFOs, nodes, schedulers and the event value model work without `std`.
//! The event queue, the publisher and [`LocalMemServer`] need it:
//!
//! ```toml
//! [dependencies]
//! cgstream-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::{Fifo, GenericSink, Node, NodeResult, Output, edge_ref};
//!
//! struct Counter {
//!     out: Output<u32>,
//!     next: u32,
//! }
//!
//! impl Node for Counter {
//!     fn run(&mut self) -> NodeResult {
//!         for slot in self.out.write()?.iter_mut() {
//!             *slot = self.next;
//!             self.next += 1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let fifo = edge_ref(Fifo::<u32>::with_capacity(4, 0));
//! let mut source = Counter { out: Output::new(fifo.clone(), 2), next: 0 };
//! let sink = GenericSink::new(fifo.clone(), 2);
//!
//! source.run().unwrap();
//! assert_eq!(&*sink.input.read().unwrap(), &[0, 1]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod event;
pub mod fifo;
pub mod generic;
pub mod memserver;
pub mod node;
#[cfg(feature = "std")]
pub mod output;
#[cfg(feature = "std")]
pub mod queue;
pub mod scheduler;
pub mod status;

pub use event::{Event, EventReceiver, Priority, Value};
pub use fifo::{Edge, EdgeRef, Fifo, PlainBuffer, edge_ref};
pub use generic::{
    Duplicate, GenericFromManyNode, GenericManyToManyNode, GenericNode, GenericNode12, GenericNode13, GenericNode21,
    GenericSink, GenericSource, GenericToManyNode,
};
#[cfg(feature = "std")]
pub use memserver::LocalMemServer;
pub use memserver::{Descriptor, MemError, MemServer};
pub use node::{Input, Node, NodeIdentity, Output};
#[cfg(feature = "std")]
pub use output::EventOutput;
#[cfg(feature = "std")]
pub use queue::{EventQueue, EventThread, Message};
pub use scheduler::{
    CallbackState, CallbackStatus, FifoSpec, NodeRates, PausableScheduler, RunReport, ScheduleError, ScheduleMode,
    SchedulerHooks, StaticScheduler, verify_schedule,
};
#[cfg(feature = "std")]
pub use scheduler::{GateState, PauseGate};
pub use status::{CG_SUCCESS, CG_UNIDENTIFIED_NODE, NodeResult, Status, result_from_code, status_code};
