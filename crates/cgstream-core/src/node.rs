//! Node execution contract and typed ports.
//!
//! A node is anything the scheduler can invoke: [`Node::run`] does the work,
//! [`Node::prepare_for_running`] tells an asynchronous scheduler whether the
//! work is possible right now. Nodes never own FIFOs; they hold shared
//! [`EdgeRef`] handles wrapped in [`Input`] and [`Output`] ports that also
//! remember how many samples one run consumes or produces.
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::{Fifo, Input, Node, NodeResult, Output, edge_ref};
//!
//! struct Gain {
//!     input: Input<f32>,
//!     output: Output<f32>,
//! }
//!
//! impl Node for Gain {
//!     fn run(&mut self) -> NodeResult {
//!         let src = self.input.read()?;
//!         let mut dst = self.output.write()?;
//!         for (o, i) in dst.iter_mut().zip(src.iter()) {
//!             *o = 2.0 * *i;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let a = edge_ref(Fifo::<f32>::with_capacity(4, 4));
//! let b = edge_ref(Fifo::<f32>::with_capacity(4, 0));
//! let mut gain = Gain { input: Input::new(a, 4), output: Output::new(b.clone(), 4) };
//! gain.run().unwrap();
//! assert_eq!(b.borrow().nb_samples_in_fifo(), 4);
//! ```

use core::cell::RefMut;

use crate::fifo::{Edge, EdgeRef};
use crate::status::{CG_UNIDENTIFIED_NODE, NodeResult, Status};

/// A unit of computation invoked by a scheduler.
pub trait Node {
    /// Performs one execution: consumes and produces the declared amounts.
    fn run(&mut self) -> NodeResult;

    /// Checks whether [`run`](Self::run) can execute now.
    ///
    /// Only called in asynchronous mode. Returns
    /// `Err(Status::SkipExecution)` when inputs lack data or outputs lack
    /// room. The default accepts unconditionally.
    fn prepare_for_running(&mut self) -> NodeResult {
        Ok(())
    }

    /// Identifier exposed to the outside world, `-1` when unidentified.
    fn node_id(&self) -> i32 {
        CG_UNIDENTIFIED_NODE
    }

    /// Assigns the external identifier. Ignored by nodes that do not store it.
    fn set_id(&mut self, _id: i32) {}
}

impl<N: Node + ?Sized> Node for alloc::boxed::Box<N> {
    fn run(&mut self) -> NodeResult {
        (**self).run()
    }

    fn prepare_for_running(&mut self) -> NodeResult {
        (**self).prepare_for_running()
    }

    fn node_id(&self) -> i32 {
        (**self).node_id()
    }

    fn set_id(&mut self, id: i32) {
        (**self).set_id(id);
    }
}

/// Storage for the external identifier, for nodes that want one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeIdentity(i32);

impl NodeIdentity {
    /// Returns the stored id.
    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }

    /// Stores a new id.
    #[inline]
    pub fn set(&mut self, id: i32) {
        self.0 = id;
    }
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self(CG_UNIDENTIFIED_NODE)
    }
}

fn borrow_edge<T: 'static>(
    edge: &EdgeRef<T>,
) -> Result<RefMut<'_, dyn Edge<T> + 'static>, Status> {
    edge.try_borrow_mut().map_err(|_| Status::BufferError)
}

/// Consuming side of an edge with a fixed per-run sample count.
pub struct Input<T> {
    edge: EdgeRef<T>,
    samples: usize,
}

impl<T: 'static> Input<T> {
    /// Creates a port reading `samples` per run from `edge`.
    pub fn new(edge: EdgeRef<T>, samples: usize) -> Self {
        Self { edge, samples }
    }

    /// Samples consumed per run.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Underlying edge handle.
    pub fn edge(&self) -> &EdgeRef<T> {
        &self.edge
    }

    /// Reads the declared number of samples.
    ///
    /// Unchecked like [`Edge::get_read_buffer`](crate::Edge::get_read_buffer).
    /// Fails with [`Status::BufferError`] only if the edge is already borrowed.
    pub fn read(&self) -> Result<RefMut<'_, [T]>, Status> {
        self.read_n(self.samples)
    }

    /// Reads `nb` samples, for variable-rate nodes.
    pub fn read_n(&self, nb: usize) -> Result<RefMut<'_, [T]>, Status> {
        let edge = borrow_edge(&self.edge)?;
        Ok(RefMut::map(edge, |e| e.get_read_buffer(nb)))
    }

    /// Returns `true` if a declared read would underflow.
    ///
    /// A borrowed edge counts as underflowing.
    pub fn will_underflow(&self) -> bool {
        self.edge
            .try_borrow()
            .map(|e| e.will_underflow_with(self.samples))
            .unwrap_or(true)
    }

    /// Samples currently buffered.
    pub fn available(&self) -> usize {
        self.edge
            .try_borrow()
            .map(|e| e.nb_samples_in_fifo())
            .unwrap_or(0)
    }
}

/// Producing side of an edge with a fixed per-run sample count.
pub struct Output<T> {
    edge: EdgeRef<T>,
    samples: usize,
}

impl<T: 'static> Output<T> {
    /// Creates a port writing `samples` per run into `edge`.
    pub fn new(edge: EdgeRef<T>, samples: usize) -> Self {
        Self { edge, samples }
    }

    /// Samples produced per run.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Underlying edge handle.
    pub fn edge(&self) -> &EdgeRef<T> {
        &self.edge
    }

    /// Reserves the declared number of slots.
    pub fn write(&self) -> Result<RefMut<'_, [T]>, Status> {
        self.write_n(self.samples)
    }

    /// Reserves `nb` slots, for variable-rate nodes.
    pub fn write_n(&self, nb: usize) -> Result<RefMut<'_, [T]>, Status> {
        let edge = borrow_edge(&self.edge)?;
        Ok(RefMut::map(edge, |e| e.get_write_buffer(nb)))
    }

    /// Returns `true` if a declared write would overflow.
    ///
    /// A borrowed edge counts as overflowing.
    pub fn will_overflow(&self) -> bool {
        self.edge
            .try_borrow()
            .map(|e| e.will_overflow_with(self.samples))
            .unwrap_or(true)
    }

    /// Free slots currently available.
    pub fn free(&self) -> usize {
        self.edge
            .try_borrow()
            .map(|e| e.nb_of_free_samples_in_fifo())
            .unwrap_or(0)
    }
}
