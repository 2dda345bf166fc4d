//! Generic node bases by arity, plus the built-in [`Duplicate`] node.
//!
//! Each base bundles the ports of one arity pattern and provides a
//! `prepare()` returning [`Status::SkipExecution`] when any input would
//! underflow or any output would overflow. Concrete nodes embed a base and
//! forward [`Node::prepare_for_running`] to it:
//!
//! ```rust
//! use cgstream_core::{GenericSink, Node, NodeResult};
//!
//! struct Printer {
//!     io: GenericSink<i16>,
//! }
//!
//! impl Node for Printer {
//!     fn prepare_for_running(&mut self) -> NodeResult {
//!         self.io.prepare()
//!     }
//!
//!     fn run(&mut self) -> NodeResult {
//!         let block = self.io.input.read()?;
//!         let _sum: i32 = block.iter().map(|&s| i32::from(s)).sum();
//!         Ok(())
//!     }
//! }
//! ```
//!
//! | Base | Inputs | Outputs |
//! |------|--------|---------|
//! | [`GenericSource`] | 0 | 1 |
//! | [`GenericSink`] | 1 | 0 |
//! | [`GenericNode`] | 1 | 1 |
//! | [`GenericNode12`] | 1 | 2 |
//! | [`GenericNode13`] | 1 | 3 |
//! | [`GenericNode21`] | 2 | 1 |
//! | [`GenericToManyNode`] | 1 | N |
//! | [`GenericFromManyNode`] | N | 1 |
//! | [`GenericManyToManyNode`] | N | M |

use alloc::rc::Rc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::fifo::EdgeRef;
use crate::node::{Input, Node, NodeIdentity, Output};
use crate::status::{NodeResult, Status};

#[inline]
fn skip_if(blocked: bool) -> NodeResult {
    if blocked {
        Err(Status::SkipExecution)
    } else {
        Ok(())
    }
}

/// Source base: one output, no input.
pub struct GenericSource<O> {
    /// Output port.
    pub output: Output<O>,
}

impl<O: 'static> GenericSource<O> {
    /// Creates a source producing `samples` per run.
    pub fn new(output: EdgeRef<O>, samples: usize) -> Self {
        Self {
            output: Output::new(output, samples),
        }
    }

    /// Skips when the output lacks room.
    pub fn prepare(&self) -> NodeResult {
        skip_if(self.output.will_overflow())
    }
}

/// Sink base: one input, no output.
pub struct GenericSink<I> {
    /// Input port.
    pub input: Input<I>,
}

impl<I: 'static> GenericSink<I> {
    /// Creates a sink consuming `samples` per run.
    pub fn new(input: EdgeRef<I>, samples: usize) -> Self {
        Self {
            input: Input::new(input, samples),
        }
    }

    /// Skips when the input lacks data.
    pub fn prepare(&self) -> NodeResult {
        skip_if(self.input.will_underflow())
    }
}

/// One input, one output.
pub struct GenericNode<I, O> {
    /// Input port.
    pub input: Input<I>,
    /// Output port.
    pub output: Output<O>,
}

impl<I: 'static, O: 'static> GenericNode<I, O> {
    /// Creates a 1-to-1 base.
    pub fn new(input: EdgeRef<I>, in_samples: usize, output: EdgeRef<O>, out_samples: usize) -> Self {
        Self {
            input: Input::new(input, in_samples),
            output: Output::new(output, out_samples),
        }
    }

    /// Skips on input underflow or output overflow.
    pub fn prepare(&self) -> NodeResult {
        skip_if(self.input.will_underflow() || self.output.will_overflow())
    }
}

/// One input, two outputs.
pub struct GenericNode12<I, O1, O2> {
    /// Input port.
    pub input: Input<I>,
    /// First output.
    pub output1: Output<O1>,
    /// Second output.
    pub output2: Output<O2>,
}

impl<I: 'static, O1: 'static, O2: 'static> GenericNode12<I, O1, O2> {
    /// Creates a 1-to-2 base from ports.
    pub fn new(input: Input<I>, output1: Output<O1>, output2: Output<O2>) -> Self {
        Self {
            input,
            output1,
            output2,
        }
    }

    /// Skips on input underflow or overflow of either output.
    pub fn prepare(&self) -> NodeResult {
        skip_if(
            self.input.will_underflow() || self.output1.will_overflow() || self.output2.will_overflow(),
        )
    }
}

/// One input, three outputs.
pub struct GenericNode13<I, O1, O2, O3> {
    /// Input port.
    pub input: Input<I>,
    /// First output.
    pub output1: Output<O1>,
    /// Second output.
    pub output2: Output<O2>,
    /// Third output.
    pub output3: Output<O3>,
}

impl<I: 'static, O1: 'static, O2: 'static, O3: 'static> GenericNode13<I, O1, O2, O3> {
    /// Creates a 1-to-3 base from ports.
    pub fn new(input: Input<I>, output1: Output<O1>, output2: Output<O2>, output3: Output<O3>) -> Self {
        Self {
            input,
            output1,
            output2,
            output3,
        }
    }

    /// Skips on input underflow or overflow of any output.
    pub fn prepare(&self) -> NodeResult {
        skip_if(
            self.input.will_underflow()
                || self.output1.will_overflow()
                || self.output2.will_overflow()
                || self.output3.will_overflow(),
        )
    }
}

/// Two inputs, one output.
pub struct GenericNode21<I1, I2, O> {
    /// First input.
    pub input1: Input<I1>,
    /// Second input.
    pub input2: Input<I2>,
    /// Output port.
    pub output: Output<O>,
}

impl<I1: 'static, I2: 'static, O: 'static> GenericNode21<I1, I2, O> {
    /// Creates a 2-to-1 base from ports.
    pub fn new(input1: Input<I1>, input2: Input<I2>, output: Output<O>) -> Self {
        Self {
            input1,
            input2,
            output,
        }
    }

    /// Skips on underflow of either input or output overflow.
    pub fn prepare(&self) -> NodeResult {
        skip_if(
            self.input1.will_underflow() || self.input2.will_underflow() || self.output.will_overflow(),
        )
    }
}

/// One input, any number of outputs of the same type.
pub struct GenericToManyNode<I, O> {
    /// Input port.
    pub input: Input<I>,
    /// Output ports.
    pub outputs: Vec<Output<O>>,
}

impl<I: 'static, O: 'static> GenericToManyNode<I, O> {
    /// Creates a 1-to-N base from ports.
    pub fn new(input: Input<I>, outputs: Vec<Output<O>>) -> Self {
        Self { input, outputs }
    }

    /// Skips on input underflow or overflow of any output.
    pub fn prepare(&self) -> NodeResult {
        skip_if(self.input.will_underflow() || self.outputs.iter().any(Output::will_overflow))
    }
}

/// Any number of inputs of the same type, one output.
pub struct GenericFromManyNode<I, O> {
    /// Input ports.
    pub inputs: Vec<Input<I>>,
    /// Output port.
    pub output: Output<O>,
}

impl<I: 'static, O: 'static> GenericFromManyNode<I, O> {
    /// Creates an N-to-1 base from ports.
    pub fn new(inputs: Vec<Input<I>>, output: Output<O>) -> Self {
        Self { inputs, output }
    }

    /// Skips on underflow of any input or output overflow.
    pub fn prepare(&self) -> NodeResult {
        skip_if(self.inputs.iter().any(Input::will_underflow) || self.output.will_overflow())
    }
}

/// Any number of inputs and outputs.
pub struct GenericManyToManyNode<I, O> {
    /// Input ports.
    pub inputs: Vec<Input<I>>,
    /// Output ports.
    pub outputs: Vec<Output<O>>,
}

impl<I: 'static, O: 'static> GenericManyToManyNode<I, O> {
    /// Creates an N-to-M base from ports.
    pub fn new(inputs: Vec<Input<I>>, outputs: Vec<Output<O>>) -> Self {
        Self { inputs, outputs }
    }

    /// Skips on underflow of any input or overflow of any output.
    pub fn prepare(&self) -> NodeResult {
        skip_if(
            self.inputs.iter().any(Input::will_underflow)
                || self.outputs.iter().any(Output::will_overflow),
        )
    }
}

/// Copies one input block to every output.
///
/// All ports move the same number of samples per run. In asynchronous mode
/// the node is skipped unless the input has a full block and every output
/// has room for one, so a skipped run never leaves some outputs written and
/// others not.
pub struct Duplicate<T> {
    io: GenericToManyNode<T, T>,
    id: NodeIdentity,
}

impl<T: Copy + 'static> Duplicate<T> {
    /// Creates a duplicator moving `samples` per run.
    pub fn new(input: EdgeRef<T>, samples: usize, outputs: Vec<EdgeRef<T>>) -> Self {
        let outputs = outputs
            .into_iter()
            .map(|edge| Output::new(edge, samples))
            .collect();
        Self {
            io: GenericToManyNode::new(Input::new(input, samples), outputs),
            id: NodeIdentity::default(),
        }
    }

    /// Number of outputs.
    pub fn fan_out(&self) -> usize {
        self.io.outputs.len()
    }
}

impl<T: Copy + 'static> Node for Duplicate<T> {
    fn prepare_for_running(&mut self) -> NodeResult {
        self.io.prepare()
    }

    fn run(&mut self) -> NodeResult {
        // Every output must be writable before the block is consumed.
        let input = self.io.input.edge();
        if self
            .io
            .outputs
            .iter()
            .any(|o| Rc::ptr_eq(o.edge(), input) || o.edge().try_borrow_mut().is_err())
        {
            return Err(Status::BufferError);
        }
        let block = self.io.input.read()?;
        for output in &self.io.outputs {
            output.write()?.copy_from_slice(&block);
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
