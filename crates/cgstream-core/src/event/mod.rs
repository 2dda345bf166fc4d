//! Events exchanged between nodes outside the dataflow FIFOs.
//!
//! An [`Event`] carries an identifier, a [`Priority`], an optional
//! time-to-live and a payload of zero, one or up to [`CG_MAX_VALUES`]
//! values. Events are move-only: passing one on transfers it, and
//! [`Event::take`] leaves an empty event ([`K_NO_EVENT`]) in the source.
//! [`Event::clone_event`] makes a copy that shares list payloads.
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::event::{Event, Priority, K_VALUE};
//!
//! let event = Event::with_args(K_VALUE, Priority::High, (0.5f32, 3i32));
//! let mut applied = None;
//! assert!(event.apply(|(gain, offset): (f32, i32)| applied = Some((gain, offset))));
//! assert_eq!(applied, Some((0.5, 3)));
//!
//! // A value of the wrong shape is rejected without calling the handler.
//! assert!(!event.apply(|_: (f32,)| unreachable!()));
//! ```

mod args;
pub mod parse;
pub mod value;

use alloc::sync::Arc;
use core::time::Duration;

pub use args::{EventArgs, IntoEventData};
pub use parse::ValueParse;
pub use value::{
    AnyTensor, BufferData, BufferPtr, CG_TENSOR_NB_DIMS, RawBuffer, Tensor, TensorData, TensorDims, Value, shape_size,
};

/// Maximum number of values in a list payload.
pub const CG_MAX_VALUES: usize = 8;

/// Identifier of an empty (moved-from or default) event.
pub const K_NO_EVENT: u32 = 0;
/// Asks a node to act, typically to emit its current output.
pub const K_DO: u32 = 1;
/// Pauses the receiving node.
pub const K_PAUSE: u32 = 2;
/// Resumes the receiving node after a pause.
pub const K_RESUME: u32 = 3;
/// Requests the value of a parameter.
pub const K_GET_PARAM: u32 = 5;
/// Carries a value.
pub const K_VALUE: u32 = 6;
/// Asks the application to stop the graph.
pub const K_STOP_GRAPH: u32 = 7;
/// Debug traffic.
pub const K_DEBUG: u32 = 8;
/// Node initialization is starting.
pub const K_START_NODE_INITIALIZATION: u32 = 9;
/// A node finished initializing.
pub const K_NODE_WAS_INITIALIZED: u32 = 10;
/// A node is about to be destroyed.
pub const K_NODE_WILL_BE_DESTROYED: u32 = 11;
/// A node released its resources.
pub const K_NODE_READY_TO_BE_DESTROYED: u32 = 12;
/// First identifier free for node-specific selectors.
pub const K_SELECTOR: u32 = 100;

/// Delivery priority. Higher priorities are always served first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Background traffic.
    Low = 0,
    /// Regular traffic.
    #[default]
    Normal = 1,
    /// Urgent traffic.
    High = 2,
}

/// Number of priority levels.
pub const NB_PRIORITIES: usize = 3;

impl Priority {
    /// All priorities from highest to lowest.
    pub const DESCENDING: [Priority; NB_PRIORITIES] = [Priority::High, Priority::Normal, Priority::Low];

    /// Converts a raw priority. Unknown values map to `Normal`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Priority::Low,
            2 => Priority::High,
            _ => Priority::Normal,
        }
    }

    /// Index of the priority (0 for `Low`).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Fixed-capacity list of values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListValue {
    nb_values: usize,
    values: [Value; CG_MAX_VALUES],
}

impl ListValue {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, handing it back if the list is full.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        if self.nb_values == CG_MAX_VALUES {
            return Err(value);
        }
        self.values[self.nb_values] = value;
        self.nb_values += 1;
        Ok(())
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.nb_values
    }

    /// Returns `true` if the list holds no values.
    pub fn is_empty(&self) -> bool {
        self.nb_values == 0
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values().get(index)
    }

    /// Stored values.
    pub fn values(&self) -> &[Value] {
        &self.values[..self.nb_values]
    }
}

impl FromIterator<Value> for ListValue {
    /// Collects up to [`CG_MAX_VALUES`] values; the rest are dropped.
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut list = ListValue::new();
        for value in iter.into_iter().take(CG_MAX_VALUES) {
            list.values[list.nb_values] = value;
            list.nb_values += 1;
        }
        list
    }
}

/// Payload of an event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    /// A single value, possibly [`Value::None`].
    Single(Value),
    /// Several values shared between clones.
    List(Arc<ListValue>),
}

impl Default for EventData {
    fn default() -> Self {
        EventData::Single(Value::None)
    }
}

/// A prioritized, typed message.
#[derive(Debug, Default, PartialEq)]
pub struct Event {
    /// Identifier, [`K_NO_EVENT`] when empty.
    pub event_id: u32,
    /// Delivery priority.
    pub priority: Priority,
    /// Payload.
    pub data: EventData,
    /// Maximum time the event may wait in a queue.
    pub ttl: Option<Duration>,
}

impl Event {
    /// Creates an event without payload.
    pub fn new(event_id: u32, priority: Priority) -> Self {
        Self {
            event_id,
            priority,
            data: EventData::default(),
            ttl: None,
        }
    }

    /// Creates an event carrying a single value.
    pub fn with_value(event_id: u32, priority: Priority, value: impl Into<Value>) -> Self {
        Self {
            data: EventData::Single(value.into()),
            ..Self::new(event_id, priority)
        }
    }

    /// Creates an event carrying a shared list.
    pub fn with_list(event_id: u32, priority: Priority, list: Arc<ListValue>) -> Self {
        Self {
            data: EventData::List(list),
            ..Self::new(event_id, priority)
        }
    }

    /// Creates an event from a tuple of values.
    ///
    /// `()` gives no payload, a 1-tuple a single value and longer tuples a
    /// list.
    pub fn with_args<A: IntoEventData>(event_id: u32, priority: Priority, args: A) -> Self {
        Self {
            data: args.into_data(),
            ..Self::new(event_id, priority)
        }
    }

    /// Sets the time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the priority from a raw value, unknown values mapping to `Normal`.
    pub fn set_priority(&mut self, raw: u32) {
        self.priority = Priority::from_raw(raw);
    }

    /// Returns `true` unless the event is empty.
    pub fn is_some(&self) -> bool {
        self.event_id != K_NO_EVENT
    }

    /// Moves the event out, leaving an empty event behind.
    pub fn take(&mut self) -> Event {
        core::mem::take(self)
    }

    /// Copies the event. List payloads are shared, not duplicated.
    pub fn clone_event(&self) -> Event {
        Self {
            event_id: self.event_id,
            priority: self.priority,
            data: self.data.clone(),
            ttl: self.ttl,
        }
    }

    /// Number of payload values.
    pub fn nb_values(&self) -> usize {
        match &self.data {
            EventData::Single(Value::None) => 0,
            EventData::Single(_) => 1,
            EventData::List(list) => list.len(),
        }
    }

    /// Returns `true` if the payload is a single value readable as `T`.
    pub fn contains<T: ValueParse>(&self) -> bool {
        match &self.data {
            EventData::Single(v) => T::contains(v),
            EventData::List(_) => false,
        }
    }

    /// Reads a single-value payload as `T`, or `T`'s default on mismatch.
    pub fn get<T: ValueParse + Default>(&self) -> T {
        match &self.data {
            EventData::Single(v) => T::get_value(v),
            EventData::List(_) => T::default(),
        }
    }

    /// Returns `true` if the payload has the shape `A`.
    pub fn well_formed<A: EventArgs>(&self) -> bool {
        A::well_formed(&self.data)
    }

    /// Calls `f` with the payload read as `A` if it is well formed.
    ///
    /// Returns whether `f` was called.
    pub fn apply<A: EventArgs>(&self, f: impl FnOnce(A)) -> bool {
        if !A::well_formed(&self.data) {
            return false;
        }
        f(A::extract(&self.data));
        true
    }
}

/// A node that accepts events.
///
/// Receivers are shared with the event queue, so processing uses interior
/// mutability and may run on the queue thread.
pub trait EventReceiver: Send + Sync {
    /// Handles an event arriving on `port`.
    fn process_event(&self, port: u32, event: Event);
}
