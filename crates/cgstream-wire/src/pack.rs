//! Event serialization.

use cgstream_core::MemServer;
use cgstream_core::event::{AnyTensor, BufferData, Event, EventData, RawBuffer, Tensor, TensorData, Value};
use cgstream_core::memserver::Descriptor;

use crate::error::WireError;
use crate::tag::{BufferKind, Element, KIND_LIST, KIND_SINGLE, ValueTag};

/// Serializes events addressed to a node.
///
/// A packer without memory server rejects shared buffers, unless it packs
/// for the network, in which case descriptors are written without taking a
/// reference.
///
/// A record that fails to pack leaves no trace: its bytes are dropped and
/// the shared buffers it had acquired are released.
#[derive(Default)]
pub struct Packer<'a> {
    out: Vec<u8>,
    mem_server: Option<&'a dyn MemServer>,
    network: bool,
    // Shared buffers acquired by the record being packed.
    acquired: Vec<i32>,
}

impl core::fmt::Debug for Packer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Packer")
            .field("len", &self.out.len())
            .field("mem_server", &self.mem_server.is_some())
            .field("network", &self.network)
            .finish()
    }
}

impl<'a> Packer<'a> {
    /// Creates a packer for in-process buffers only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `server` to acquire shared buffers.
    pub fn with_mem_server(mut self, server: &'a dyn MemServer) -> Self {
        self.mem_server = Some(server);
        self
    }

    /// Packs for a remote peer: shared buffers are not acquired.
    pub fn for_network(mut self) -> Self {
        self.network = true;
        self
    }

    /// Bytes packed so far.
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    /// Consumes the packer, returning the packed bytes.
    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    /// Appends one `(node id, event)` record.
    pub fn pack(&mut self, node_id: u32, event: &Event) -> Result<(), WireError> {
        let start = self.out.len();
        self.acquired.clear();
        let result = self.pack_event(node_id, event);
        if result.is_err() {
            self.out.truncate(start);
            self.release_acquired();
        }
        result
    }

    fn release_acquired(&mut self) {
        let Some(server) = self.mem_server else {
            return;
        };
        for global_id in self.acquired.drain(..) {
            if let Err(e) = server.release(global_id) {
                tracing::warn!(global_id, error = %e, "could not release shared buffer of a dropped record");
            }
        }
    }

    fn pack_event(&mut self, node_id: u32, event: &Event) -> Result<(), WireError> {
        node_id.put(&mut self.out);
        event.event_id.put(&mut self.out);
        self.out.push(event.priority as u8);
        match &event.data {
            EventData::Single(value) => {
                self.out.push(KIND_SINGLE);
                self.pack_value(value)
            }
            EventData::List(list) => {
                self.out.push(KIND_LIST);
                (list.len() as u32).put(&mut self.out);
                list.values().iter().try_for_each(|v| self.pack_value(v))
            }
        }
    }

    fn tag(&mut self, tag: ValueTag) {
        self.out.push(tag as u8);
    }

    fn scalar<T: Element>(&mut self, v: T) {
        self.tag(T::TAG);
        v.put(&mut self.out);
    }

    fn pack_value(&mut self, value: &Value) -> Result<(), WireError> {
        match value {
            Value::None => self.tag(ValueTag::None),
            Value::I8(v) => self.scalar(*v),
            Value::I16(v) => self.scalar(*v),
            Value::I32(v) => self.scalar(*v),
            Value::I64(v) => self.scalar(*v),
            Value::U8(v) => self.scalar(*v),
            Value::U16(v) => self.scalar(*v),
            Value::U32(v) => self.scalar(*v),
            Value::U64(v) => self.scalar(*v),
            Value::F32(v) => self.scalar(*v),
            Value::F64(v) => self.scalar(*v),
            Value::Str(s) => {
                self.tag(ValueTag::Str);
                // Length includes a trailing NUL.
                ((s.len() + 1) as u32).put(&mut self.out);
                self.out.extend_from_slice(s.as_bytes());
                self.out.push(0);
            }
            Value::Buffer(buf) => {
                self.tag(ValueTag::Any);
                self.pack_raw(buf)?;
            }
            Value::Tensor(t) => {
                self.tag(ValueTag::Tensor);
                match t {
                    AnyTensor::U8(t) => self.pack_tensor(t)?,
                    AnyTensor::I8(t) => self.pack_tensor(t)?,
                    AnyTensor::U16(t) => self.pack_tensor(t)?,
                    AnyTensor::I16(t) => self.pack_tensor(t)?,
                    AnyTensor::U32(t) => self.pack_tensor(t)?,
                    AnyTensor::I32(t) => self.pack_tensor(t)?,
                    AnyTensor::U64(t) => self.pack_tensor(t)?,
                    AnyTensor::I64(t) => self.pack_tensor(t)?,
                    AnyTensor::F32(t) => self.pack_tensor(t)?,
                    AnyTensor::F64(t) => self.pack_tensor(t)?,
                }
            }
        }
        Ok(())
    }

    fn pack_raw(&mut self, buf: &RawBuffer) -> Result<(), WireError> {
        match buf.data() {
            BufferData::Owned(bytes) => {
                self.out.push(BufferKind::Copy as u8);
                (bytes.len() as u32).put(&mut self.out);
                self.out.extend_from_slice(bytes);
                Ok(())
            }
            BufferData::Shared(desc) => {
                self.out.push(BufferKind::Shared as u8);
                self.pack_shared(*desc, desc.size)
            }
        }
    }

    fn pack_tensor<T: Element>(&mut self, t: &Tensor<T>) -> Result<(), WireError> {
        let size = t.size().filter(|&n| n <= u32::MAX as usize).ok_or(WireError::TensorTooLarge)?;
        self.out.push(t.nb_dims);
        (t.dims.len() as u32).put(&mut self.out);
        for d in t.dims {
            d.put(&mut self.out);
        }
        self.tag(T::TAG);
        match &t.data {
            TensorData::Owned(elements) => {
                // Element count comes from the shape, not the storage.
                let elements = elements.get(..size).ok_or(WireError::ShapeMismatch {
                    expected: size,
                    found: elements.len(),
                })?;
                self.out.push(BufferKind::Copy as u8);
                (size as u32).put(&mut self.out);
                for &e in elements {
                    e.put(&mut self.out);
                }
                Ok(())
            }
            TensorData::Shared(desc) => {
                self.out.push(BufferKind::Shared as u8);
                self.pack_shared(*desc, size)
            }
        }
    }

    fn pack_shared(&mut self, desc: Descriptor, len: usize) -> Result<(), WireError> {
        if !self.network {
            let server = self.mem_server.ok_or(WireError::MissingMemServer)?;
            server.acquire(desc.global_id)?;
            self.acquired.push(desc.global_id);
        }
        (len as u32).put(&mut self.out);
        desc.global_id.put(&mut self.out);
        Ok(())
    }
}

/// Packs a single event for an in-process peer.
pub fn pack(node_id: u32, event: &Event) -> Result<Vec<u8>, WireError> {
    let mut packer = Packer::new();
    packer.pack(node_id, event)?;
    Ok(packer.finish())
}
