//! Event deserialization.

use std::sync::Arc;

use cgstream_core::MemServer;
use cgstream_core::event::{
    CG_MAX_VALUES, CG_TENSOR_NB_DIMS, Event, K_DO, ListValue, Priority, RawBuffer, Tensor, TensorDims, Value,
    shape_size,
};
use cgstream_core::memserver::Descriptor;

use crate::error::WireError;
use crate::tag::{BufferKind, Element, KIND_LIST, KIND_SINGLE, ValueTag};

/// Reads `(node id, event)` records from a byte slice.
///
/// Records can be concatenated; call [`unpack`](Self::unpack) until
/// [`is_empty`](Self::is_empty).
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
    mem_server: Option<&'a dyn MemServer>,
}

impl core::fmt::Debug for Unpacker<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Unpacker")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .field("mem_server", &self.mem_server.is_some())
            .finish()
    }
}

impl<'a> Unpacker<'a> {
    /// Reads from `data`; shared buffers are rejected.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            mem_server: None,
        }
    }

    /// Resolves shared buffers through `server`.
    pub fn with_mem_server(mut self, server: &'a dyn MemServer) -> Self {
        self.mem_server = Some(server);
        self
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` when every byte was consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads the next record.
    ///
    /// An unknown payload kind yields a bare [`K_DO`] event with the decoded
    /// priority. An unknown priority decodes as `Normal`.
    pub fn unpack(&mut self) -> Result<(u32, Event), WireError> {
        let node_id: u32 = self.read()?;
        let event_id: u32 = self.read()?;
        let priority = Priority::from_raw(u32::from(self.byte()?));
        let kind = self.byte()?;

        let event = match kind {
            KIND_SINGLE => Event::with_value(event_id, priority, self.value()?),
            KIND_LIST => {
                let count: u32 = self.read()?;
                if count as usize > CG_MAX_VALUES {
                    return Err(WireError::TooManyValues(count));
                }
                let mut list = ListValue::new();
                for _ in 0..count {
                    let v = self.value()?;
                    // Cannot overflow: count was bounded above.
                    let _ = list.push(v);
                }
                Event::with_list(event_id, priority, Arc::new(list))
            }
            other => {
                tracing::debug!(kind = other, event_id, "unknown payload kind, decoding as do");
                Event::new(K_DO, priority)
            }
        };
        Ok((node_id, event))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(WireError::Truncated {
                offset: self.pos,
                needed: n,
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn read<T: Element>(&mut self) -> Result<T, WireError> {
        Ok(T::get(self.take(T::SIZE)?))
    }

    fn value(&mut self) -> Result<Value, WireError> {
        let raw = self.byte()?;
        let tag = ValueTag::try_from(raw).map_err(WireError::UnknownValueTag)?;
        Ok(match tag {
            ValueTag::None => Value::None,
            ValueTag::Int8 => Value::I8(self.read()?),
            ValueTag::Int16 => Value::I16(self.read()?),
            ValueTag::Int32 => Value::I32(self.read()?),
            ValueTag::Int64 => Value::I64(self.read()?),
            ValueTag::Float => Value::F32(self.read()?),
            ValueTag::Double => Value::F64(self.read()?),
            ValueTag::UInt8 => Value::U8(self.read()?),
            ValueTag::UInt16 => Value::U16(self.read()?),
            ValueTag::UInt32 => Value::U32(self.read()?),
            ValueTag::UInt64 => Value::U64(self.read()?),
            ValueTag::Str => self.string()?,
            ValueTag::Any => self.raw_buffer()?,
            ValueTag::Tensor => self.tensor()?,
        })
    }

    fn string(&mut self) -> Result<Value, WireError> {
        let len: u32 = self.read()?;
        let bytes = self.take(len as usize)?;
        let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        let s = core::str::from_utf8(text).map_err(|_| WireError::InvalidUtf8)?;
        Ok(Value::Str(s.to_owned()))
    }

    fn buffer_kind(&mut self) -> Result<BufferKind, WireError> {
        let raw = self.byte()?;
        BufferKind::try_from(raw).map_err(WireError::UnknownBufferKind)
    }

    fn raw_buffer(&mut self) -> Result<Value, WireError> {
        match self.buffer_kind()? {
            BufferKind::Copy => {
                let len: u32 = self.read()?;
                let bytes = self.take(len as usize)?;
                Ok(Value::from(RawBuffer::new(bytes.to_vec())))
            }
            BufferKind::Shared => Ok(self.shared()?.map_or(Value::None, |d| Value::from(RawBuffer::shared(d)))),
        }
    }

    /// Claims a shared buffer. `None` for an empty descriptor.
    fn shared(&mut self) -> Result<Option<Descriptor>, WireError> {
        let len: u32 = self.read()?;
        let global_id: i32 = self.read()?;
        if len == 0 {
            return Ok(None);
        }
        let server = self.mem_server.ok_or(WireError::MissingMemServer)?;
        let desc = server
            .get_buffer(global_id)
            .ok_or(WireError::UnknownSharedBuffer(global_id))?;
        // The packer took a reference for the transfer; ours replaces it.
        server.release(global_id)?;
        Ok(Some(desc))
    }

    fn tensor(&mut self) -> Result<Value, WireError> {
        let nb_dims = self.byte()?;
        let declared: u32 = self.read()?;
        let mut dims: TensorDims = [0; CG_TENSOR_NB_DIMS];
        for i in 0..declared as usize {
            let d: u32 = self.read()?;
            if let Some(slot) = dims.get_mut(i) {
                *slot = d;
            }
        }
        let shape = &dims[..usize::from(nb_dims).min(CG_TENSOR_NB_DIMS)];

        let raw = self.byte()?;
        let tag = ValueTag::try_from(raw).map_err(WireError::UnknownValueTag)?;
        match tag {
            ValueTag::Int8 => self.tensor_of::<i8>(shape),
            ValueTag::Int16 => self.tensor_of::<i16>(shape),
            ValueTag::Int32 => self.tensor_of::<i32>(shape),
            ValueTag::Int64 => self.tensor_of::<i64>(shape),
            ValueTag::UInt8 => self.tensor_of::<u8>(shape),
            ValueTag::UInt16 => self.tensor_of::<u16>(shape),
            ValueTag::UInt32 => self.tensor_of::<u32>(shape),
            ValueTag::UInt64 => self.tensor_of::<u64>(shape),
            ValueTag::Float => self.tensor_of::<f32>(shape),
            ValueTag::Double => self.tensor_of::<f64>(shape),
            other => Err(WireError::UnknownValueTag(other as u8)),
        }
    }

    fn tensor_of<T: Element>(&mut self, shape: &[u32]) -> Result<Value, WireError> {
        let tensor = match self.buffer_kind()? {
            BufferKind::Copy => {
                let n: u32 = self.read()?;
                let expected = shape_size(shape).ok_or(WireError::TensorTooLarge)?;
                if expected != n as usize {
                    return Err(WireError::ShapeMismatch {
                        expected,
                        found: n as usize,
                    });
                }
                let bytes = self.take((n as usize).saturating_mul(T::SIZE))?;
                let elements: Vec<T> = bytes.chunks_exact(T::SIZE).map(T::get).collect();
                Tensor::new(shape, elements)
            }
            BufferKind::Shared => match self.shared()? {
                Some(desc) => Tensor::shared(shape, desc),
                None => return Ok(Value::None),
            },
        };
        Ok(Value::Tensor(T::wrap(tensor)))
    }
}

/// Unpacks a single record from `data`.
pub fn unpack(data: &[u8]) -> Result<(u32, Event), WireError> {
    Unpacker::new(data).unpack()
}
