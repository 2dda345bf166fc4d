//! Tagged values carried by events.

use alloc::string::String;
use alloc::sync::Arc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::memserver::Descriptor;

/// Maximum number of tensor dimensions.
pub const CG_TENSOR_NB_DIMS: usize = 8;

/// Dimension array of a tensor; only the first `nb_dims` entries are meaningful.
pub type TensorDims = [u32; CG_TENSOR_NB_DIMS];

/// Storage of an opaque byte buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferData {
    /// Bytes owned by this process.
    Owned(Vec<u8>),
    /// Buffer living in memory managed by a [`MemServer`](crate::MemServer).
    Shared(Descriptor),
}

/// Opaque byte buffer, immutable once wrapped in a [`BufferPtr`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBuffer {
    data: BufferData,
}

/// Shared handle to a raw buffer.
pub type BufferPtr = Arc<RawBuffer>;

impl RawBuffer {
    /// Wraps owned bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            data: BufferData::Owned(bytes),
        }
    }

    /// Refers to a buffer held by a memory server.
    pub fn shared(descriptor: Descriptor) -> Self {
        Self {
            data: BufferData::Shared(descriptor),
        }
    }

    /// Wraps owned bytes in a shared handle.
    pub fn into_ptr(self) -> BufferPtr {
        Arc::new(self)
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        match &self.data {
            BufferData::Owned(bytes) => bytes.len(),
            BufferData::Shared(desc) => desc.size,
        }
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage of the buffer.
    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Local bytes, `None` for a shared buffer.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.data {
            BufferData::Owned(bytes) => Some(bytes),
            BufferData::Shared(_) => None,
        }
    }

    /// Memory server descriptor, `None` for owned bytes.
    pub fn descriptor(&self) -> Option<Descriptor> {
        match &self.data {
            BufferData::Owned(_) => None,
            BufferData::Shared(desc) => Some(*desc),
        }
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Storage of tensor elements.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData<T> {
    /// Elements owned by this process, shared between clones.
    Owned(Arc<[T]>),
    /// Elements living in memory managed by a memory server.
    Shared(Descriptor),
}

/// Multi-dimensional array of `T`, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor<T> {
    /// Number of meaningful entries in `dims`.
    pub nb_dims: u8,
    /// Dimensions, innermost (columns) first.
    pub dims: TensorDims,
    /// Element storage.
    pub data: TensorData<T>,
}

fn dims_from(shape: &[u32]) -> (u8, TensorDims) {
    let mut dims = [0; CG_TENSOR_NB_DIMS];
    let nb = shape.len().min(CG_TENSOR_NB_DIMS);
    dims[..nb].copy_from_slice(&shape[..nb]);
    (nb as u8, dims)
}

/// Number of elements of a tensor with this shape: the product of the
/// dimensions, zero when there is none.
///
/// Returns `None` if the product overflows `usize`.
pub fn shape_size(shape: &[u32]) -> Option<usize> {
    if shape.is_empty() {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
}

impl<T> Tensor<T> {
    /// Creates an owned tensor. Extra dimensions beyond eight are dropped.
    pub fn new(shape: &[u32], data: impl Into<Arc<[T]>>) -> Self {
        let (nb_dims, dims) = dims_from(shape);
        Self {
            nb_dims,
            dims,
            data: TensorData::Owned(data.into()),
        }
    }

    /// Creates a tensor backed by a memory server buffer.
    pub fn shared(shape: &[u32], descriptor: Descriptor) -> Self {
        let (nb_dims, dims) = dims_from(shape);
        Self {
            nb_dims,
            dims,
            data: TensorData::Shared(descriptor),
        }
    }

    /// Meaningful dimensions.
    pub fn shape(&self) -> &[u32] {
        &self.dims[..usize::from(self.nb_dims).min(CG_TENSOR_NB_DIMS)]
    }

    /// Number of elements, see [`shape_size`].
    pub fn size(&self) -> Option<usize> {
        shape_size(self.shape())
    }

    /// Local elements, `None` for a shared tensor.
    pub fn elements(&self) -> Option<&[T]> {
        match &self.data {
            TensorData::Owned(data) => Some(data),
            TensorData::Shared(_) => None,
        }
    }
}

impl<T> Default for Tensor<T> {
    fn default() -> Self {
        Self {
            nb_dims: 0,
            dims: [0; CG_TENSOR_NB_DIMS],
            data: TensorData::Owned(Arc::from(Vec::new())),
        }
    }
}

/// Tensor of any supported element type.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum AnyTensor {
    U8(Tensor<u8>),
    I8(Tensor<i8>),
    U16(Tensor<u16>),
    I16(Tensor<i16>),
    U32(Tensor<u32>),
    I32(Tensor<i32>),
    U64(Tensor<u64>),
    I64(Tensor<i64>),
    F32(Tensor<f32>),
    F64(Tensor<f64>),
}

/// Closed set of values an event can carry.
///
/// Moving a value out with [`Value::take`] leaves [`Value::None`] behind.
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(missing_docs)]
pub enum Value {
    /// No value.
    #[default]
    None,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Buffer(BufferPtr),
    Tensor(AnyTensor),
}

impl Value {
    /// Moves the value out, leaving `None`.
    pub fn take(&mut self) -> Value {
        core::mem::take(self)
    }

    /// Returns `true` for the empty alternative.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the stored alternative.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::Tensor(_) => "tensor",
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
    String => Str, BufferPtr => Buffer, AnyTensor => Tensor,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(String::from(v))
    }
}

impl From<RawBuffer> for Value {
    fn from(v: RawBuffer) -> Self {
        Value::Buffer(Arc::new(v))
    }
}

macro_rules! tensor_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Tensor<$t>> for AnyTensor {
                fn from(t: Tensor<$t>) -> Self {
                    AnyTensor::$variant(t)
                }
            }

            impl From<Tensor<$t>> for Value {
                fn from(t: Tensor<$t>) -> Self {
                    Value::Tensor(AnyTensor::$variant(t))
                }
            }
        )*
    };
}

tensor_from!(
    u8 => U8, i8 => I8, u16 => U16, i16 => I16, u32 => U32,
    i32 => I32, u64 => U64, i64 => I64, f32 => F32, f64 => F64,
);
