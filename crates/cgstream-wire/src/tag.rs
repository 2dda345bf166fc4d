//! Type tags and element encodings.

use cgstream_core::event::{AnyTensor, Tensor};

/// Tag preceding every encoded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ValueTag {
    None = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float = 5,
    Double = 6,
    UInt8 = 7,
    UInt16 = 8,
    UInt32 = 9,
    UInt64 = 10,
    /// Opaque byte buffer.
    Any = 11,
    Str = 12,
    Tensor = 13,
}

impl TryFrom<u8> for ValueTag {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        Ok(match raw {
            0 => Self::None,
            1 => Self::Int8,
            2 => Self::Int16,
            3 => Self::Int32,
            4 => Self::Int64,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::UInt8,
            8 => Self::UInt16,
            9 => Self::UInt32,
            10 => Self::UInt64,
            11 => Self::Any,
            12 => Self::Str,
            13 => Self::Tensor,
            other => return Err(other),
        })
    }
}

/// How buffer contents travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferKind {
    /// Bytes inlined in the message.
    Copy = 0,
    /// Memory server descriptor.
    Shared = 1,
}

impl TryFrom<u8> for BufferKind {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0 => Ok(Self::Copy),
            1 => Ok(Self::Shared),
            other => Err(other),
        }
    }
}

/// Payload shape byte following the event header.
pub(crate) const KIND_SINGLE: u8 = 0;
pub(crate) const KIND_LIST: u8 = 1;

/// Fixed-width little-endian scalar usable as a tensor element.
pub(crate) trait Element: Copy + 'static {
    const TAG: ValueTag;
    const SIZE: usize;

    fn put(self, out: &mut Vec<u8>);

    /// `bytes` is exactly `SIZE` long.
    fn get(bytes: &[u8]) -> Self;

    fn wrap(tensor: Tensor<Self>) -> AnyTensor;
}

macro_rules! element {
    ($($t:ty => $tag:ident, $variant:ident);* $(;)?) => {
        $(
            impl Element for $t {
                const TAG: ValueTag = ValueTag::$tag;
                const SIZE: usize = core::mem::size_of::<$t>();

                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn get(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                fn wrap(tensor: Tensor<Self>) -> AnyTensor {
                    AnyTensor::$variant(tensor)
                }
            }
        )*
    };
}

element! {
    i8 => Int8, I8;
    i16 => Int16, I16;
    i32 => Int32, I32;
    i64 => Int64, I64;
    u8 => UInt8, U8;
    u16 => UInt16, U16;
    u32 => UInt32, U32;
    u64 => UInt64, U64;
    f32 => Float, F32;
    f64 => Double, F64;
}
