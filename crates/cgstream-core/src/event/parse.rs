//! Type-directed extraction of event values.
//!
//! A requested type accepts its own alternative plus every narrower one in
//! its widening chain:
//!
//! | requested | also accepts                      |
//! |-----------|-----------------------------------|
//! | `u16`     | `u8`                              |
//! | `u32`     | `u16`, `u8`                       |
//! | `u64`     | `u32`, `u16`, `u8`                |
//! | `i16`     | `i8`                              |
//! | `i32`     | `i16`, `i8`                       |
//! | `i64`     | `i32`, `i16`, `i8`                |
//! | `f32`     | `i32`, `i16`, `i8`                |
//! | `f64`     | `i64`, `f32`, `i32`, `i16`, `i8`  |
//!
//! `u8`, `i8`, strings, buffers and tensors accept only an exact match.

use alloc::string::String;
use alloc::sync::Arc;

use super::value::{AnyTensor, BufferPtr, RawBuffer, Tensor, Value};

/// A type that can be read out of a [`Value`].
pub trait ValueParse: Sized {
    /// Returns `true` if `value` holds this type or one it widens.
    fn contains(value: &Value) -> bool;

    /// Reads the value, widening when needed.
    ///
    /// Returns the type's default when [`contains`](Self::contains) is false.
    fn get_value(value: &Value) -> Self;
}

macro_rules! exact {
    ($t:ty, $variant:ident) => {
        impl ValueParse for $t {
            fn contains(value: &Value) -> bool {
                matches!(value, Value::$variant(_))
            }

            fn get_value(value: &Value) -> Self {
                match value {
                    Value::$variant(v) => *v,
                    _ => Self::default(),
                }
            }
        }
    };
}

macro_rules! widening {
    ($t:ty, $variant:ident, $narrower:ty) => {
        impl ValueParse for $t {
            fn contains(value: &Value) -> bool {
                matches!(value, Value::$variant(_)) || <$narrower>::contains(value)
            }

            fn get_value(value: &Value) -> Self {
                match value {
                    Value::$variant(v) => *v,
                    _ => <$t>::from(<$narrower>::get_value(value)),
                }
            }
        }
    };
}

exact!(u8, U8);
exact!(i8, I8);
widening!(u16, U16, u8);
widening!(u32, U32, u16);
widening!(u64, U64, u32);
widening!(i16, I16, i8);
widening!(i32, I32, i16);
widening!(i64, I64, i32);

impl ValueParse for f32 {
    fn contains(value: &Value) -> bool {
        matches!(value, Value::F32(_)) || i32::contains(value)
    }

    #[allow(clippy::cast_precision_loss)]
    fn get_value(value: &Value) -> Self {
        match value {
            Value::F32(v) => *v,
            _ => i32::get_value(value) as f32,
        }
    }
}

impl ValueParse for f64 {
    fn contains(value: &Value) -> bool {
        matches!(value, Value::F64(_) | Value::I64(_)) || f32::contains(value)
    }

    #[allow(clippy::cast_precision_loss)]
    fn get_value(value: &Value) -> Self {
        match value {
            Value::F64(v) => *v,
            Value::I64(v) => *v as f64,
            _ => f64::from(f32::get_value(value)),
        }
    }
}

impl ValueParse for String {
    fn contains(value: &Value) -> bool {
        matches!(value, Value::Str(_))
    }

    fn get_value(value: &Value) -> Self {
        match value {
            Value::Str(s) => s.clone(),
            _ => String::new(),
        }
    }
}

impl ValueParse for BufferPtr {
    fn contains(value: &Value) -> bool {
        matches!(value, Value::Buffer(_))
    }

    fn get_value(value: &Value) -> Self {
        match value {
            Value::Buffer(b) => Arc::clone(b),
            _ => Arc::new(RawBuffer::default()),
        }
    }
}

impl ValueParse for AnyTensor {
    fn contains(value: &Value) -> bool {
        matches!(value, Value::Tensor(_))
    }

    fn get_value(value: &Value) -> Self {
        match value {
            Value::Tensor(t) => t.clone(),
            _ => AnyTensor::U8(Tensor::default()),
        }
    }
}

macro_rules! tensor_parse {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl ValueParse for Tensor<$t> {
                fn contains(value: &Value) -> bool {
                    matches!(value, Value::Tensor(AnyTensor::$variant(_)))
                }

                fn get_value(value: &Value) -> Self {
                    match value {
                        Value::Tensor(AnyTensor::$variant(t)) => t.clone(),
                        _ => Tensor::default(),
                    }
                }
            }
        )*
    };
}

tensor_parse!(
    u8 => U8, i8 => I8, u16 => U16, i16 => I16, u32 => U32,
    i32 => I32, u64 => U64, i64 => I64, f32 => F32, f64 => F64,
);
