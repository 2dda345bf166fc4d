//! Error types for the event codec.

use cgstream_core::MemError;
use thiserror::Error;

/// Errors that can occur while packing or unpacking events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before a field was complete
    #[error("truncated input: {needed} bytes needed at offset {offset}")]
    Truncated {
        /// Offset of the incomplete field.
        offset: usize,
        /// Bytes the field needs.
        needed: usize,
    },

    /// Unknown value type tag
    #[error("unknown value tag {0}")]
    UnknownValueTag(u8),

    /// Unknown buffer kind (copy or shared)
    #[error("unknown buffer kind {0}")]
    UnknownBufferKind(u8),

    /// String payload is not valid UTF-8
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// List longer than an event can hold
    #[error("list of {0} values exceeds the event capacity")]
    TooManyValues(u32),

    /// Tensor shape whose element count overflows
    #[error("tensor shape overflows the element count")]
    TensorTooLarge,

    /// Tensor whose payload does not match its shape
    #[error("tensor shape holds {expected} elements but the payload has {found}")]
    ShapeMismatch {
        /// Elements the shape describes.
        expected: usize,
        /// Elements present.
        found: usize,
    },

    /// Shared buffer met without a memory server
    #[error("shared buffer requires a memory server")]
    MissingMemServer,

    /// Shared buffer the memory server does not know
    #[error("unknown shared buffer {0}")]
    UnknownSharedBuffer(i32),

    /// Memory server refused an operation
    #[error("memory server error: {0}")]
    Mem(#[from] MemError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            WireError::Truncated { offset: 9, needed: 4 }.to_string(),
            "truncated input: 4 bytes needed at offset 9"
        );
        assert_eq!(WireError::UnknownValueTag(42).to_string(), "unknown value tag 42");
        assert_eq!(
            WireError::TooManyValues(9).to_string(),
            "list of 9 values exceeds the event capacity"
        );
        assert_eq!(
            WireError::ShapeMismatch { expected: 6, found: 0 }.to_string(),
            "tensor shape holds 6 elements but the payload has 0"
        );
        assert_eq!(
            WireError::Mem(MemError::Busy(3)).to_string(),
            "memory server error: shared buffer 3 is locked"
        );
    }

    #[test]
    fn mem_error_converts() {
        let err: WireError = MemError::UnknownBuffer(5).into();
        assert_eq!(err, WireError::Mem(MemError::UnknownBuffer(5)));
    }
}
