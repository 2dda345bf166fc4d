//! Element types a runtime FIFO can carry.

use serde::{Deserialize, Serialize};

/// Element type of a FIFO declared in a graph description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    #[default]
    F32,
    /// `f64`
    F64,
}

impl SampleType {
    /// All sample types.
    pub const ALL: [SampleType; 10] = [
        SampleType::I8,
        SampleType::I16,
        SampleType::I32,
        SampleType::I64,
        SampleType::U8,
        SampleType::U16,
        SampleType::U32,
        SampleType::U64,
        SampleType::F32,
        SampleType::F64,
    ];

    /// Size of one sample in bytes.
    pub const fn size(self) -> usize {
        match self {
            SampleType::I8 | SampleType::U8 => 1,
            SampleType::I16 | SampleType::U16 => 2,
            SampleType::I32 | SampleType::U32 | SampleType::F32 => 4,
            SampleType::I64 | SampleType::U64 | SampleType::F64 => 8,
        }
    }

    /// Name used in graph descriptions.
    pub const fn name(self) -> &'static str {
        match self {
            SampleType::I8 => "i8",
            SampleType::I16 => "i16",
            SampleType::I32 => "i32",
            SampleType::I64 => "i64",
            SampleType::U8 => "u8",
            SampleType::U16 => "u16",
            SampleType::U32 => "u32",
            SampleType::U64 => "u64",
            SampleType::F32 => "f32",
            SampleType::F64 => "f64",
        }
    }
}

impl core::fmt::Display for SampleType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust type stored in a runtime FIFO.
pub trait Sample: Copy + Default + 'static {
    /// Matching description tag.
    const TYPE: SampleType;
}

macro_rules! sample {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Sample for $t {
                const TYPE: SampleType = SampleType::$variant;
            }
        )*
    };
}

sample!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
);

/// Calls `$body` with `$t` bound to the Rust type of `$ty`.
macro_rules! with_sample_type {
    ($ty:expr, $t:ident => $body:expr) => {
        match $ty {
            $crate::SampleType::I8 => {
                type $t = i8;
                $body
            }
            $crate::SampleType::I16 => {
                type $t = i16;
                $body
            }
            $crate::SampleType::I32 => {
                type $t = i32;
                $body
            }
            $crate::SampleType::I64 => {
                type $t = i64;
                $body
            }
            $crate::SampleType::U8 => {
                type $t = u8;
                $body
            }
            $crate::SampleType::U16 => {
                type $t = u16;
                $body
            }
            $crate::SampleType::U32 => {
                type $t = u32;
                $body
            }
            $crate::SampleType::U64 => {
                type $t = u64;
                $body
            }
            $crate::SampleType::F32 => {
                type $t = f32;
                $body
            }
            $crate::SampleType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use with_sample_type;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_rust_types() {
        for ty in SampleType::ALL {
            let size = with_sample_type!(ty, T => core::mem::size_of::<T>());
            assert_eq!(ty.size(), size, "{ty}");
        }
    }

    #[test]
    fn names_are_serde_names() {
        for ty in SampleType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.name()));
        }
    }

    #[test]
    fn trait_tags_agree() {
        assert_eq!(<f32 as Sample>::TYPE, SampleType::F32);
        assert_eq!(<u64 as Sample>::TYPE, SampleType::U64);
        assert_eq!(SampleType::default(), SampleType::F32);
    }
}
