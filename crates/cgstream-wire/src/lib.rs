//! Binary codec for cgstream events.
//!
//! Packs an event together with the identifier of its destination node so
//! that it can cross a process or network boundary, and unpacks it on the
//! other side. All integers are little-endian.
//!
//! # Format
//!
//! ```text
//! record  := node_id:u32 event_id:u32 priority:u8 kind:u8 payload
//! payload := value                          (kind 0)
//!          | count:u32 value{count}         (kind 1, count <= 8)
//! value   := tag:u8 body
//! ```
//!
//! | Tag | Type | Body |
//! |-----|------|------|
//! | 0 | none | empty |
//! | 1-10 | scalars | fixed-width value |
//! | 11 | buffer | `kind:u8` then `len:u32 bytes` (copy) or `len:u32 global_id:i32` (shared) |
//! | 12 | string | `len:u32` bytes including a trailing NUL |
//! | 13 | tensor | `nb_dims:u8 8:u32 dims:[u32;8] elem_tag:u8 kind:u8` then `n:u32 elements` or `n:u32 global_id:i32` |
//!
//! Shared buffers travel as memory server descriptors. Packing takes a
//! reference on behalf of the receiver, unpacking looks the buffer up and
//! drops that transfer reference.
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::event::{Event, Priority, K_VALUE};
//! use cgstream_wire::{pack, unpack};
//!
//! let event = Event::with_args(K_VALUE, Priority::High, (1.5f32, "gain"));
//! let bytes = pack(7, &event).unwrap();
//! let (node, decoded) = unpack(&bytes).unwrap();
//! assert_eq!(node, 7);
//! assert_eq!(decoded, event);
//! ```

mod error;
mod pack;
mod tag;
mod unpack;

pub use error::WireError;
pub use pack::{Packer, pack};
pub use tag::{BufferKind, ValueTag};
pub use unpack::{Unpacker, unpack};
