//! Interface to a server owning buffers shared between processes.
//!
//! Events can carry buffers and tensors that live in memory managed by a
//! [`MemServer`]. Such values travel as a [`Descriptor`] (a global
//! identifier plus a size); the server counts references and arbitrates
//! access. The core never frees shared memory itself.

/// Handle to a buffer owned by a memory server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// Identifier valid across processes.
    pub global_id: i32,
    /// Size in bytes.
    pub size: usize,
}

/// Failure reported by a memory server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemError {
    /// No buffer with this global id.
    UnknownBuffer(i32),
    /// The buffer is locked in a conflicting mode.
    Busy(i32),
    /// An unlock did not match a lock.
    NotLocked(i32),
}

impl core::fmt::Display for MemError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownBuffer(id) => write!(f, "unknown shared buffer {id}"),
            Self::Busy(id) => write!(f, "shared buffer {id} is locked"),
            Self::NotLocked(id) => write!(f, "shared buffer {id} is not locked"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MemError {}

/// Reference-counting owner of shared buffers.
///
/// While a write lock is held the reference count cannot change.
pub trait MemServer: Send + Sync {
    /// Takes the write lock.
    fn lock(&self, global_id: i32) -> Result<(), MemError>;
    /// Releases the write lock.
    fn unlock(&self, global_id: i32) -> Result<(), MemError>;
    /// Takes a read lock. Several readers may hold one at once.
    fn read_lock(&self, global_id: i32) -> Result<(), MemError>;
    /// Releases a read lock.
    fn read_unlock(&self, global_id: i32) -> Result<(), MemError>;
    /// Adds a reference.
    fn acquire(&self, global_id: i32) -> Result<(), MemError>;
    /// Drops a reference. The buffer is recycled when none remain.
    fn release(&self, global_id: i32) -> Result<(), MemError>;
    /// Current reference count, `None` for an unknown buffer.
    fn refcount(&self, global_id: i32) -> Option<u32>;
    /// Allocates a buffer with a reference count of one.
    fn new_buffer(&self, size: usize) -> Option<Descriptor>;
    /// Looks up a buffer and adds a reference to it.
    fn get_buffer(&self, global_id: i32) -> Option<Descriptor>;
}

#[cfg(feature = "std")]
pub use local::LocalMemServer;

#[cfg(feature = "std")]
mod local {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::{Descriptor, MemError, MemServer};

    #[derive(Debug)]
    struct Slot {
        bytes: Vec<u8>,
        refcount: u32,
        writer: bool,
        readers: u32,
    }

    #[derive(Debug, Default)]
    struct Table {
        next_id: i32,
        slots: HashMap<i32, Slot>,
    }

    /// In-process memory server backed by heap buffers.
    #[derive(Debug, Default)]
    pub struct LocalMemServer {
        table: Mutex<Table>,
    }

    impl LocalMemServer {
        /// Creates an empty server.
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of live buffers.
        pub fn len(&self) -> usize {
            self.table.lock().slots.len()
        }

        /// Returns `true` if no buffer is live.
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Copies bytes into a buffer, truncating to its size.
        pub fn write(&self, global_id: i32, bytes: &[u8]) -> Result<(), MemError> {
            let mut table = self.table.lock();
            let slot = table.slots.get_mut(&global_id).ok_or(MemError::UnknownBuffer(global_id))?;
            let n = bytes.len().min(slot.bytes.len());
            slot.bytes[..n].copy_from_slice(&bytes[..n]);
            Ok(())
        }

        /// Copies a buffer's contents out.
        pub fn read(&self, global_id: i32) -> Option<Vec<u8>> {
            self.table.lock().slots.get(&global_id).map(|s| s.bytes.clone())
        }

        fn with_slot<R>(&self, global_id: i32, f: impl FnOnce(&mut Slot) -> Result<R, MemError>) -> Result<R, MemError> {
            let mut table = self.table.lock();
            let slot = table.slots.get_mut(&global_id).ok_or(MemError::UnknownBuffer(global_id))?;
            f(slot)
        }
    }

    impl MemServer for LocalMemServer {
        fn lock(&self, global_id: i32) -> Result<(), MemError> {
            self.with_slot(global_id, |slot| {
                if slot.writer || slot.readers > 0 {
                    return Err(MemError::Busy(global_id));
                }
                slot.writer = true;
                Ok(())
            })
        }

        fn unlock(&self, global_id: i32) -> Result<(), MemError> {
            self.with_slot(global_id, |slot| {
                if !slot.writer {
                    return Err(MemError::NotLocked(global_id));
                }
                slot.writer = false;
                Ok(())
            })
        }

        fn read_lock(&self, global_id: i32) -> Result<(), MemError> {
            self.with_slot(global_id, |slot| {
                if slot.writer {
                    return Err(MemError::Busy(global_id));
                }
                slot.readers += 1;
                Ok(())
            })
        }

        fn read_unlock(&self, global_id: i32) -> Result<(), MemError> {
            self.with_slot(global_id, |slot| {
                if slot.readers == 0 {
                    return Err(MemError::NotLocked(global_id));
                }
                slot.readers -= 1;
                Ok(())
            })
        }

        fn acquire(&self, global_id: i32) -> Result<(), MemError> {
            self.with_slot(global_id, |slot| {
                if slot.writer {
                    return Err(MemError::Busy(global_id));
                }
                slot.refcount += 1;
                Ok(())
            })
        }

        fn release(&self, global_id: i32) -> Result<(), MemError> {
            let mut table = self.table.lock();
            let slot = table.slots.get_mut(&global_id).ok_or(MemError::UnknownBuffer(global_id))?;
            if slot.writer {
                return Err(MemError::Busy(global_id));
            }
            slot.refcount = slot.refcount.saturating_sub(1);
            if slot.refcount == 0 {
                table.slots.remove(&global_id);
                #[cfg(feature = "tracing")]
                tracing::debug!(global_id, "shared buffer recycled");
            }
            Ok(())
        }

        fn refcount(&self, global_id: i32) -> Option<u32> {
            self.table.lock().slots.get(&global_id).map(|s| s.refcount)
        }

        fn new_buffer(&self, size: usize) -> Option<Descriptor> {
            let mut table = self.table.lock();
            let global_id = table.next_id;
            table.next_id = table.next_id.checked_add(1)?;
            table.slots.insert(
                global_id,
                Slot {
                    bytes: vec![0; size],
                    refcount: 1,
                    writer: false,
                    readers: 0,
                },
            );
            Some(Descriptor { global_id, size })
        }

        fn get_buffer(&self, global_id: i32) -> Option<Descriptor> {
            let mut table = self.table.lock();
            let slot = table.slots.get_mut(&global_id)?;
            if slot.writer {
                return None;
            }
            slot.refcount += 1;
            Some(Descriptor {
                global_id,
                size: slot.bytes.len(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn refcount_lifecycle() {
            let server = LocalMemServer::new();
            let desc = server.new_buffer(16).unwrap();
            assert_eq!(desc.size, 16);
            assert_eq!(server.refcount(desc.global_id), Some(1));

            let again = server.get_buffer(desc.global_id).unwrap();
            assert_eq!(again, desc);
            assert_eq!(server.refcount(desc.global_id), Some(2));

            server.release(desc.global_id).unwrap();
            server.release(desc.global_id).unwrap();
            assert_eq!(server.refcount(desc.global_id), None);
            assert!(server.is_empty());
        }

        #[test]
        fn write_lock_blocks_refcount_changes() {
            let server = LocalMemServer::new();
            let id = server.new_buffer(4).unwrap().global_id;
            server.lock(id).unwrap();
            assert_eq!(server.acquire(id), Err(MemError::Busy(id)));
            assert_eq!(server.release(id), Err(MemError::Busy(id)));
            assert!(server.get_buffer(id).is_none());
            assert_eq!(server.read_lock(id), Err(MemError::Busy(id)));
            server.unlock(id).unwrap();
            assert_eq!(server.unlock(id), Err(MemError::NotLocked(id)));
            server.acquire(id).unwrap();
            assert_eq!(server.refcount(id), Some(2));
        }

        #[test]
        fn readers_share() {
            let server = LocalMemServer::new();
            let id = server.new_buffer(4).unwrap().global_id;
            server.read_lock(id).unwrap();
            server.read_lock(id).unwrap();
            assert_eq!(server.lock(id), Err(MemError::Busy(id)));
            server.read_unlock(id).unwrap();
            server.read_unlock(id).unwrap();
            assert_eq!(server.read_unlock(id), Err(MemError::NotLocked(id)));
            server.lock(id).unwrap();
        }

        #[test]
        fn contents_round_trip() {
            let server = LocalMemServer::new();
            let id = server.new_buffer(3).unwrap().global_id;
            server.write(id, &[1, 2, 3, 4]).unwrap();
            assert_eq!(server.read(id), Some(vec![1, 2, 3]));
            assert_eq!(server.write(99, &[0]), Err(MemError::UnknownBuffer(99)));
        }
    }
}
