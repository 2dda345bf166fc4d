//! FIFO edges connecting nodes.
//!
//! A FIFO wraps a fixed backing buffer supplied from outside and two cursors.
//! Writers ask for `n` free slots with [`Edge::get_write_buffer`], readers ask
//! for `n` buffered slots with [`Edge::get_read_buffer`]. The accessors never
//! check anything: callers query [`Edge::will_underflow_with`] and
//! [`Edge::will_overflow_with`] first (asynchronous mode), or rely on the
//! schedule having been sized offline (synchronous mode).
//!
//! # Compaction
//!
//! There is no wraparound. When a write is requested and the read cursor has
//! moved, the unread region is shifted to offset 0 first, so every returned
//! block is contiguous. The cost is a copy proportional to the unread data.
//!
//! ```text
//!  before write:  [ x x x a b c . . ]   read=3 write=6
//!  after compact: [ a b c . . . . . ]   read=0 write=3
//! ```
//!
//! # Plain buffers
//!
//! [`PlainBuffer`] has no cursors at all. It always answers "no underflow, no
//! overflow" and hands out the same slots to the writer and the reader. It is
//! only correct when the schedule performs exactly one write then one read
//! per iteration.
//!
//! # Example
//!
//! ```rust
//! use cgstream_core::{Edge, Fifo};
//!
//! let mut fifo = Fifo::<f32, _>::new(vec![0.0f32; 8]);
//! assert!(!fifo.will_overflow_with(4));
//! fifo.get_write_buffer(4).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
//! assert_eq!(fifo.nb_samples_in_fifo(), 4);
//! assert_eq!(fifo.get_read_buffer(2), &[1.0, 2.0]);
//! ```

use alloc::rc::Rc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use core::cell::RefCell;
use core::marker::PhantomData;

/// Interface shared by every kind of edge.
///
/// Object safe: nodes hold edges as [`EdgeRef`] so the same node code works
/// with ring FIFOs and plain buffers.
pub trait Edge<T> {
    /// Returns `nb` free slots and marks them written.
    ///
    /// # Panics
    ///
    /// Panics if the request exceeds the capacity of the backing buffer,
    /// which only happens when the caller skipped the overflow check.
    fn get_write_buffer(&mut self, nb: usize) -> &mut [T];

    /// Returns the next `nb` unread slots and marks them read.
    ///
    /// # Panics
    ///
    /// Panics if the request reaches past the backing buffer, which only
    /// happens when the caller skipped the underflow check.
    fn get_read_buffer(&mut self, nb: usize) -> &mut [T];

    /// Returns `true` if reading `nb` samples would underflow.
    fn will_underflow_with(&self, nb: usize) -> bool;

    /// Returns `true` if writing `nb` samples would overflow.
    fn will_overflow_with(&self, nb: usize) -> bool;

    /// Number of samples available for reading.
    fn nb_samples_in_fifo(&self) -> usize;

    /// Number of free slots available for writing.
    fn nb_of_free_samples_in_fifo(&self) -> usize;

    /// Capacity of the backing buffer in samples.
    fn capacity(&self) -> usize;
}

/// Shared handle to an edge, held by both the producer and the consumer node.
pub type EdgeRef<T> = Rc<RefCell<dyn Edge<T>>>;

/// Wraps an edge into a shared [`EdgeRef`].
pub fn edge_ref<T, E>(edge: E) -> EdgeRef<T>
where
    E: Edge<T> + 'static,
{
    Rc::new(RefCell::new(edge))
}

/// Ring FIFO with linear compaction.
///
/// `S` is the backing storage: a `Vec<T>`, an array, or a `&'static mut [T]`
/// pointing at a statically allocated buffer. The FIFO never resizes it.
///
/// Invariant: `read_pos <= write_pos <= read_pos + capacity`.
#[derive(Debug)]
pub struct Fifo<T, S = Vec<T>> {
    buffer: S,
    read_pos: usize,
    write_pos: usize,
    _marker: PhantomData<T>,
}

impl<T, S> Fifo<T, S>
where
    T: Copy,
    S: AsRef<[T]> + AsMut<[T]>,
{
    /// Creates an empty FIFO over `buffer`.
    pub fn new(buffer: S) -> Self {
        Self::with_delay(buffer, 0)
    }

    /// Creates a FIFO whose first `delay` samples are already buffered.
    ///
    /// The primed samples are whatever the backing buffer holds. The delay is
    /// clamped to the capacity.
    pub fn with_delay(buffer: S, delay: usize) -> Self {
        let delay = delay.min(buffer.as_ref().len());
        Self {
            buffer,
            read_pos: 0,
            write_pos: delay,
            _marker: PhantomData,
        }
    }

    /// Current read cursor.
    #[inline]
    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Current write cursor.
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Returns the backing storage.
    pub fn into_inner(self) -> S {
        self.buffer
    }

    fn compact(&mut self) {
        if self.read_pos > 0 {
            let (r, w) = (self.read_pos, self.write_pos);
            self.buffer.as_mut().copy_within(r..w, 0);
            self.write_pos = w - r;
            self.read_pos = 0;
        }
    }
}

impl<T: Copy + Default> Fifo<T, Vec<T>> {
    /// Creates a heap-backed FIFO of `capacity` default-initialized samples.
    pub fn with_capacity(capacity: usize, delay: usize) -> Self {
        Self::with_delay(alloc::vec![T::default(); capacity], delay)
    }
}

impl<T, S> Edge<T> for Fifo<T, S>
where
    T: Copy,
    S: AsRef<[T]> + AsMut<[T]>,
{
    fn get_write_buffer(&mut self, nb: usize) -> &mut [T] {
        debug_assert!(!self.will_overflow_with(nb), "FIFO overflow");
        self.compact();
        let start = self.write_pos;
        self.write_pos += nb;
        &mut self.buffer.as_mut()[start..start + nb]
    }

    fn get_read_buffer(&mut self, nb: usize) -> &mut [T] {
        debug_assert!(!self.will_underflow_with(nb), "FIFO underflow");
        let start = self.read_pos;
        self.read_pos += nb;
        &mut self.buffer.as_mut()[start..start + nb]
    }

    #[inline]
    fn will_underflow_with(&self, nb: usize) -> bool {
        nb > self.nb_samples_in_fifo()
    }

    #[inline]
    fn will_overflow_with(&self, nb: usize) -> bool {
        self.nb_samples_in_fifo() + nb > self.capacity()
    }

    #[inline]
    fn nb_samples_in_fifo(&self) -> usize {
        self.write_pos.saturating_sub(self.read_pos)
    }

    #[inline]
    fn nb_of_free_samples_in_fifo(&self) -> usize {
        self.capacity().saturating_sub(self.nb_samples_in_fifo())
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }
}

/// Cursor-less edge for in-place exchange between one writer and one reader.
///
/// Both accessors return the leading slots of the buffer; the requested size
/// only bounds the returned slice. Under/overflow queries are always `false`
/// and occupancy queries are always `0`. Nothing here checks that the
/// schedule respects the one-write-one-read discipline.
#[derive(Debug)]
pub struct PlainBuffer<T, S = Vec<T>> {
    buffer: S,
    _marker: PhantomData<T>,
}

impl<T, S> PlainBuffer<T, S>
where
    S: AsRef<[T]> + AsMut<[T]>,
{
    /// Creates a plain buffer over `buffer`.
    pub fn new(buffer: S) -> Self {
        Self {
            buffer,
            _marker: PhantomData,
        }
    }

    /// Returns the backing storage.
    pub fn into_inner(self) -> S {
        self.buffer
    }
}

impl<T: Copy + Default> PlainBuffer<T, Vec<T>> {
    /// Creates a heap-backed plain buffer of `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(alloc::vec![T::default(); capacity])
    }
}

impl<T, S> Edge<T> for PlainBuffer<T, S>
where
    S: AsRef<[T]> + AsMut<[T]>,
{
    fn get_write_buffer(&mut self, nb: usize) -> &mut [T] {
        let buf = self.buffer.as_mut();
        let nb = nb.min(buf.len());
        &mut buf[..nb]
    }

    fn get_read_buffer(&mut self, nb: usize) -> &mut [T] {
        let buf = self.buffer.as_mut();
        let nb = nb.min(buf.len());
        &mut buf[..nb]
    }

    fn will_underflow_with(&self, _nb: usize) -> bool {
        false
    }

    fn will_overflow_with(&self, _nb: usize) -> bool {
        false
    }

    fn nb_samples_in_fifo(&self) -> usize {
        0
    }

    fn nb_of_free_samples_in_fifo(&self) -> usize {
        0
    }

    fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }
}
