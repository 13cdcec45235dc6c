// This is the fragmenting ring buffer shared by producers and consumers

use super::layout::Cursors;
use crate::MPMC::reassembly::Reassembler;
use crate::MPMC::Structs::Buffer_Structs::{Fragment, FragmentMeta};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cell::UnsafeCell;
use std::ops::Deref;

pub use super::layout::{CACHE_LINE_SIZE, MAX_FRAGMENT_SIZE};

/// A single slot in the ring buffer.
///
/// Holds one fragment of a logical message. The payload is always an owned
/// copy of the producer's bytes, so a slot never outlives or aliases the
/// buffer it was filled from. `#[repr(C)]` keeps the layout defined and the
/// alignment keeps neighbouring slots on separate cache lines.
#[repr(C, align(64))]
#[derive(Clone)]
pub struct Slot {
    /// Reassembly metadata (total message length, fragment offset).
    pub(crate) meta: FragmentMeta,

    /// Fragment bytes; only the first `fragment_len()` are meaningful.
    pub(crate) payload: [u8; MAX_FRAGMENT_SIZE],
}

const _: () = assert!(std::mem::align_of::<Slot>() == CACHE_LINE_SIZE);
const _: () = assert!(std::mem::size_of::<Slot>() % CACHE_LINE_SIZE == 0);

impl Slot {
    pub const fn new() -> Self {
        Self {
            meta: FragmentMeta {
                total_length: 0,
                fragment_offset: 0,
            },
            payload: [0; MAX_FRAGMENT_SIZE],
        }
    }

    /// Copy `chunk` in and stamp the reassembly metadata.
    pub(crate) fn fill(&mut self, total_length: usize, fragment_offset: usize, chunk: &[u8]) {
        debug_assert!(chunk.len() <= MAX_FRAGMENT_SIZE);
        debug_assert!(fragment_offset + chunk.len() <= total_length);
        self.meta = FragmentMeta {
            total_length: total_length as u64,
            fragment_offset: fragment_offset as u64,
        };
        self.payload[..chunk.len()].copy_from_slice(chunk);
    }

    #[inline]
    pub fn meta(&self) -> FragmentMeta {
        self.meta
    }

    #[inline]
    pub fn total_length(&self) -> u64 {
        self.meta.total_length
    }

    #[inline]
    pub fn fragment_offset(&self) -> u64 {
        self.meta.fragment_offset
    }

    #[inline]
    pub fn fragment_len(&self) -> usize {
        self.meta.fragment_len()
    }

    /// The live bytes of this fragment.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.fragment_len()]
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.meta.is_first()
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.meta.is_last()
    }

    /// Copy the fragment out of the slot.
    pub fn to_fragment(&self) -> Fragment {
        Fragment {
            meta: self.meta,
            payload: self.payload().to_vec(),
        }
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded, blocking, multi-producer multi-consumer ring of [`Slot`]s.
///
/// ### Concurrency Design:
/// - **Cursors**: `write_index` and `read_index` live together behind one
///   mutex. Every read or update of either index happens with it held.
/// - **Producers**: a write holds the writer section for the whole message so
///   its fragments are contiguous in the ring. Each fragment is published by
///   filling the slot at `write_index` and advancing the index under the
///   cursor lock; a full ring parks the writer on `not_full`.
/// - **Consumers**: a consumer takes the reader turn, which pins `read_index`
///   until it advances. The slot it reads sits between the two cursors, so no
///   producer can touch it in the meantime.
///
/// The buffer owns its slot storage for its whole lifetime; [`destroy`]
/// hands the storage back.
///
/// [`destroy`]: RingBuffer::destroy
pub struct RingBuffer {
    /// Slot storage. A slot is written only at `write_index` under the cursor
    /// lock and read only at `read_index` while the reader turn is held.
    pub(crate) slots: Box<[UnsafeCell<Slot>]>,

    /// Both ring indices plus the closed flag.
    pub(crate) cursors: CachePadded<Mutex<Cursors>>,

    /// Signalled when a fragment is published (or the ring closes).
    pub(crate) not_empty: Condvar,

    /// Signalled when a slot is released (or the ring closes).
    pub(crate) not_full: Condvar,

    /// Held by a producer for the whole of one write.
    pub(crate) writer: CachePadded<Mutex<()>>,

    /// The reader turn. Held by a consumer while it looks at the slot under
    /// `read_index`; carries the partially reassembled message between turns.
    pub(crate) reader: CachePadded<Mutex<Reassembler>>,

    /// Optional ceiling on logical message length.
    pub(crate) max_message_len: Option<usize>,
}

// Slot access is coordinated by the cursor lock and the reader turn.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

/// Read-only view of the oldest unread slot.
///
/// The view holds the reader turn, so the read cursor cannot move until it
/// is consumed by [`advance_read_index`] or dropped. Dropping it without
/// advancing leaves the fragment in place for the next reader.
///
/// [`advance_read_index`]: ReadSlot::advance_read_index
pub struct ReadSlot<'a> {
    pub(crate) ring: &'a RingBuffer,
    pub(crate) index: usize,
    pub(crate) _turn: MutexGuard<'a, Reassembler>,
}

impl ReadSlot<'_> {
    /// Position of this slot in the ring.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Release the slot back to producers.
    pub fn advance_read_index(self) {
        self.ring.release(self.index);
    }
}

impl Deref for ReadSlot<'_> {
    type Target = Slot;

    fn deref(&self) -> &Slot {
        // SAFETY: the slot at `index` is published and the reader turn keeps
        // `read_index` pinned to it, so no producer writes it while we borrow.
        unsafe { &*self.ring.slots[self.index].get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_owns_its_bytes() {
        let mut source = vec![b'x'; 10];
        let mut slot = Slot::new();
        slot.fill(10, 0, &source);

        source.iter_mut().for_each(|b| *b = b'y');
        drop(source);

        assert_eq!(slot.payload(), b"xxxxxxxxxx");
        assert_eq!(slot.total_length(), 10);
        assert!(slot.is_first() && slot.is_last());
    }

    #[test]
    fn slot_is_cache_aligned() {
        assert_eq!(std::mem::align_of::<Slot>(), CACHE_LINE_SIZE);
        let slots = [Slot::new(), Slot::new()];
        let a = &slots[0] as *const Slot as usize;
        let b = &slots[1] as *const Slot as usize;
        assert!(b - a >= CACHE_LINE_SIZE);
        assert_eq!(a % CACHE_LINE_SIZE, 0);
    }
}
