use std::cell::UnsafeCell;
use std::sync::Arc;
use std::time::Duration;

use super::layout::{fragments_for, Cursors};
use super::Buffer::{ReadSlot, RingBuffer, Slot, MAX_FRAGMENT_SIZE};
use crate::error::{Result, RingError};
use crate::Core::alloc::{allocate_slots, MIN_CAPACITY};
use crate::Core::wait::Deadline;
use crate::MPMC::reassembly::Reassembler;

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};

/// Split `data` into `(offset, chunk)` pairs of at most one slot each.
/// An empty payload still yields a single empty fragment.
fn fragments(data: &[u8]) -> impl Iterator<Item = (usize, &[u8])> + '_ {
    let empty = data.is_empty().then_some((0, data));
    data.chunks(MAX_FRAGMENT_SIZE)
        .enumerate()
        .map(|(i, chunk)| (i * MAX_FRAGMENT_SIZE, chunk))
        .chain(empty)
}

impl RingBuffer {
    /// Bind a ring to caller-provided slot storage.
    ///
    /// The capacity is the number of slots in `storage`; one of them is kept
    /// free as the full/empty sentinel, so at least two are required.
    pub fn init(storage: Box<[Slot]>) -> Result<Self> {
        Self::with_storage(storage, None)
    }

    /// Allocate storage for `capacity` slots and bind a ring to it.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_storage(allocate_slots(capacity)?, None)
    }

    pub(crate) fn with_storage(storage: Box<[Slot]>, max_message_len: Option<usize>) -> Result<Self> {
        let capacity = storage.len();
        if capacity < MIN_CAPACITY {
            return Err(RingError::InvalidCapacity { capacity });
        }

        // UnsafeCell<Slot> has the same layout as Slot.
        let raw = Box::into_raw(storage) as *mut [UnsafeCell<Slot>];
        let slots = unsafe { Box::from_raw(raw) };

        tracing::debug!(capacity, ?max_message_len, "ring buffer initialised");

        Ok(Self {
            slots,
            cursors: CachePadded::new(Mutex::new(Cursors::new(capacity))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            writer: CachePadded::new(Mutex::new(())),
            reader: CachePadded::new(Mutex::new(Reassembler::new())),
            max_message_len,
        })
    }

    /// Tear the ring down and hand its slot storage back.
    ///
    /// Taking `self` by value means no other thread can still be inside the
    /// ring. The lock and condition variables are released here.
    pub fn destroy(self) -> Box<[Slot]> {
        let RingBuffer { slots, cursors, .. } = self;
        let cursors = cursors.into_inner().into_inner();
        tracing::debug!(
            capacity = cursors.capacity,
            unread = cursors.len(),
            "ring buffer destroyed"
        );

        let raw = Box::into_raw(slots) as *mut [Slot];
        unsafe { Box::from_raw(raw) }
    }

    /// Destroy a shared ring.
    ///
    /// Fails with `PreconditionViolation` while any other handle (a producer,
    /// consumer or thread blocked inside the ring) is still alive.
    pub fn destroy_shared(this: Arc<Self>) -> Result<Box<[Slot]>> {
        match Arc::try_unwrap(this) {
            Ok(ring) => Ok(ring.destroy()),
            Err(shared) => {
                tracing::warn!(
                    handles = Arc::strong_count(&shared),
                    "refusing to destroy a ring buffer that is still shared"
                );
                Err(RingError::PreconditionViolation(
                    "ring buffer destroyed while other handles are alive",
                ))
            }
        }
    }

    fn check_len(&self, len: usize) -> Result<()> {
        match self.max_message_len {
            Some(max) if len > max => Err(RingError::WriteTooLarge { len, max }),
            _ => Ok(()),
        }
    }

    /// Fill the slot under `write_index` and publish it.
    ///
    /// Caller holds the writer section and `cursors`, and has checked the
    /// ring is not full.
    fn publish(&self, cursors: &mut Cursors, total_length: usize, offset: usize, chunk: &[u8]) {
        let index = cursors.write_index;
        debug_assert!(!cursors.is_full());

        // SAFETY: `write_index` is never the slot a reader holds: readers only
        // look at `read_index` while the ring is non-empty, and a non-full
        // ring keeps the two apart.
        unsafe { (*self.slots[index].get()).fill(total_length, offset, chunk) };

        cursors.write_index = cursors.next(index);
        tracing::trace!(index, total_length, offset, len = chunk.len(), "fragment published");
        // Broadcast: a consumer mid-message must not lose the wake to one
        // that is still queued for the reader turn.
        self.not_empty.notify_all();
    }

    /// Write `data` into the ring, blocking while it is full.
    ///
    /// The payload is fragmented into chunks of at most `MAX_FRAGMENT_SIZE`
    /// bytes. All fragments of one call are published back to back; no other
    /// writer can interleave with them. Returns the number of bytes written,
    /// which is always `data.len()`.
    ///
    /// Fails with `WriteTooLarge` if a maximum message length is configured
    /// and exceeded, and with `Closed` if the ring is (or gets) closed. A
    /// write interrupted by `close()` may leave a truncated message behind,
    /// which consumers discard.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.check_len(data.len())?;

        let _section = self.writer.lock();
        let mut cursors = self.cursors.lock();

        for (offset, chunk) in fragments(data) {
            while !cursors.closed && cursors.is_full() {
                self.not_full.wait(&mut cursors);
            }
            if cursors.closed {
                if offset > 0 {
                    tracing::warn!(offset, total = data.len(), "ring closed mid-message");
                }
                return Err(RingError::Closed);
            }
            self.publish(&mut cursors, data.len(), offset, chunk);
        }

        Ok(data.len())
    }

    /// Write `data`, giving up after `timeout`.
    ///
    /// Unlike [`write`](Self::write) the whole message must fit in the ring
    /// at once; it is published only when enough slots are free, so a timeout
    /// never leaves part of it behind. Messages larger than
    /// `(capacity - 1) * MAX_FRAGMENT_SIZE` fail with `WriteTooLarge`.
    pub fn write_timeout(&self, data: &[u8], timeout: Duration) -> Result<usize> {
        self.write_until(data, Deadline::after(timeout))
    }

    /// Write `data` only if the ring has room for all of it right now.
    pub fn try_write(&self, data: &[u8]) -> Result<usize> {
        self.write_timeout(data, Duration::ZERO)
    }

    pub(crate) fn write_until(&self, data: &[u8], deadline: Deadline) -> Result<usize> {
        if deadline.is_never() {
            return self.write(data);
        }
        self.check_len(data.len())?;

        let usable = self.capacity() - 1;
        let needed = fragments_for(data.len());
        if needed > usable {
            return Err(RingError::WriteTooLarge {
                len: data.len(),
                max: usable * MAX_FRAGMENT_SIZE,
            });
        }

        let _section = deadline.lock(&*self.writer).map_err(|e| {
            tracing::warn!(len = data.len(), "write timed out waiting for writer section");
            e
        })?;
        let mut cursors = self.cursors.lock();

        while !cursors.closed && cursors.free_slots() < needed {
            if deadline.has_elapsed() {
                tracing::warn!(
                    len = data.len(),
                    needed,
                    free = cursors.free_slots(),
                    "write timed out waiting for space"
                );
                return Err(RingError::Timeout);
            }
            // A timed-out wait loops back to the predicate before giving up.
            let _ = deadline.wait(&self.not_full, &mut cursors);
        }
        if cursors.closed {
            return Err(RingError::Closed);
        }

        for (offset, chunk) in fragments(data) {
            self.publish(&mut cursors, data.len(), offset, chunk);
        }
        Ok(data.len())
    }

    /// Block until at least one published fragment is unread.
    ///
    /// Re-checks after every wake. Once the ring is closed this keeps
    /// returning `Ok` until it has been drained, then fails with `Closed`.
    pub fn wait_for_data(&self) -> Result<()> {
        self.wait_until_readable(Deadline::never())
    }

    /// [`wait_for_data`](Self::wait_for_data) with a deadline.
    pub fn wait_for_data_timeout(&self, timeout: Duration) -> Result<()> {
        self.wait_until_readable(Deadline::after(timeout))
    }

    pub(crate) fn wait_until_readable(&self, deadline: Deadline) -> Result<()> {
        let mut cursors = self.cursors.lock();
        while cursors.is_empty() {
            if cursors.closed {
                return Err(RingError::Closed);
            }
            if deadline.has_elapsed() {
                return Err(RingError::Timeout);
            }
            let _ = deadline.wait(&self.not_empty, &mut cursors);
        }
        Ok(())
    }

    /// View the oldest unread slot, or `None` if the ring is empty.
    ///
    /// Blocks while another consumer holds the reader turn. The view is valid
    /// until [`ReadSlot::advance_read_index`] is called or it is dropped.
    pub fn peek_read_slot(&self) -> Option<ReadSlot<'_>> {
        let turn = self.reader.lock();
        let cursors = self.cursors.lock();
        if cursors.is_empty() {
            return None;
        }
        Some(ReadSlot {
            ring: self,
            index: cursors.read_index,
            _turn: turn,
        })
    }

    /// Hand the oldest unread slot to `f`, then release it.
    ///
    /// The caller proves it holds the reader turn by passing the guard, which
    /// `f` also receives to reassemble into.
    pub(crate) fn consume_with<R>(
        &self,
        turn: &mut MutexGuard<'_, Reassembler>,
        f: impl FnOnce(&Slot, &mut Reassembler) -> R,
    ) -> Option<R> {
        let index = {
            let cursors = self.cursors.lock();
            if cursors.is_empty() {
                return None;
            }
            cursors.read_index
        };

        // SAFETY: same argument as `ReadSlot::deref`; the turn pins `read_index`.
        let out = f(unsafe { &*self.slots[index].get() }, turn);
        self.release(index);
        Some(out)
    }

    /// Move `read_index` past `index` and wake a blocked writer.
    pub(crate) fn release(&self, index: usize) {
        let mut cursors = self.cursors.lock();
        debug_assert_eq!(cursors.read_index, index);
        debug_assert!(!cursors.is_empty());
        cursors.read_index = cursors.next(index);
        drop(cursors);

        tracing::trace!(index, "read index advanced");
        self.not_full.notify_one();
    }

    /// Shut the ring down and wake every waiter.
    ///
    /// Writers fail with `Closed` from now on; readers may still drain what
    /// was published.
    pub fn close(&self) {
        let mut cursors = self.cursors.lock();
        if cursors.closed {
            return;
        }
        cursors.closed = true;
        let unread = cursors.len();
        drop(cursors);

        tracing::debug!(unread, "ring buffer closed");
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    // Getters

    /// Number of slots, sentinel included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Published fragments not yet consumed.
    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    /// Fragments that can be published without blocking.
    pub fn free_slots(&self) -> usize {
        self.cursors.lock().free_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.cursors.lock().is_full()
    }

    pub fn is_closed(&self) -> bool {
        self.cursors.lock().closed
    }

    /// Messages consumers dropped because they could not be completed, such
    /// as one cut short by `close()`. Waits for the reader turn.
    pub fn discarded_messages(&self) -> u64 {
        self.reader.lock().discarded()
    }

    pub fn max_message_len(&self) -> Option<usize> {
        self.max_message_len
    }
}
