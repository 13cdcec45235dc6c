use crate::Core::alloc::storage_bytes;
use crate::MPMC::Buffer::{ReadSlot, RingBuffer, Slot};
use std::fmt;

/// Debug function for RingBuffer
///
/// Shows the cursor state without blocking: if another thread holds the
/// cursor lock the indices are reported as `<locked>`.
pub fn debug_ring_buffer(buffer: &RingBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("RingBuffer");
    s.field("capacity", &buffer.capacity())
        .field("slots", &format_args!("{:p}", buffer.slots.as_ptr()))
        .field("storage_bytes", &storage_bytes(buffer.capacity()))
        .field("max_message_len", &buffer.max_message_len());

    match buffer.cursors.try_lock() {
        Some(cursors) => s
            .field("write_index", &cursors.write_index)
            .field("read_index", &cursors.read_index)
            .field("closed", &cursors.closed),
        None => s.field("cursors", &"<locked>"),
    };
    s.finish()
}

/// Debug function for Slot
///
/// Payload bytes are summarised by length only.
pub fn debug_slot(slot: &Slot, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Slot")
        .field("total_length", &slot.total_length())
        .field("fragment_offset", &slot.fragment_offset())
        .field("fragment_len", &slot.fragment_len())
        .finish_non_exhaustive()
}

pub fn debug_read_slot(view: &ReadSlot<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReadSlot")
        .field("index", &view.index())
        .field("slot", &**view)
        .finish()
}
