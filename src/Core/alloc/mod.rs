use crate::error::{Result, RingError};
use crate::MPMC::Buffer::Slot;
use std::mem::size_of;
mod debug;

/// Smallest ring that holds the sentinel plus one live slot.
pub const MIN_CAPACITY: usize = 2;

/// Allocate zeroed, cache-aligned storage for `capacity` slots.
///
/// The allocation is fallible: if the memory cannot be obtained the caller
/// gets `AllocationFailure` instead of an abort.
pub fn allocate_slots(capacity: usize) -> Result<Box<[Slot]>> {
    if capacity < MIN_CAPACITY {
        return Err(RingError::InvalidCapacity { capacity });
    }

    let mut slots: Vec<Slot> = Vec::new();
    slots.try_reserve_exact(capacity).map_err(|e| {
        tracing::warn!(capacity, error = %e, "slot storage allocation failed");
        RingError::AllocationFailure { capacity }
    })?;
    slots.resize_with(capacity, Slot::new);

    Ok(slots.into_boxed_slice())
}

/// Bytes of backing memory a ring of `capacity` slots occupies.
pub fn storage_bytes(capacity: usize) -> Option<usize> {
    capacity.checked_mul(size_of::<Slot>())
}
