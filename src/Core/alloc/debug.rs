use crate::MPMC::Buffer::{ReadSlot, RingBuffer, Slot};
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_ring_buffer(self, f)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_slot(self, f)
    }
}

impl fmt::Debug for ReadSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_read_slot(self, f)
    }
}
