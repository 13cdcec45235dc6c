// Module naming follows project convention (MPMC = Multi-Producer Multi-Consumer)
#[allow(non_snake_case)]
pub mod MPMC;

#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

pub mod error;
pub mod ffi;

pub use error::{RingError, Result};
pub use MPMC::Buffer::{ReadSlot, RingBuffer, Slot, CACHE_LINE_SIZE, MAX_FRAGMENT_SIZE};
pub use MPMC::{Consumer, MessageStream, Producer, Reassembler, RingBufferBuilder};
