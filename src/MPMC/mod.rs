mod builder;
mod consumer;
mod producer;
mod reassembly;
mod stream;

pub use builder::RingBufferBuilder;
pub use consumer::Consumer;
pub use producer::Producer;
pub use reassembly::Reassembler;
pub use stream::MessageStream;

pub mod Buffer {
    pub mod Buffer;
    pub mod Buffer_impl;
    pub mod layout;
    pub use Buffer::{ReadSlot, RingBuffer, Slot, CACHE_LINE_SIZE, MAX_FRAGMENT_SIZE}; // re-export for stable path
}

pub mod Structs {
    pub mod Buffer_Structs;
    pub use Buffer_Structs::{Fragment, FragmentMeta}; // re-export for stable path
}
