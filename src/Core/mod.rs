pub mod alloc;
pub mod wait;

pub use alloc::allocate_slots;
pub use wait::Deadline;
