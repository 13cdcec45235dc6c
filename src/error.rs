//! Error types for the ring buffer.

use std::io;

/// Errors surfaced by ring buffer construction, writes and waits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// Capacity cannot hold the sentinel slot plus at least one live slot.
    #[error("invalid capacity {capacity}: a ring needs at least 2 slots")]
    InvalidCapacity { capacity: usize },

    /// Backing storage for the slots could not be obtained.
    #[error("failed to allocate storage for {capacity} slots")]
    AllocationFailure { capacity: usize },

    /// The message exceeds the configured ceiling (or, for deadline writes,
    /// cannot fit in the ring at once).
    #[error("message too large ({len} > {max})")]
    WriteTooLarge { len: usize, max: usize },

    /// Programmer error, e.g. destroying a buffer that is still shared.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    /// A deadline elapsed before the operation could make progress.
    #[error("operation timed out")]
    Timeout,

    /// The buffer was closed.
    #[error("ring buffer closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RingError>;

impl From<RingError> for io::Error {
    fn from(err: RingError) -> Self {
        let kind = match err {
            RingError::InvalidCapacity { .. } => io::ErrorKind::InvalidInput,
            RingError::AllocationFailure { .. } => io::ErrorKind::OutOfMemory,
            RingError::WriteTooLarge { .. } => io::ErrorKind::InvalidInput,
            RingError::PreconditionViolation(_) => io::ErrorKind::Other,
            RingError::Timeout => io::ErrorKind::WouldBlock,
            RingError::Closed => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}
