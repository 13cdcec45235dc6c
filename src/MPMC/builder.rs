use super::{Consumer, Producer};
use crate::error::Result;
use crate::Core::alloc::allocate_slots;
use crate::MPMC::Buffer::layout::DEFAULT_CAPACITY;
use crate::MPMC::Buffer::{RingBuffer, Slot};
use std::sync::Arc;
use std::time::Duration;

pub struct RingBufferBuilder {
    capacity: usize,
    storage: Option<Box<[Slot]>>,
    max_message_len: Option<usize>,
    write_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl Default for RingBufferBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY, // 1024 slots
            storage: None,
            max_message_len: None, // unbounded
            write_timeout: None,   // block until published
            read_timeout: None,    // block until a message completes
        }
    }
}

impl RingBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots to allocate, sentinel included.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Use caller-provided slot storage instead of allocating; the capacity
    /// becomes `storage.len()`.
    pub fn with_storage(mut self, storage: Box<[Slot]>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Reject writes longer than `len` bytes with `WriteTooLarge`.
    pub fn with_max_message_len(mut self, len: usize) -> Self {
        self.max_message_len = Some(len);
        self
    }

    /// Default deadline for `Producer::send`.
    ///
    /// A deadline send publishes a message only once all of it fits, so with
    /// this set `send` rejects messages longer than
    /// `(capacity - 1) * MAX_FRAGMENT_SIZE` bytes with `WriteTooLarge`, even
    /// when no maximum message length is configured. Use
    /// `RingBuffer::write` for unbounded blocking writes.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Default deadline for `Consumer::receive`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Arc<RingBuffer>> {
        self.build_parts().map(|(ring, _, _)| ring)
    }

    /// Build a ring and return one producer and one consumer on it.
    /// Clone either handle for more threads.
    pub fn build_channel(self) -> Result<(Producer, Consumer)> {
        let (ring, write_timeout, read_timeout) = self.build_parts()?;
        Ok((
            Producer::new(ring.clone(), write_timeout),
            Consumer::new(ring, read_timeout),
        ))
    }

    fn build_parts(self) -> Result<(Arc<RingBuffer>, Option<Duration>, Option<Duration>)> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => allocate_slots(self.capacity)?,
        };
        let ring = RingBuffer::with_storage(storage, self.max_message_len)?;
        Ok((Arc::new(ring), self.write_timeout, self.read_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RingError;

    #[test]
    fn defaults() {
        let ring = RingBufferBuilder::new().build().unwrap();
        assert_eq!(ring.capacity(), DEFAULT_CAPACITY);
        assert_eq!(ring.max_message_len(), None);
    }

    #[test]
    fn storage_overrides_capacity() {
        let storage = vec![Slot::new(); 5].into_boxed_slice();
        let ring = RingBufferBuilder::new()
            .with_capacity(64)
            .with_storage(storage)
            .build()
            .unwrap();
        assert_eq!(ring.capacity(), 5);
    }

    #[test]
    fn invalid_capacity() {
        assert_eq!(
            RingBufferBuilder::new().with_capacity(0).build().unwrap_err(),
            RingError::InvalidCapacity { capacity: 0 }
        );
    }

    #[test]
    fn channel_timeouts() {
        let (producer, consumer) = RingBufferBuilder::new()
            .with_capacity(2)
            .with_write_timeout(Duration::from_millis(10))
            .with_read_timeout(Duration::from_millis(10))
            .build_channel()
            .unwrap();

        assert_eq!(consumer.receive(), Err(RingError::Timeout));
        assert_eq!(producer.send(b"one"), Ok(3));
        assert_eq!(producer.send(b"two"), Err(RingError::Timeout));
        assert_eq!(consumer.receive().unwrap(), b"one");
        assert_eq!(producer.sent(), 1);
        assert_eq!(consumer.received(), 1);
    }

    #[test]
    fn write_timeout_bounds_send_to_usable_slots() {
        let (producer, _consumer) = RingBufferBuilder::new()
            .with_capacity(3)
            .with_write_timeout(Duration::from_millis(10))
            .build_channel()
            .unwrap();
        let max = 2 * crate::MAX_FRAGMENT_SIZE;

        assert_eq!(
            producer.send(vec![0u8; max + 1]),
            Err(RingError::WriteTooLarge { len: max + 1, max })
        );
        assert_eq!(producer.send(vec![0u8; max]), Ok(max));
        // The plain blocking write has no such bound.
        assert_eq!(producer.ring().max_message_len(), None);
    }
}
