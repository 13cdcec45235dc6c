// src/MPMC/producer.rs

use crate::error::Result;
use crate::Core::wait::Deadline;
use crate::MPMC::Buffer::RingBuffer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A producer for sending messages through a ring buffer.
///
/// Messages of any length are accepted (up to the ring's configured ceiling);
/// the ring fragments them into slots. Producers are cheap to clone and each
/// clone may run on its own thread.
pub struct Producer {
    ring: Arc<RingBuffer>,
    write_timeout: Option<Duration>,
    sent: AtomicU64,
}

impl Producer {
    pub(crate) fn new(ring: Arc<RingBuffer>, write_timeout: Option<Duration>) -> Self {
        Self {
            ring,
            write_timeout,
            sent: AtomicU64::new(0),
        }
    }

    /// Sends a message through the ring.
    ///
    /// Uses the configured write timeout; without one this blocks until the
    /// whole message has been published.
    ///
    /// # Returns
    /// * `Ok(len)` once every fragment is published
    /// * `Err(WriteTooLarge)` if the message exceeds the configured ceiling
    /// * `Err(Timeout)` if the deadline passed before anything was published
    /// * `Err(Closed)` if the ring is closed
    pub fn send<T: AsRef<[u8]>>(&self, message: T) -> Result<usize> {
        self.send_until(message.as_ref(), Deadline::from_option(self.write_timeout))
    }

    /// Sends a message, giving up after `timeout`.
    pub fn send_timeout<T: AsRef<[u8]>>(&self, message: T, timeout: Duration) -> Result<usize> {
        self.send_until(message.as_ref(), Deadline::after(timeout))
    }

    /// Sends a message only if the ring has room for all of it right now.
    pub fn try_send<T: AsRef<[u8]>>(&self, message: T) -> Result<usize> {
        self.send_timeout(message, Duration::ZERO)
    }

    fn send_until(&self, message: &[u8], deadline: Deadline) -> Result<usize> {
        let written = self.ring.write_until(message, deadline)?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(written)
    }

    /// Number of messages this handle has sent.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Close the ring for every producer and consumer.
    pub fn close(&self) {
        self.ring.close();
    }

    /// The ring this producer writes to.
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl Clone for Producer {
    fn clone(&self) -> Self {
        Self::new(self.ring.clone(), self.write_timeout)
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("ring", &self.ring)
            .field("write_timeout", &self.write_timeout)
            .field("sent", &self.sent())
            .finish()
    }
}
