// src/MPMC/consumer.rs

use crate::error::{Result, RingError};
use crate::Core::wait::Deadline;
use crate::MPMC::Buffer::RingBuffer;
use crate::MPMC::Structs::Buffer_Structs::Fragment;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A consumer for receiving whole messages from a ring buffer.
///
/// Each receive call takes the ring's reader turn for the whole message, so
/// concurrent consumers never split one message between them. A message left
/// half-read by a timeout stays with the ring and is completed by whichever
/// consumer takes the turn next.
pub struct Consumer {
    ring: Arc<RingBuffer>,
    read_timeout: Option<Duration>,
    received: AtomicU64,
}

impl Consumer {
    pub(crate) fn new(ring: Arc<RingBuffer>, read_timeout: Option<Duration>) -> Self {
        Self {
            ring,
            read_timeout,
            received: AtomicU64::new(0),
        }
    }

    /// Receives a message, waiting at most the configured read timeout
    /// (forever if none was set).
    pub fn receive(&self) -> Result<Vec<u8>> {
        self.receive_until(Deadline::from_option(self.read_timeout))
    }

    /// Receives a message, blocking until one is complete or the ring is
    /// closed and drained.
    pub fn receive_blocking(&self) -> Result<Vec<u8>> {
        self.receive_until(Deadline::never())
    }

    /// Receives a message, waiting up to `timeout`.
    ///
    /// # Returns
    /// * `Ok(Some(data))` if a message was received
    /// * `Ok(None)` if the timeout was reached
    /// * `Err(Closed)` if the ring was closed and drained
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.receive_until(Deadline::after(timeout)) {
            Ok(message) => Ok(Some(message)),
            Err(RingError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Receives a message only if one is already complete in the ring.
    pub fn try_receive(&self) -> Result<Option<Vec<u8>>> {
        self.receive_timeout(Duration::ZERO)
    }

    fn receive_until(&self, deadline: Deadline) -> Result<Vec<u8>> {
        let mut turn = deadline.lock(&*self.ring.reader)?;

        loop {
            if let Err(err) = self.ring.wait_until_readable(deadline) {
                if err == RingError::Closed && turn.reset() {
                    tracing::warn!("discarding truncated message left by a closed ring");
                }
                return Err(err);
            }

            let completed = self.ring.consume_with(&mut turn, |slot, partial| {
                let message = partial.push(slot.meta(), slot.payload());
                debug_assert!(message.is_none() || slot.is_last());
                message
            });
            if let Some(Some(message)) = completed {
                self.received.fetch_add(1, Ordering::Relaxed);
                return Ok(message);
            }
        }
    }

    /// Reads a single fragment, blocking until one is published.
    ///
    /// Bypasses reassembly; mixing this with message reads on the same ring
    /// makes the message reads discard whatever they see half-finished.
    pub fn read_fragment(&self) -> Result<Fragment> {
        let mut turn = self.ring.reader.lock();
        loop {
            self.ring.wait_for_data()?;
            if let Some(fragment) = self.ring.consume_with(&mut turn, |slot, _| slot.to_fragment()) {
                return Ok(fragment);
            }
        }
    }

    /// Number of whole messages this handle has received.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// The ring this consumer reads from.
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl Clone for Consumer {
    fn clone(&self) -> Self {
        Self::new(self.ring.clone(), self.read_timeout)
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("ring", &self.ring)
            .field("read_timeout", &self.read_timeout)
            .field("received", &self.received())
            .finish()
    }
}
