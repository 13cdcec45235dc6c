use super::Consumer;
use crate::error::{Result, RingError};
use crate::MPMC::Buffer::RingBuffer;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reassembled messages delivered by a background reader thread.
///
/// The thread takes whole messages off the ring and forwards them over a
/// bounded channel of `depth` messages. Stopping the stream (or dropping it)
/// closes the ring, so producers see `Closed` afterwards.
pub struct MessageStream {
    ring: Arc<RingBuffer>,
    rx: Option<Receiver<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
}

impl MessageStream {
    pub fn spawn(consumer: Consumer, depth: usize) -> io::Result<Self> {
        let ring = consumer.ring().clone();
        let (tx, rx) = mpsc::sync_channel(depth);

        let worker = thread::Builder::new()
            .name("frag-ring-reader".into())
            .spawn(move || read_loop(consumer, tx))?;

        Ok(Self {
            ring,
            rx: Some(rx),
            worker: Some(worker),
        })
    }

    /// Next message, or `None` once the ring is closed and drained.
    pub fn recv(&self) -> Option<Vec<u8>> {
        self.rx.as_ref()?.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>> {
        let rx = self.rx.as_ref().ok_or(RingError::Closed)?;
        rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => RingError::Timeout,
            RecvTimeoutError::Disconnected => RingError::Closed,
        })
    }

    /// Blocking iterator over messages until the stream ends.
    pub fn iter(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        std::iter::from_fn(move || self.recv())
    }

    /// Close the ring and wait for the reader thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Drop the receiver first so a reader blocked on a full channel exits.
        self.rx.take();
        self.ring.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("message stream reader panicked");
            }
        }
    }
}

impl Drop for MessageStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_loop(consumer: Consumer, tx: SyncSender<Vec<u8>>) {
    tracing::debug!("message stream reader started");
    loop {
        match consumer.receive_blocking() {
            Ok(message) => {
                if tx.send(message).is_err() {
                    break;
                }
            }
            Err(RingError::Closed) => break,
            Err(e) => {
                tracing::warn!(error = %e, "message stream reader stopped");
                break;
            }
        }
    }
    tracing::debug!(received = consumer.received(), "message stream reader exited");
}
