use crate::MPMC::Structs::Buffer_Structs::FragmentMeta;

/// Rebuilds logical messages from the fragment stream.
///
/// Fragments must arrive in ring order. A fragment at offset 0 starts a new
/// message; anything that does not continue the message in progress is
/// dropped together with the partial message.
#[derive(Debug, Default)]
pub struct Reassembler {
    buf: Vec<u8>,
    total_length: Option<u64>,
    // Length of the message whose remaining fragments are being dropped.
    skipping: Option<u64>,
    discarded: u64,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment. Returns the message once its last fragment is in.
    pub fn push(&mut self, meta: FragmentMeta, payload: &[u8]) -> Option<Vec<u8>> {
        if meta.is_first() {
            if self.reset() {
                tracing::warn!(
                    total_length = meta.total_length,
                    "new message started before the previous one completed"
                );
            }
            self.total_length = Some(meta.total_length);
            self.buf.reserve(meta.total_length as usize);
        } else {
            let continues = self.total_length == Some(meta.total_length)
                && meta.fragment_offset == self.buf.len() as u64;
            if !continues {
                tracing::warn!(
                    total_length = meta.total_length,
                    fragment_offset = meta.fragment_offset,
                    received = self.buf.len(),
                    "dropping fragment that does not continue the current message"
                );
                let same_message = self.total_length == Some(meta.total_length);
                self.reset();
                if !same_message && self.skipping != Some(meta.total_length) {
                    self.discarded += 1;
                }
                self.skipping = Some(meta.total_length);
                return None;
            }
        }

        self.buf.extend_from_slice(payload);
        if self.buf.len() as u64 >= meta.total_length {
            self.total_length = None;
            return Some(std::mem::take(&mut self.buf));
        }
        None
    }

    /// A message has started but not completed.
    pub fn in_progress(&self) -> bool {
        self.total_length.is_some()
    }

    /// Bytes accumulated for the message in progress.
    pub fn received(&self) -> usize {
        self.buf.len()
    }

    /// Messages dropped because they could not be completed.
    ///
    /// Counts each message once, whether it was cut short after its first
    /// fragment or its first fragment was never seen.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop any partial message. Returns true if one was dropped.
    pub fn reset(&mut self) -> bool {
        let dropped = self.in_progress();
        if dropped {
            self.discarded += 1;
        }
        self.total_length = None;
        self.skipping = None;
        self.buf.clear();
        dropped
    }
}
