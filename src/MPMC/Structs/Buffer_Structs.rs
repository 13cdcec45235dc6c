// Reassembly metadata carried by every slot, plus the owned copy handed to consumers

use crate::MPMC::Buffer::MAX_FRAGMENT_SIZE;

/// Per-fragment metadata that precedes the payload in a Slot.
/// Fixed-width fields so the slot layout is stable if it is ever shared.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentMeta {
    /// Length of the whole logical message, repeated on every fragment.
    pub total_length: u64,
    /// Byte offset of this fragment within the logical message.
    pub fragment_offset: u64,
}

impl FragmentMeta {
    /// Number of payload bytes this fragment carries.
    #[inline]
    pub fn fragment_len(&self) -> usize {
        let remaining = self.total_length.saturating_sub(self.fragment_offset);
        remaining.min(MAX_FRAGMENT_SIZE as u64) as usize
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.fragment_offset == 0
    }

    /// True when this fragment completes its message.
    #[inline]
    pub fn is_last(&self) -> bool {
        self.fragment_offset + self.fragment_len() as u64 >= self.total_length
    }
}

/// An owned copy of one fragment, detached from the ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub meta: FragmentMeta,
    pub payload: Vec<u8>,
}

impl Fragment {
    pub fn total_length(&self) -> u64 {
        self.meta.total_length
    }

    pub fn fragment_offset(&self) -> u64 {
        self.meta.fragment_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_len_clamps_to_slot() {
        let meta = FragmentMeta { total_length: 200, fragment_offset: 128 };
        assert_eq!(meta.fragment_len(), 64);
        assert!(!meta.is_last());

        let tail = FragmentMeta { total_length: 200, fragment_offset: 192 };
        assert_eq!(tail.fragment_len(), 8);
        assert!(tail.is_last());
    }

    #[test]
    fn empty_message_is_single_fragment() {
        let meta = FragmentMeta::default();
        assert_eq!(meta.fragment_len(), 0);
        assert!(meta.is_first());
        assert!(meta.is_last());
    }
}
