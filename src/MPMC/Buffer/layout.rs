/// Cache line width assumed when padding slots and cursor state.
pub const CACHE_LINE_SIZE: usize = 64;

/// Bytes of payload carried by one slot.
pub const MAX_FRAGMENT_SIZE: usize = 64;

/// Slot count used by the builder when none is given.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The cursor state of one ring, guarded by the ring's mutex.
///
/// Both indices live here so that neither can be read or moved without
/// holding the lock. One slot is always left empty: the ring is empty when
/// `write_index == read_index` and full when advancing `write_index` would
/// make the two equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursors {
    /// Next slot a producer will fill.
    pub write_index: usize,

    /// Oldest published slot not yet consumed.
    pub read_index: usize,

    /// Number of slots in the ring, sentinel included.
    pub capacity: usize,

    /// Set once by `close()`; never cleared.
    pub closed: bool,
}

impl Cursors {
    pub fn new(capacity: usize) -> Self {
        Self {
            write_index: 0,
            read_index: 0,
            capacity,
            closed: false,
        }
    }

    #[inline]
    pub fn next(&self, index: usize) -> usize {
        (index + 1) % self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_index == self.read_index
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.next(self.write_index) == self.read_index
    }

    /// Published fragments not yet consumed.
    #[inline]
    pub fn len(&self) -> usize {
        (self.write_index + self.capacity - self.read_index) % self.capacity
    }

    /// Fragments that can be published before a writer must wait.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.capacity - 1 - self.len()
    }
}

/// Number of slots a message of `len` bytes occupies. Empty messages still
/// take one slot so they can be observed by consumers.
#[inline]
pub fn fragments_for(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(MAX_FRAGMENT_SIZE)
    }
}
