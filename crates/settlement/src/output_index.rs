//! Output index allocation.

use utxo_core::{OutputKey, TxDigest};

/// Hands out output indices for one settlement: 0, 1, 2, …
///
/// Each settlement creates its own allocator; nothing carries over between
/// calls, so uniqueness of output keys across transactions comes from the
/// digest prefix, not from this counter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputIndexAllocator {
    next: u32,
}

impl OutputIndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u32 {
        let index = self.next;
        self.next += 1;
        index
    }

    /// Allocate the next index and build the key `digest:index`.
    pub fn next_key(&mut self, digest: &TxDigest) -> OutputKey {
        digest.output_key(self.allocate())
    }

    /// How many indices have been handed out.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
