//! Slot header
//!
//! Every heap slot carries a header with the collector's metadata.

/// Per-slot collector metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotHeader {
    /// Mark bit (true = reachable in the current cycle)
    marked: bool,

    /// Bumped every time the slot is freed, invalidating old references
    generation: u32,
}

impl SlotHeader {
    /// Check if this slot is marked
    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Mark this slot as reachable
    #[inline]
    pub fn mark(&mut self) {
        self.marked = true;
    }

    /// Unmark this slot (for next GC cycle)
    #[inline]
    pub fn unmark(&mut self) {
        self.marked = false;
    }

    /// Current generation
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Retire the current generation after the slot is freed
    #[inline]
    pub(crate) fn retire(&mut self) {
        self.marked = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_unmark() {
        let mut header = SlotHeader::default();
        assert!(!header.is_marked());
        header.mark();
        assert!(header.is_marked());
        header.unmark();
        assert!(!header.is_marked());
    }

    #[test]
    fn test_retire_bumps_generation() {
        let mut header = SlotHeader::default();
        header.mark();
        header.retire();
        assert_eq!(header.generation(), 1);
        assert!(!header.is_marked());
    }
}
