//! Shared block-number allocator.
//!
//! Seeded from the contract's recorded block count at startup, advanced on
//! every discovery, and resynchronized after each settled batch so that
//! numbers stay ahead of blocks minted through any path.

/// Monotonic source of pseudo-block numbers across all sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCounter {
    next: u64,
}

impl BlockCounter {
    pub fn new(seed: u64) -> Self {
        Self { next: seed }
    }

    /// The number the next discovery will receive.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Hand out the current number and advance.
    pub fn allocate(&mut self) -> u64 {
        let number = self.next;
        self.next += 1;
        number
    }

    /// Catch up with the chain's confirmed block count.
    ///
    /// Never moves backwards: numbers already handed to pending blocks must
    /// not be issued twice. Returns `true` if the counter advanced.
    pub fn resync(&mut self, confirmed: u64) -> bool {
        if confirmed > self.next {
            self.next = confirmed;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_sequential() {
        let mut counter = BlockCounter::new(260);
        assert_eq!(counter.allocate(), 260);
        assert_eq!(counter.allocate(), 261);
        assert_eq!(counter.peek(), 262);
    }

    #[test]
    fn resync_moves_forward() {
        let mut counter = BlockCounter::new(10);
        assert!(counter.resync(25));
        assert_eq!(counter.peek(), 25);
    }

    #[test]
    fn resync_never_moves_backward() {
        let mut counter = BlockCounter::new(10);
        counter.allocate();
        counter.allocate();
        assert!(!counter.resync(11));
        assert_eq!(counter.peek(), 12);
        assert!(!counter.resync(12));
    }
}
