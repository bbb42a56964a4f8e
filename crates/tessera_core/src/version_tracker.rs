//! Dirty-frame counters.
//!
//! Consumers cache work keyed on a counter value and redo it only when the
//! counter they observe differs from their snapshot. The counter is never
//! reset, only bumped.

/// Monotonic wrapping counter used as a dirty marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    /// Creates a tracker at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Creates a tracker at the `u64::MAX` sentinel.
    ///
    /// The first [`changed`](Self::changed) wraps it to 0, so no snapshot
    /// taken before any change can match a post-change version.
    #[must_use]
    pub fn never() -> Self {
        Self { version: u64::MAX }
    }

    /// Marks as modified, increments version by 1 (wrapping).
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Overwrites the version, used when copying state between owners.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_wraps_to_zero() {
        let mut tracker = ChangeTracker::never();
        assert_eq!(tracker.version(), u64::MAX);
        tracker.changed();
        assert_eq!(tracker.version(), 0);
    }
}
