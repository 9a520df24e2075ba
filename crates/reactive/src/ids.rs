//! Monotonic identifiers for dependency sets, watchers and containers.
//!
//! Identifiers are handed out from process-wide atomic counters, so a higher
//! id always means a later creation. The scheduler relies on this ordering:
//! watchers created earlier (parents, render watchers) flush first.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter producing strictly increasing raw ids.
#[derive(Debug)]
pub struct IdCounter {
    current: AtomicU64,
}

impl IdCounter {
    /// Create a counter whose first id is `0`.
    #[inline]
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Return the next id.
    #[inline]
    pub fn next_raw(&self) -> u64 {
        self.current.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdCounter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

static DEP_IDS: IdCounter = IdCounter::new();
static WATCHER_IDS: IdCounter = IdCounter::new();
static CONTAINER_IDS: IdCounter = IdCounter::new();

/// Identity of a [`Dep`](crate::Dep).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DepId(u64);

impl DepId {
    #[inline]
    pub(crate) fn next() -> Self {
        Self(DEP_IDS.next_raw())
    }

    /// Raw numeric value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Creation-order identity of a [`Watcher`](crate::Watcher).
///
/// Flushes run watchers in ascending id order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct WatcherId(u64);

impl WatcherId {
    #[inline]
    pub(crate) fn next() -> Self {
        Self(WATCHER_IDS.next_raw())
    }

    /// Raw numeric value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatcherId {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Identity of an object or array container, used as the observer side-table key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ContainerId(u64);

impl ContainerId {
    #[inline]
    pub(crate) fn next() -> Self {
        Self(CONTAINER_IDS.next_raw())
    }

    /// Raw numeric value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_in_creation_order() {
        let first = WatcherId::next();
        let second = WatcherId::next();
        assert!(second > first);
        assert_ne!(DepId::next(), DepId::next());
    }

    #[test]
    fn counter_starts_at_zero() {
        let counter = IdCounter::new();
        assert_eq!(counter.next_raw(), 0);
        assert_eq!(counter.next_raw(), 1);
    }
}
