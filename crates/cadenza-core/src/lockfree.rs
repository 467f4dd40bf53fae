//! Lock-free cells shared between the scheduling thread and callers.

use core::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::RealTime;

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub const fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Clone for AtomicFlag {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Cache-line aligned [`RealTime`] stored as signed nanoseconds.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicRealTime {
    nanos: AtomicI64,
}

impl AtomicRealTime {
    pub fn new(value: RealTime) -> Self {
        Self {
            nanos: AtomicI64::new(value.to_nanos()),
        }
    }

    #[inline]
    pub fn get(&self) -> RealTime {
        RealTime::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, value: RealTime) {
        self.nanos.store(value.to_nanos(), Ordering::Release);
    }

    /// Adds `delta` and returns the new value.
    #[inline]
    pub fn advance(&self, delta: RealTime) -> RealTime {
        let delta = delta.to_nanos();
        let prev = self.nanos.fetch_add(delta, Ordering::AcqRel);
        RealTime::from_nanos(prev.saturating_add(delta))
    }
}

impl Clone for AtomicRealTime {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicRealTime {
    fn default() -> Self {
        Self::new(RealTime::ZERO)
    }
}
