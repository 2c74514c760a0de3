//! System time for the tick interrupt
//!
//! Timer 0 overflows far faster than the scheduler quantum; the divider
//! counts overflows and reports when a full quantum has elapsed.

use portable_atomic::{AtomicU16, AtomicU32, Ordering};

pub struct TickDivider {
    overflows: AtomicU16,
    threshold: u16,
    quanta: AtomicU32,
}

impl TickDivider {
    pub const fn new(threshold: u16) -> Self {
        Self {
            overflows: AtomicU16::new(0),
            threshold,
            quanta: AtomicU32::new(0),
        }
    }

    /// Count one timer overflow. Returns true when a quantum has elapsed.
    #[inline]
    pub fn overflow(&self) -> bool {
        let count = self.overflows.load(Ordering::Relaxed).wrapping_add(1);
        if count >= self.threshold {
            self.overflows.store(0, Ordering::Relaxed);
            self.quanta.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.overflows.store(count, Ordering::Relaxed);
            false
        }
    }

    /// Quanta elapsed since start-up.
    #[inline]
    pub fn uptime(&self) -> u32 {
        self.quanta.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantum_every_threshold_overflows() {
        let divider = TickDivider::new(3);
        let fired: Vec<bool> = (0..7).map(|_| divider.overflow()).collect();
        assert_eq!(fired, [false, false, true, false, false, true, false]);
        assert_eq!(divider.uptime(), 2);
    }

    #[test]
    fn zero_threshold_fires_every_overflow() {
        let divider = TickDivider::new(0);
        assert!(divider.overflow());
        assert!(divider.overflow());
        assert_eq!(divider.uptime(), 2);
    }
}
