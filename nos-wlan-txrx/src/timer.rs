//! One-shot deadline timers
//!
//! The transmit path has no timer interrupt of its own. Each mechanism owns
//! a `OneShotTimer` holding an absolute deadline, and the host's periodic
//! tick calls `PhysicalDevice::poll_timers`, which fires every timer whose
//! deadline has passed. Firing disarms the timer; callbacks re-arm it when
//! they still have work.

use nos_wlan_api::Milliseconds;
use nos_wlan_api::sync::{AtomicU64, Ordering};

const DISARMED: u64 = u64::MAX;

#[derive(Debug)]
pub struct OneShotTimer {
    deadline: AtomicU64,
}

impl OneShotTimer {
    pub const fn new() -> Self {
        Self {
            deadline: AtomicU64::new(DISARMED),
        }
    }

    /// Arm (or re-arm) the timer to expire `period` after `now`
    pub fn start(&self, now: Milliseconds, period: Milliseconds) {
        let deadline = now.saturating_add(period).min(DISARMED - 1);
        self.deadline.store(deadline, Ordering::Release);
    }

    pub fn cancel(&self) {
        self.deadline.store(DISARMED, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.load(Ordering::Acquire) != DISARMED
    }

    pub fn deadline(&self) -> Option<Milliseconds> {
        match self.deadline.load(Ordering::Acquire) {
            DISARMED => None,
            d => Some(d),
        }
    }

    /// Disarm and report true if the deadline has passed.
    ///
    /// Exactly one concurrent caller observes a given expiry.
    pub fn fire(&self, now: Milliseconds) -> bool {
        let current = self.deadline.load(Ordering::Acquire);
        if current == DISARMED || current > now {
            return false;
        }
        self.deadline
            .compare_exchange(current, DISARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for OneShotTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_once() {
        let timer = OneShotTimer::new();
        assert!(!timer.fire(100));
        timer.start(10, 5);
        assert_eq!(timer.deadline(), Some(15));
        assert!(!timer.fire(14));
        assert!(timer.fire(15));
        assert!(!timer.is_armed());
        assert!(!timer.fire(20));
    }

    #[test]
    fn test_restart_moves_deadline() {
        let timer = OneShotTimer::new();
        timer.start(0, 5);
        timer.start(4, 5);
        assert!(!timer.fire(5));
        assert!(timer.fire(9));
    }

    #[test]
    fn test_cancel() {
        let timer = OneShotTimer::new();
        timer.start(0, 1);
        timer.cancel();
        assert!(!timer.fire(u64::MAX - 1));
    }
}
