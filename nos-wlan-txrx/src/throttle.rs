//! Thermal throttle state of a physical device
//!
//! The thermal code owns the duty cycle and pushes level/phase changes in
//! through `PhysicalDevice::set_throttle`. The transmit path only reads it.

use nos_wlan_api::sync::{AtomicBool, AtomicU8, Ordering};
use nos_wlan_api::{ThrottleLevel, ThrottlePhase};

#[derive(Debug)]
pub struct ThrottleState {
    level: AtomicU8,
    phase_on: AtomicBool,
}

impl ThrottleState {
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(0),
            phase_on: AtomicBool::new(true),
        }
    }

    pub fn set(&self, level: ThrottleLevel, phase: ThrottlePhase) {
        self.level.store(level_to_u8(level), Ordering::Release);
        self.phase_on.store(phase == ThrottlePhase::On, Ordering::Release);
    }

    pub fn level(&self) -> ThrottleLevel {
        match self.level.load(Ordering::Acquire) {
            0 => ThrottleLevel::Level0,
            1 => ThrottleLevel::Level1,
            2 => ThrottleLevel::Level2,
            _ => ThrottleLevel::Level3,
        }
    }

    pub fn phase(&self) -> ThrottlePhase {
        if self.phase_on.load(Ordering::Acquire) {
            ThrottlePhase::On
        } else {
            ThrottlePhase::Off
        }
    }

    /// Throttling is active at any level above zero
    pub fn is_engaged(&self) -> bool {
        self.level() != ThrottleLevel::Level0
    }

    /// Whether frames may be handed to the hardware right now
    pub fn allows_send(&self) -> bool {
        !self.is_engaged() || self.phase() == ThrottlePhase::On
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new()
    }
}

fn level_to_u8(level: ThrottleLevel) -> u8 {
    match level {
        ThrottleLevel::Level0 => 0,
        ThrottleLevel::Level1 => 1,
        ThrottleLevel::Level2 => 2,
        ThrottleLevel::Level3 => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_send() {
        let state = ThrottleState::new();
        assert!(!state.is_engaged());
        assert!(state.allows_send());
    }

    #[test]
    fn test_off_phase_blocks() {
        let state = ThrottleState::new();
        state.set(ThrottleLevel::Level2, ThrottlePhase::Off);
        assert_eq!(state.level(), ThrottleLevel::Level2);
        assert!(state.is_engaged());
        assert!(!state.allows_send());

        state.set(ThrottleLevel::Level2, ThrottlePhase::On);
        assert!(state.allows_send());
    }

    #[test]
    fn test_level_zero_ignores_phase() {
        let state = ThrottleState::new();
        state.set(ThrottleLevel::Level0, ThrottlePhase::Off);
        assert!(state.allows_send());
    }
}
