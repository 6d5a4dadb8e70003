//! Load-driven enable/disable of ACK coalescing and bundling
//!
//! Both mechanisms only pay off under sustained load. The host samples its
//! traffic periodically and feeds the numbers in; a high/low watermark pair
//! gives hysteresis so a flow hovering around one mark does not flap.

use nos_wlan_api::Milliseconds;
use nos_wlan_api::sync::{AtomicBool, Ordering};

/// Bytes per frame the bundle watermarks are expressed in
pub const BUNDLE_REF_FRAME_BYTES: u64 = 1500;

/// Decide the ACK coalescing state from received packets in the last period.
///
/// Returns `None` when the state should stay as it is.
pub fn ack_coalescing_decision(rx_packets: u64, high: u64, low: u64) -> Option<bool> {
    if low > high {
        return None;
    }
    if rx_packets > high {
        Some(true)
    } else if rx_packets < low {
        Some(false)
    } else {
        None
    }
}

/// Decide the bundling state from bytes sent during `time_ms`.
///
/// `high` and `low` are frame rates per second; they are scaled to bytes
/// over the sampling period.
pub fn bundling_decision(tx_bytes: u64, time_ms: Milliseconds, high: u64, low: u64) -> Option<bool> {
    if low > high {
        return None;
    }
    let scale = |rate: u64| rate.saturating_mul(time_ms).saturating_mul(BUNDLE_REF_FRAME_BYTES) / 1000;
    if tx_bytes > scale(high) {
        Some(true)
    } else if tx_bytes < scale(low) {
        Some(false)
    } else {
        None
    }
}

/// One dynamically switched feature of an interface
#[derive(Debug)]
pub struct AdaptiveSwitch {
    enabled: AtomicBool,
}

impl AdaptiveSwitch {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Force a state; returns the previous one
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    /// Apply a decision; true if the state changed
    pub fn apply(&self, decision: Option<bool>) -> bool {
        match decision {
            Some(enabled) => self.set(enabled) != enabled,
            None => false,
        }
    }
}
