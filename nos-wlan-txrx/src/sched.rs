//! Round-robin drain scheduler
//!
//! One pass takes at most one frame from each unpaused interface per sweep,
//! in attach order, until the pass budget is spent or nothing is left. The
//! budget is the smaller of the configured per-pass limit and the hardware
//! descriptors above the admission margin, and every attempt consumes it
//! whether the hardware takes the frame or not. A pass therefore always
//! terminates, even when it is run from the data path.

use alloc::sync::Arc;

use nos_wlan_api::Milliseconds;

use crate::pdev::TxCore;
use crate::vdev::VirtualInterface;

/// Descriptors subtracted from the low watermark to get the margin
pub const DRAIN_SAFETY_MARGIN: u32 = 50;

/// Period of the device drain timer while backlog remains
pub const DRAIN_RESTART_MS: Milliseconds = 5;

/// Period of an interface's backlog restart timer
pub const BACKLOG_RESTART_MS: Milliseconds = 5;

/// Descriptors left untouched by backlog draining
pub fn admission_margin(low_watermark: u32) -> u32 {
    if low_watermark > DRAIN_SAFETY_MARGIN {
        low_watermark - DRAIN_SAFETY_MARGIN
    } else {
        low_watermark
    }
}

/// What one scheduler pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// The throttle was in its off phase; nothing was attempted
    pub throttled: bool,
    /// Budget the pass started with
    pub budget: u32,
    /// Frames accepted by the hardware
    pub sent: u32,
    /// Frames dequeued but refused (and dropped)
    pub dropped: u32,
    /// An unpaused interface still has backlog; the drain timer is armed
    pub backlog_remaining: bool,
}

impl DrainReport {
    pub fn attempts(&self) -> u32 {
        self.sent + self.dropped
    }
}

pub(crate) fn drain_pass(core: &TxCore, vdevs: &[Arc<VirtualInterface>]) -> DrainReport {
    let mut report = DrainReport::default();
    if !core.throttle.allows_send() {
        report.throttled = true;
        return report;
    }
    core.counters.inc_sched_pass();

    let headroom = core
        .hw
        .free_descriptor_count()
        .saturating_sub(admission_margin(core.config.low_watermark));
    let mut budget = headroom.min(core.config.tx_budget_per_pass);
    report.budget = budget;

    while budget > 0 {
        let mut progressed = false;
        for vdev in vdevs {
            if budget == 0 {
                break;
            }
            let Some(buf) = vdev.dequeue_for_scheduler() else {
                continue;
            };
            progressed = true;
            budget -= 1;
            match core.hw_send(vdev, buf) {
                Ok(()) => report.sent += 1,
                Err(_) => report.dropped += 1,
            }
        }
        if !progressed {
            break;
        }
    }
    core.counters.inc_sched_sent(u64::from(report.sent));

    report.backlog_remaining = vdevs.iter().any(|vdev| vdev.has_unpaused_backlog());
    if report.backlog_remaining {
        core.drain_timer.start(core.now(), DRAIN_RESTART_MS);
    } else {
        core.drain_timer.cancel();
    }

    if report.dropped > 0 {
        crate::tx_debug!(
            "drain pass: sent {}, dropped {}, budget {}",
            report.sent,
            report.dropped,
            report.budget
        );
    }
    report
}
