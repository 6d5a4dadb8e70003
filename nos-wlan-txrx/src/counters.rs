//! Transmit path statistics
//!
//! Counters are plain relaxed atomics updated from the data path and the
//! timer context; `snapshot()` copies them out for reporting.

use nos_wlan_api::sync::{AtomicU64, Ordering};

/// Per-interface counters
#[derive(Debug, Default)]
pub struct VdevCounters {
    /// Frames accepted by the hardware
    pub tx_packets: AtomicU64,
    /// Bytes accepted by the hardware
    pub tx_bytes: AtomicU64,
    /// Frames appended to the backlog queue
    pub queued: AtomicU64,
    /// Frames refused because the backlog was at `max_q_depth`
    pub dropped_queue_full: AtomicU64,
    /// Frames dropped after the hardware refused them
    pub dropped_hw_reject: AtomicU64,
    /// Frames dropped by an explicit flush or detach
    pub dropped_flush: AtomicU64,
    /// Times the backlog was found at or above `max_q_depth`
    pub overflow_events: AtomicU64,
    /// Pending ACKs replaced by a newer one on the same flow
    pub ack_replaced: AtomicU64,
    /// Coalescing entries released towards the hardware
    pub ack_flushed: AtomicU64,
    /// Frames that went through the bundle queue
    pub bundled: AtomicU64,
    /// Bundle queue flushes
    pub bundle_flushes: AtomicU64,
}

impl VdevCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_tx(&self, bytes: usize) {
        self.tx_packets.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn inc_queued(&self, count: u64) {
        self.queued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_dropped_queue_full(&self, count: u64) {
        self.dropped_queue_full.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_dropped_hw_reject(&self, count: u64) {
        self.dropped_hw_reject.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_dropped_flush(&self, count: u64) {
        self.dropped_flush.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_overflow(&self) {
        self.overflow_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ack_replaced(&self) {
        self.ack_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ack_flushed(&self, count: u64) {
        self.ack_flushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_bundled(&self, count: u64) {
        self.bundled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_bundle_flushes(&self) {
        self.bundle_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current statistics
    pub fn snapshot(&self) -> VdevCountersSnapshot {
        VdevCountersSnapshot {
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_hw_reject: self.dropped_hw_reject.load(Ordering::Relaxed),
            dropped_flush: self.dropped_flush.load(Ordering::Relaxed),
            overflow_events: self.overflow_events.load(Ordering::Relaxed),
            ack_replaced: self.ack_replaced.load(Ordering::Relaxed),
            ack_flushed: self.ack_flushed.load(Ordering::Relaxed),
            bundled: self.bundled.load(Ordering::Relaxed),
            bundle_flushes: self.bundle_flushes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of interface statistics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VdevCountersSnapshot {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub queued: u64,
    pub dropped_queue_full: u64,
    pub dropped_hw_reject: u64,
    pub dropped_flush: u64,
    pub overflow_events: u64,
    pub ack_replaced: u64,
    pub ack_flushed: u64,
    pub bundled: u64,
    pub bundle_flushes: u64,
}

impl VdevCountersSnapshot {
    /// Every frame this interface dropped, whatever the reason
    pub fn total_dropped(&self) -> u64 {
        self.dropped_queue_full + self.dropped_hw_reject + self.dropped_flush
    }
}

/// Device-wide counters
#[derive(Debug, Default)]
pub struct DeviceCounters {
    /// Scheduler passes that got past the throttle check
    pub sched_passes: AtomicU64,
    /// Frames sent by the round-robin scheduler
    pub sched_sent: AtomicU64,
    /// Hardware refusals seen anywhere on the device
    pub hw_rejects: AtomicU64,
    /// Frames refused because only reserved descriptors were left
    pub reserve_denied: AtomicU64,
    /// Device-wide bundle flushes triggered by the shared counter
    pub bundle_threshold_flushes: AtomicU64,
    /// Drain timer expiries
    pub drain_timer_fired: AtomicU64,
}

impl DeviceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sched_pass(&self) {
        self.sched_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sched_sent(&self, count: u64) {
        self.sched_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_hw_rejects(&self) {
        self.hw_rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reserve_denied(&self) {
        self.reserve_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bundle_threshold_flush(&self) {
        self.bundle_threshold_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_drain_timer_fired(&self) {
        self.drain_timer_fired.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current statistics
    pub fn snapshot(&self) -> DeviceCountersSnapshot {
        DeviceCountersSnapshot {
            sched_passes: self.sched_passes.load(Ordering::Relaxed),
            sched_sent: self.sched_sent.load(Ordering::Relaxed),
            hw_rejects: self.hw_rejects.load(Ordering::Relaxed),
            reserve_denied: self.reserve_denied.load(Ordering::Relaxed),
            bundle_threshold_flushes: self.bundle_threshold_flushes.load(Ordering::Relaxed),
            drain_timer_fired: self.drain_timer_fired.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of device statistics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCountersSnapshot {
    pub sched_passes: u64,
    pub sched_sent: u64,
    pub hw_rejects: u64,
    pub reserve_denied: u64,
    pub bundle_threshold_flushes: u64,
    pub drain_timer_fired: u64,
}
