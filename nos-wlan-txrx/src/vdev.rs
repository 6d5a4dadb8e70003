//! Virtual interfaces and their admission gate
//!
//! A `VirtualInterface` owns everything that is per logical interface: the
//! pause mask and backlog, the bundle queue, the ACK coalescing table, the
//! backlog restart timer and its counters. Device-wide state (hardware,
//! throttle, shared bundle counter) is reached through the `TxCore` passed
//! into every operation.

use alloc::vec::Vec;

use nos_wlan_api::sync::{AtomicBool, Mutex, Ordering};
use nos_wlan_api::{BufferList, FlowKey, PacketBuffer, PauseReason, VdevId};

use crate::ack::AckCoalescer;
use crate::adaptive::AdaptiveSwitch;
use crate::bundle::BundleQueue;
use crate::config::{DEFAULT_LOW_WATERMARK, TxConfig};
use crate::counters::{VdevCounters, VdevCountersSnapshot};
use crate::pause::PauseQueue;
use crate::pdev::TxCore;
use crate::sched::{BACKLOG_RESTART_MS, admission_margin};
use crate::stats_ring::HostTxInfo;
use crate::timer::OneShotTimer;

/// Per-interface settings given at attach time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdevConfig {
    /// Low watermark for this interface's own backlog drains
    pub low_watermark: u32,
    /// Initial state of the load-driven ACK coalescing switch
    pub ack_coalescing: bool,
    /// Initial state of the load-driven bundling switch
    pub bundling: bool,
    /// Channel and peer data recorded with per-packet stats
    pub host_info: HostTxInfo,
}

impl VdevConfig {
    /// Interface settings inheriting the device watermark
    pub fn from_device(config: &TxConfig) -> Self {
        Self {
            low_watermark: config.low_watermark,
            ..Self::default()
        }
    }
}

impl Default for VdevConfig {
    fn default() -> Self {
        Self {
            low_watermark: DEFAULT_LOW_WATERMARK,
            ack_coalescing: true,
            bundling: true,
            host_info: HostTxInfo::default(),
        }
    }
}

/// One logical wireless interface
pub struct VirtualInterface {
    id: VdevId,
    low_watermark: u32,
    host_info: Mutex<HostTxInfo>,
    pub(crate) backlog: PauseQueue,
    pub(crate) bundle: BundleQueue,
    pub(crate) acks: AckCoalescer,
    pub(crate) backlog_timer: OneShotTimer,
    ack_switch: AdaptiveSwitch,
    bundle_switch: AdaptiveSwitch,
    detached: AtomicBool,
    pub(crate) counters: VdevCounters,
}

impl VirtualInterface {
    pub(crate) fn new(id: VdevId, config: &VdevConfig, max_q_depth: usize) -> Self {
        Self {
            id,
            low_watermark: config.low_watermark,
            host_info: Mutex::new(config.host_info),
            backlog: PauseQueue::new(max_q_depth),
            bundle: BundleQueue::new(),
            acks: AckCoalescer::new(),
            backlog_timer: OneShotTimer::new(),
            ack_switch: AdaptiveSwitch::new(config.ack_coalescing),
            bundle_switch: AdaptiveSwitch::new(config.bundling),
            detached: AtomicBool::new(false),
            counters: VdevCounters::new(),
        }
    }

    pub fn id(&self) -> VdevId {
        self.id
    }

    pub fn low_watermark(&self) -> u32 {
        self.low_watermark
    }

    pub fn backlog_depth(&self) -> usize {
        self.backlog.depth()
    }

    pub fn bundle_depth(&self) -> usize {
        self.bundle.depth()
    }

    pub fn pause_reasons(&self) -> PauseReason {
        self.backlog.reasons()
    }

    pub fn is_paused(&self) -> bool {
        !self.pause_reasons().is_empty()
    }

    /// Acknowledgement number held for `flow`, if any
    pub fn pending_ack(&self, flow: &FlowKey) -> Option<u32> {
        self.acks.pending(flow).map(|(ack, _)| ack)
    }

    /// Times the held ACK of `flow` has been replaced
    pub fn ack_replace_count(&self, flow: &FlowKey) -> Option<u32> {
        self.acks.pending(flow).map(|(_, replaced)| replaced)
    }

    /// Streams with a held ACK
    pub fn pending_ack_streams(&self) -> usize {
        self.acks.in_use()
    }

    pub fn is_ack_coalescing_enabled(&self) -> bool {
        self.ack_switch.is_enabled()
    }

    pub fn is_bundling_enabled(&self) -> bool {
        self.bundle_switch.is_enabled()
    }

    pub(crate) fn ack_switch(&self) -> &AdaptiveSwitch {
        &self.ack_switch
    }

    pub(crate) fn bundle_switch(&self) -> &AdaptiveSwitch {
        &self.bundle_switch
    }

    pub fn is_backlog_timer_armed(&self) -> bool {
        self.backlog_timer.is_armed()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub fn host_info(&self) -> HostTxInfo {
        *self.host_info.lock()
    }

    /// Update the channel/peer data recorded with per-packet stats
    pub fn set_host_info(&self, info: HostTxInfo) {
        *self.host_info.lock() = info;
    }

    pub fn counters(&self) -> VdevCountersSnapshot {
        self.counters.snapshot()
    }

    /// Admission gate: send, queue or refuse a chain of frames.
    ///
    /// Returns every frame that was refused, already counted as dropped.
    pub(crate) fn admit(&self, core: &TxCore, list: BufferList) -> BufferList {
        let mut rejected = BufferList::new();
        if list.is_empty() {
            return rejected;
        }

        // An unauthorized peer still has to complete its key exchange
        let list = if self.backlog.reasons().is_only_unauthorized() {
            let (auth, rest): (BufferList, BufferList) =
                list.into_iter().partition(|buf| buf.is_auth_exchange());
            rejected.extend(self.send_direct(core, auth));
            rest
        } else {
            list
        };
        if list.is_empty() {
            return rejected;
        }

        let must_queue =
            core.throttle.is_engaged() || !core.direct_send_allowed(self.low_watermark);
        let (reasons, result) = match self.backlog.append_if_blocked(list, must_queue) {
            Ok(appended) => appended,
            Err(list) => {
                rejected.extend(self.send_direct(core, list));
                return rejected;
            }
        };

        if result.closed {
            self.counters.inc_dropped_flush(result.rejected.len() as u64);
            crate::tx_debug!(
                "vdev {}: detached, refused {} frames",
                self.id,
                result.rejected.len()
            );
            rejected.extend(result.rejected);
            return rejected;
        }

        self.counters.inc_queued(result.queued as u64);
        if !result.rejected.is_empty() {
            self.counters.inc_dropped_queue_full(result.rejected.len() as u64);
            self.counters.inc_overflow();
            crate::tx_debug!(
                "vdev {}: backlog full ({}), refused {} frames",
                self.id,
                result.depth,
                result.rejected.len()
            );
            rejected.extend(result.rejected);
        }

        if !reasons.is_empty() {
            if !reasons.contains(PauseReason::VDEV_SUSPEND) {
                self.backlog_timer.start(core.now(), BACKLOG_RESTART_MS);
            }
        } else if core.throttle.allows_send() {
            self.drain_backlog(core);
        }
        rejected
    }

    /// Hand frames straight to the hardware, stopping at the first refusal.
    ///
    /// The refused frame and everything after it are returned.
    fn send_direct(&self, core: &TxCore, list: BufferList) -> BufferList {
        let mut frames = list.into_iter();
        while let Some(buf) = frames.next() {
            if let Err(refused) = core.hw_send(self, buf) {
                let mut rejected: BufferList = Vec::with_capacity(frames.len() + 1);
                rejected.push(refused.into_inner());
                rejected.extend(frames);
                // The refused frame itself was counted by hw_send
                self.counters
                    .inc_dropped_hw_reject((rejected.len() - 1) as u64);
                return rejected;
            }
        }
        BufferList::new()
    }

    /// Send queued frames while the hardware has headroom above the margin.
    ///
    /// Also the backlog restart timer's callback. Returns frames accepted.
    pub(crate) fn drain_backlog(&self, core: &TxCore) -> u32 {
        if self.is_paused() || !core.throttle.allows_send() {
            return 0;
        }

        let free = i64::from(core.hw.free_descriptor_count());
        let mut budget = free - i64::from(admission_margin(self.low_watermark));
        let mut sent = 0;
        while budget > 0 {
            let Some(buf) = self.backlog.pop_unpaused() else {
                break;
            };
            if core.hw_send(self, buf).is_ok() {
                sent += 1;
            }
            budget -= 1;
        }

        let (depth, reasons) = self.backlog.state();
        if depth >= self.backlog.max_depth() {
            self.counters.inc_overflow();
        }
        if depth > 0 && !reasons.contains(PauseReason::VDEV_SUSPEND) {
            self.backlog_timer.start(core.now(), BACKLOG_RESTART_MS);
        }
        sent
    }

    /// Frame for the round-robin scheduler, if this interface may send
    pub(crate) fn dequeue_for_scheduler(&self) -> Option<PacketBuffer> {
        self.backlog.pop_unpaused()
    }

    pub(crate) fn has_unpaused_backlog(&self) -> bool {
        self.backlog.has_unpaused_backlog()
    }

    /// Drop every frame held anywhere in this interface
    pub(crate) fn flush(&self, core: &TxCore) -> usize {
        self.backlog_timer.cancel();
        self.acks.timer().cancel();

        let backlog = self.backlog.take_all();
        let bundled = self.bundle.take(&core.bundle_total);
        let acks = self.acks.take_all();
        self.count_flushed(backlog, bundled, acks)
    }

    /// Stop the interface for good: no new frames, no timers, no queues.
    ///
    /// Each queue is closed under its own lock, so a submission that got
    /// past the detached check is refused and counted instead of parked.
    pub(crate) fn teardown(&self, core: &TxCore) -> usize {
        self.detached.store(true, Ordering::Release);
        self.backlog_timer.cancel();
        self.acks.timer().cancel();

        let backlog = self.backlog.close();
        let bundled = self.bundle.close(&core.bundle_total);
        let acks = self.acks.close();
        self.count_flushed(backlog, bundled, acks)
    }

    fn count_flushed(&self, backlog: BufferList, bundled: BufferList, acks: BufferList) -> usize {
        let dropped = backlog.len() + bundled.len() + acks.len();
        if dropped > 0 {
            self.counters.inc_dropped_flush(dropped as u64);
            crate::tx_debug!(
                "vdev {}: flushed {} backlog, {} bundled, {} acks",
                self.id,
                backlog.len(),
                bundled.len(),
                acks.len()
            );
        }
        dropped
    }
}

impl core::fmt::Debug for VirtualInterface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualInterface")
            .field("id", &self.id)
            .field("paused", &self.pause_reasons())
            .field("backlog", &self.backlog_depth())
            .field("bundle", &self.bundle_depth())
            .field("acks", &self.pending_ack_streams())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_device() {
        let config = TxConfig {
            low_watermark: 7,
            ..TxConfig::default()
        };
        let vdev_config = VdevConfig::from_device(&config);
        assert_eq!(vdev_config.low_watermark, 7);
        assert!(vdev_config.ack_coalescing);
        assert!(vdev_config.bundling);
    }

    #[test]
    fn test_new_interface_is_idle() {
        let vdev = VirtualInterface::new(3, &VdevConfig::default(), 16);
        assert_eq!(vdev.id(), 3);
        assert_eq!(vdev.backlog_depth(), 0);
        assert_eq!(vdev.bundle_depth(), 0);
        assert!(!vdev.is_paused());
        assert!(!vdev.is_detached());
        assert!(!vdev.is_backlog_timer_armed());
        assert_eq!(vdev.counters(), VdevCountersSnapshot::default());
    }
}
