//! Physical device: the transmit path entry point
//!
//! A `PhysicalDevice` owns the attached virtual interfaces and the state
//! they share. A frame submitted for an interface passes through
//!
//! 1. the ACK coalescer (TCP pure ACKs may be held back),
//! 2. the bundler (frames may be held until a group is complete),
//! 3. the interface's admission gate (sent, queued or refused).
//!
//! Frames refused while handling the caller's own submission are returned
//! to the caller. Frames refused after being released from an internal
//! queue (an ACK flush, a bundle flush, a drain pass) are dropped. Both are
//! counted.
//!
//! No lock on the interface table is held while frames are sent: every
//! pass works on a snapshot of the interface list.

use alloc::sync::Arc;
use alloc::vec::Vec;

use nos_wlan_api::collections::HashMap;
use nos_wlan_api::sync::{AtomicUsize, Ordering, RwLock};
use nos_wlan_api::{
    BufferList, HwTxTarget, Milliseconds, PacketBuffer, PacketKind, PauseReason, Rejected,
    Result, ThrottleLevel, ThrottlePhase, TransportClassifier, TxClock, TxError, VdevId,
};

use crate::ack::AckOutcome;
use crate::adaptive::{ack_coalescing_decision, bundling_decision};
use crate::classify::EthernetTcpClassifier;
use crate::config::TxConfig;
use crate::counters::{DeviceCounters, DeviceCountersSnapshot, VdevCountersSnapshot};
use crate::sched::{BACKLOG_RESTART_MS, DrainReport, admission_margin, drain_pass};
use crate::stats_ring::StatsRingPool;
use crate::throttle::ThrottleState;
use crate::timer::OneShotTimer;
use crate::vdev::{VdevConfig, VirtualInterface};

/// State shared by every interface of one device
pub(crate) struct TxCore {
    pub(crate) config: TxConfig,
    pub(crate) hw: Arc<dyn HwTxTarget>,
    pub(crate) classifier: Arc<dyn TransportClassifier>,
    pub(crate) clock: Arc<dyn TxClock>,
    pub(crate) throttle: ThrottleState,
    pub(crate) counters: DeviceCounters,
    pub(crate) stats: StatsRingPool,
    /// Frames held in all bundle queues together
    pub(crate) bundle_total: AtomicUsize,
    pub(crate) drain_timer: OneShotTimer,
}

impl TxCore {
    pub(crate) fn now(&self) -> Milliseconds {
        self.clock.now_ms()
    }

    /// Whether the hardware has headroom above the margin for `low_watermark`
    pub(crate) fn direct_send_allowed(&self, low_watermark: u32) -> bool {
        self.hw.free_descriptor_count() > admission_margin(low_watermark)
    }

    /// Hand one frame to the hardware on behalf of `vdev`.
    ///
    /// The last `hi_prio_reserve` descriptors are kept for latency-sensitive
    /// frames. A refusal is counted against the interface.
    pub(crate) fn hw_send(
        &self,
        vdev: &VirtualInterface,
        buf: PacketBuffer,
    ) -> core::result::Result<(), Rejected> {
        let reserve = self.config.hi_prio_reserve;
        if reserve > 0
            && !buf.is_latency_sensitive()
            && self.hw.free_descriptor_count() <= reserve
        {
            self.counters.inc_reserve_denied();
            vdev.counters.inc_dropped_hw_reject(1);
            return Err(Rejected(buf));
        }

        let id = buf.id();
        let len = buf.len();
        match self.hw.submit(buf) {
            Ok(()) => {
                vdev.counters.inc_tx(len);
                if self.stats.is_enabled() {
                    // A full ring recycles a slot, so only a disabled ring fails
                    let _ = self.stats.acquire_for_host(id, vdev.host_info());
                }
                Ok(())
            }
            Err(refused) => {
                self.counters.inc_hw_rejects();
                vdev.counters.inc_dropped_hw_reject(1);
                crate::tx_trace!("vdev {}: hardware refused frame {}", vdev.id(), id);
                Err(refused)
            }
        }
    }
}

#[derive(Default)]
struct VdevTable {
    /// Attach order, which is also the round-robin order
    order: Vec<Arc<VirtualInterface>>,
    by_id: HashMap<VdevId, Arc<VirtualInterface>>,
}

/// One radio with its attached virtual interfaces
pub struct PhysicalDevice {
    core: TxCore,
    vdevs: RwLock<VdevTable>,
}

impl PhysicalDevice {
    pub fn new(
        config: TxConfig,
        hw: Arc<dyn HwTxTarget>,
        classifier: Arc<dyn TransportClassifier>,
        clock: Arc<dyn TxClock>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = StatsRingPool::new(config.pool_capacity, config.stats_eviction);
        stats.set_enabled(config.per_pkt_stats_enabled);

        Ok(Self {
            core: TxCore {
                config,
                hw,
                classifier,
                clock,
                throttle: ThrottleState::new(),
                counters: DeviceCounters::new(),
                stats,
                bundle_total: AtomicUsize::new(0),
                drain_timer: OneShotTimer::new(),
            },
            vdevs: RwLock::new(VdevTable::default()),
        })
    }

    /// Device using the built-in Ethernet/IPv4/TCP classifier
    pub fn with_default_classifier(
        config: TxConfig,
        hw: Arc<dyn HwTxTarget>,
        clock: Arc<dyn TxClock>,
    ) -> Result<Self> {
        Self::new(config, hw, Arc::new(EthernetTcpClassifier::new()), clock)
    }

    pub fn config(&self) -> &TxConfig {
        &self.core.config
    }

    pub fn attach_vdev(&self, id: VdevId, config: VdevConfig) -> Result<Arc<VirtualInterface>> {
        let mut table = self.vdevs.write();
        if table.by_id.contains_key(&id) {
            return Err(TxError::InterfaceExists(id));
        }
        let vdev = Arc::new(VirtualInterface::new(id, &config, self.core.config.max_q_depth));
        table.order.push(vdev.clone());
        table.by_id.insert(id, vdev.clone());
        drop(table);

        crate::tx_info!("vdev {} attached", id);
        Ok(vdev)
    }

    /// Tear an interface down, dropping everything it still holds.
    ///
    /// Returns the number of frames dropped.
    pub fn detach_vdev(&self, id: VdevId) -> Result<usize> {
        let vdev = self.vdev(id)?;
        let dropped = vdev.teardown(&self.core);

        let mut table = self.vdevs.write();
        table.by_id.remove(&id);
        table.order.retain(|v| v.id() != id);
        drop(table);

        crate::tx_info!("vdev {} detached, {} frames dropped", id, dropped);
        Ok(dropped)
    }

    pub fn vdev(&self, id: VdevId) -> Result<Arc<VirtualInterface>> {
        self.vdevs
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(TxError::InterfaceNotFound(id))
    }

    /// Attached interface ids in round-robin order
    pub fn vdev_ids(&self) -> Vec<VdevId> {
        self.vdevs.read().order.iter().map(|v| v.id()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<VirtualInterface>> {
        self.vdevs.read().order.clone()
    }

    fn live_vdev(&self, id: VdevId) -> Result<Arc<VirtualInterface>> {
        let vdev = self.vdev(id)?;
        if vdev.is_detached() {
            return Err(TxError::InterfaceDetached(id));
        }
        Ok(vdev)
    }

    /// Transmit one frame on interface `id`.
    ///
    /// Returns the frames that were refused; they have been counted and
    /// the caller only has to free them.
    pub fn submit(&self, id: VdevId, buf: PacketBuffer) -> Result<BufferList> {
        let vdev = self.live_vdev(id)?;
        Ok(self.transmit(&vdev, buf))
    }

    /// Transmit a chain of frames on interface `id`, in order
    pub fn submit_list(&self, id: VdevId, list: BufferList) -> Result<BufferList> {
        let vdev = self.live_vdev(id)?;
        let mut rejected = BufferList::new();
        for buf in list {
            rejected.extend(self.transmit(&vdev, buf));
        }
        Ok(rejected)
    }

    fn transmit(&self, vdev: &VirtualInterface, buf: PacketBuffer) -> BufferList {
        let now = self.core.now();
        match self.ack_stage(vdev, buf, now) {
            Some(buf) => self.bundle_stage(vdev, buf, now),
            None => BufferList::new(),
        }
    }

    /// Returns the frame if it continues down the path
    fn ack_stage(
        &self,
        vdev: &VirtualInterface,
        buf: PacketBuffer,
        now: Milliseconds,
    ) -> Option<PacketBuffer> {
        let core = &self.core;
        if !(core.config.coalescing_enabled && vdev.is_ack_coalescing_enabled()) {
            // Leftovers from before coalescing was switched off go first
            if vdev.acks.in_use() > 0 {
                vdev.acks.timer().cancel();
                self.release_acks(vdev, vdev.acks.take_all());
            }
            return Some(buf);
        }

        let info = core.classifier.classify(&buf);
        match info.kind {
            PacketKind::NoTcp => Some(buf),
            PacketKind::TcpData => {
                // The held ACK must not be overtaken by data of its stream
                if let Some(held) = vdev.acks.take_stream(&info.flow) {
                    self.release_acks(vdev, alloc::vec![held]);
                }
                Some(buf)
            }
            PacketKind::TcpPureAck => {
                let outcome = vdev.acks.hold(
                    buf,
                    &info,
                    core.config.ack_replace_threshold,
                    now,
                    core.config.ack_timer_ms,
                );
                match outcome {
                    AckOutcome::Held => {}
                    AckOutcome::Replaced => vdev.counters.inc_ack_replaced(),
                    AckOutcome::Flush(list) => {
                        if list.len() == 1 {
                            vdev.counters.inc_ack_replaced();
                        }
                        self.release_acks(vdev, list);
                    }
                    // Detached meanwhile; admission refuses and counts it
                    AckOutcome::Closed(buf) => return Some(buf),
                }
                None
            }
        }
    }

    fn release_acks(&self, vdev: &VirtualInterface, list: BufferList) {
        if list.is_empty() {
            return;
        }
        vdev.counters.inc_ack_flushed(list.len() as u64);
        drop(vdev.admit(&self.core, list));
    }

    fn bundle_stage(&self, vdev: &VirtualInterface, buf: PacketBuffer, now: Milliseconds) -> BufferList {
        let core = &self.core;
        if buf.is_latency_sensitive() {
            return vdev.admit(core, alloc::vec![buf]);
        }

        let threshold = core.config.bundle_size_threshold;
        let bundling =
            core.config.bundling_enabled && vdev.is_bundling_enabled() && threshold > 1;
        if bundling {
            let total = match vdev.bundle.push(
                alloc::vec![buf],
                &core.bundle_total,
                now,
                core.config.bundle_timer_ms,
            ) {
                Ok(total) => total,
                Err(refused) => return Self::refuse_detached(vdev, refused),
            };
            vdev.counters.inc_bundled(1);
            if total >= threshold {
                core.counters.inc_bundle_threshold_flush();
                for other in self.snapshot() {
                    self.flush_bundle(&other);
                }
                self.schedule();
            }
            return BufferList::new();
        }

        if vdev.bundle_depth() > 0 {
            // Queue behind the residue so order is kept
            if let Err(refused) = vdev.bundle.push(
                alloc::vec![buf],
                &core.bundle_total,
                now,
                core.config.bundle_timer_ms,
            ) {
                return Self::refuse_detached(vdev, refused);
            }
            self.flush_bundle(vdev);
            return BufferList::new();
        }

        vdev.admit(core, alloc::vec![buf])
    }

    fn refuse_detached(vdev: &VirtualInterface, refused: BufferList) -> BufferList {
        vdev.counters.inc_dropped_flush(refused.len() as u64);
        refused
    }

    fn flush_bundle(&self, vdev: &VirtualInterface) {
        let list = vdev.bundle.take(&self.core.bundle_total);
        if list.is_empty() {
            return;
        }
        vdev.counters.inc_bundle_flushes();
        drop(vdev.admit(&self.core, list));
    }

    /// Drop every frame interface `id` holds in any queue
    pub fn flush_all(&self, id: VdevId) -> Result<usize> {
        let vdev = self.vdev(id)?;
        Ok(vdev.flush(&self.core))
    }

    pub fn pause(&self, id: VdevId, reason: PauseReason) -> Result<()> {
        let vdev = self.vdev(id)?;
        let reasons = vdev.backlog.pause(reason);
        crate::tx_debug!("vdev {} paused: {:?}", id, reasons);
        Ok(())
    }

    /// Clear one pause reason.
    ///
    /// A fully unpaused interface wakes the scheduler; leaving standby
    /// restarts the backlog timer.
    pub fn resume(&self, id: VdevId, reason: PauseReason) -> Result<()> {
        let vdev = self.vdev(id)?;
        let (before, after) = vdev.backlog.resume(reason);
        crate::tx_debug!("vdev {} resumed: {:?} -> {:?}", id, before, after);

        let left_standby = before.contains(PauseReason::VDEV_SUSPEND)
            && !after.contains(PauseReason::VDEV_SUSPEND);
        if left_standby && vdev.backlog_depth() > 0 {
            vdev.backlog_timer.start(self.core.now(), BACKLOG_RESTART_MS);
        }
        if !before.is_empty() && after.is_empty() {
            self.schedule();
        }
        Ok(())
    }

    /// Pause every attached interface
    pub fn pause_all(&self, reason: PauseReason) {
        for vdev in self.snapshot() {
            vdev.backlog.pause(reason);
        }
        crate::tx_debug!("all vdevs paused: {:?}", reason);
    }

    /// Clear `reason` on every attached interface
    pub fn resume_all(&self, reason: PauseReason) {
        for vdev in self.snapshot() {
            // The interface may have been detached meanwhile
            let _ = self.resume(vdev.id(), reason);
        }
    }

    /// Run one round-robin drain pass over all interfaces
    pub fn schedule(&self) -> DrainReport {
        let vdevs = self.snapshot();
        drain_pass(&self.core, &vdevs)
    }

    /// Fire every timer whose deadline has passed.
    ///
    /// Meant to be called from the host's periodic tick. Returns the number
    /// of timers that expired.
    pub fn poll_timers(&self) -> u32 {
        let core = &self.core;
        let now = core.now();
        let mut fired = 0;
        let mut acks_released = false;

        for vdev in self.snapshot() {
            if vdev.acks.timer().fire(now) {
                fired += 1;
                let held = vdev.acks.take_all();
                acks_released |= !held.is_empty();
                self.release_acks(&vdev, held);
            }
            if vdev.bundle.timer().fire(now) {
                fired += 1;
                self.flush_bundle(&vdev);
            }
            if vdev.backlog_timer.fire(now) {
                fired += 1;
                vdev.drain_backlog(core);
            }
        }

        if acks_released {
            self.schedule();
        }
        if core.drain_timer.fire(now) {
            fired += 1;
            core.counters.inc_drain_timer_fired();
            self.schedule();
        }
        fired
    }

    pub fn is_drain_timer_armed(&self) -> bool {
        self.core.drain_timer.is_armed()
    }

    /// Apply a thermal throttle change; entering an on phase wakes the
    /// scheduler.
    pub fn set_throttle(&self, level: ThrottleLevel, phase: ThrottlePhase) {
        self.core.throttle.set(level, phase);
        crate::tx_info!("throttle level {:?} phase {:?}", level, phase);
        if self.core.throttle.allows_send() {
            self.schedule();
        }
    }

    pub fn throttle(&self) -> (ThrottleLevel, ThrottlePhase) {
        (self.core.throttle.level(), self.core.throttle.phase())
    }

    /// Feed the received packet count of the last sampling period.
    ///
    /// Returns true if ACK coalescing was switched on or off.
    pub fn update_ack_coalescing_load(
        &self,
        id: VdevId,
        rx_packets: u64,
        high: u64,
        low: u64,
    ) -> Result<bool> {
        let vdev = self.vdev(id)?;
        let changed = vdev
            .ack_switch()
            .apply(ack_coalescing_decision(rx_packets, high, low));
        if changed {
            crate::tx_info!(
                "vdev {}: ack coalescing {}",
                id,
                if vdev.is_ack_coalescing_enabled() { "on" } else { "off" }
            );
        }
        Ok(changed)
    }

    /// Feed the bytes sent during the last `time_ms`.
    ///
    /// Returns true if bundling was switched on or off.
    pub fn update_bundle_load(
        &self,
        id: VdevId,
        tx_bytes: u64,
        time_ms: Milliseconds,
        high: u64,
        low: u64,
    ) -> Result<bool> {
        let vdev = self.vdev(id)?;
        let changed = vdev
            .bundle_switch()
            .apply(bundling_decision(tx_bytes, time_ms, high, low));
        if changed {
            crate::tx_info!(
                "vdev {}: bundling {}",
                id,
                if vdev.is_bundling_enabled() { "on" } else { "off" }
            );
        }
        Ok(changed)
    }

    pub fn set_ack_coalescing(&self, id: VdevId, enabled: bool) -> Result<()> {
        self.vdev(id)?.ack_switch().set(enabled);
        Ok(())
    }

    pub fn set_bundling(&self, id: VdevId, enabled: bool) -> Result<()> {
        self.vdev(id)?.bundle_switch().set(enabled);
        Ok(())
    }

    /// Frames currently held across all bundle queues
    pub fn bundle_pending(&self) -> usize {
        self.core.bundle_total.load(Ordering::Acquire)
    }

    /// Completion callback: attach firmware data to the stats record
    pub fn record_completion(&self, packet_id: nos_wlan_api::PacketId, tx_power: i8) -> bool {
        self.core.stats.complete_with_device(packet_id, tx_power)
    }

    pub fn stats_pool(&self) -> &StatsRingPool {
        &self.core.stats
    }

    pub fn set_per_pkt_stats(&self, enabled: bool) {
        self.core.stats.set_enabled(enabled);
        crate::tx_info!("per-packet stats {}", if enabled { "on" } else { "off" });
    }

    pub fn counters(&self) -> DeviceCountersSnapshot {
        self.core.counters.snapshot()
    }

    pub fn vdev_counters(&self, id: VdevId) -> Result<VdevCountersSnapshot> {
        Ok(self.vdev(id)?.counters())
    }
}

impl core::fmt::Debug for PhysicalDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhysicalDevice")
            .field("vdevs", &self.vdev_ids())
            .field("bundle_pending", &self.bundle_pending())
            .field("throttle", &self.throttle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::tcp_frame;
    use nos_wlan_api::FlowKey;
    use nos_wlan_api::sync::{AtomicBool, AtomicU32, AtomicU64, Mutex};

    struct FakeHw {
        free: AtomicU32,
        accept: AtomicBool,
        sent: Mutex<Vec<u32>>,
    }

    impl FakeHw {
        fn new(free: u32) -> Arc<Self> {
            Arc::new(Self {
                free: AtomicU32::new(free),
                accept: AtomicBool::new(true),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<u32> {
            self.sent.lock().clone()
        }
    }

    impl HwTxTarget for FakeHw {
        fn submit(&self, buf: PacketBuffer) -> core::result::Result<(), Rejected> {
            if !self.accept.load(Ordering::Relaxed) {
                return Err(Rejected(buf));
            }
            self.sent.lock().push(buf.id());
            Ok(())
        }

        fn free_descriptor_count(&self) -> u32 {
            self.free.load(Ordering::Relaxed)
        }
    }

    struct FakeClock(AtomicU64);

    impl TxClock for FakeClock {
        fn now_ms(&self) -> Milliseconds {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn device(config: TxConfig, hw: &Arc<FakeHw>) -> (PhysicalDevice, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock(AtomicU64::new(0)));
        let dev = PhysicalDevice::with_default_classifier(config, hw.clone(), clock.clone()).unwrap();
        (dev, clock)
    }

    fn plain(id: u32) -> PacketBuffer {
        PacketBuffer::new(id, alloc::vec![0u8; 60])
    }

    const FLOW: FlowKey = FlowKey::new(0x0a00_0001, 0x0a00_0002, 40000, 80);

    #[test]
    fn test_direct_send() {
        let hw = FakeHw::new(1000);
        let (dev, _) = device(TxConfig::default(), &hw);
        dev.attach_vdev(0, VdevConfig::default()).unwrap();

        assert!(dev.submit(0, plain(1)).unwrap().is_empty());
        assert_eq!(hw.sent(), alloc::vec![1]);
        assert_eq!(dev.vdev_counters(0).unwrap().tx_packets, 1);
    }

    #[test]
    fn test_unknown_and_duplicate_interfaces() {
        let hw = FakeHw::new(1000);
        let (dev, _) = device(TxConfig::default(), &hw);
        assert_eq!(dev.submit(4, plain(1)).unwrap_err(), TxError::InterfaceNotFound(4));
        dev.attach_vdev(4, VdevConfig::default()).unwrap();
        assert_eq!(
            dev.attach_vdev(4, VdevConfig::default()).unwrap_err(),
            TxError::InterfaceExists(4)
        );
    }

    #[test]
    fn test_held_ack_released_by_timer() {
        let hw = FakeHw::new(1000);
        let config = TxConfig {
            coalescing_enabled: true,
            ..TxConfig::default()
        };
        let (dev, clock) = device(config, &hw);
        dev.attach_vdev(0, VdevConfig::default()).unwrap();

        let ack = PacketBuffer::new(7, tcp_frame(FLOW, 100, 0x10, 0));
        assert!(dev.submit(0, ack).unwrap().is_empty());
        assert!(hw.sent().is_empty());

        clock.0.store(2, Ordering::Relaxed);
        assert_eq!(dev.poll_timers(), 0);
        clock.0.store(3, Ordering::Relaxed);
        assert_eq!(dev.poll_timers(), 1);
        assert_eq!(hw.sent(), alloc::vec![7]);
        assert_eq!(dev.vdev_counters(0).unwrap().ack_flushed, 1);
    }

    #[test]
    fn test_reserve_keeps_last_descriptors_for_eapol() {
        let hw = FakeHw::new(5);
        let config = TxConfig {
            low_watermark: 0,
            hi_prio_reserve: 10,
            ..TxConfig::default()
        };
        let (dev, _) = device(config, &hw);
        dev.attach_vdev(0, VdevConfig::from_device(dev.config())).unwrap();

        let rejected = dev.submit(0, plain(1)).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(dev.counters().reserve_denied, 1);

        let mut eapol = alloc::vec![0u8; 60];
        eapol[12] = 0x88;
        eapol[13] = 0x8E;
        assert!(dev.submit(0, PacketBuffer::new(2, eapol)).unwrap().is_empty());
        assert_eq!(hw.sent(), alloc::vec![2]);
    }

    #[test]
    fn test_hw_refusal_returned_to_caller() {
        let hw = FakeHw::new(1000);
        hw.accept.store(false, Ordering::Relaxed);
        let (dev, _) = device(TxConfig::default(), &hw);
        dev.attach_vdev(0, VdevConfig::default()).unwrap();

        let rejected = dev.submit_list(0, alloc::vec![plain(1), plain(2)]).unwrap();
        assert_eq!(rejected.iter().map(|b| b.id()).collect::<Vec<_>>(), alloc::vec![1, 2]);
        let counters = dev.vdev_counters(0).unwrap();
        assert_eq!(counters.dropped_hw_reject, 2);
        assert_eq!(dev.counters().hw_rejects, 2);
    }

    #[test]
    fn test_stats_recorded_on_accept() {
        let hw = FakeHw::new(1000);
        let config = TxConfig {
            per_pkt_stats_enabled: true,
            ..TxConfig::default()
        };
        let (dev, _) = device(config, &hw);
        dev.attach_vdev(0, VdevConfig::default()).unwrap();

        dev.submit(0, plain(42)).unwrap();
        assert_eq!(dev.stats_pool().occupancy().host_filled, 1);
        assert!(dev.record_completion(42, 12));
        let record = dev.stats_pool().consume().unwrap();
        assert_eq!(record.packet_id, 42);
        assert_eq!(record.tx_power, 12);
    }

    #[test]
    fn test_submit_racing_detach_is_refused() {
        let hw = FakeHw::new(1000);
        let (dev, _) = device(TxConfig::default(), &hw);
        let vdev = dev.attach_vdev(0, VdevConfig::default()).unwrap();
        dev.pause(0, PauseReason::FW).unwrap();
        assert_eq!(dev.detach_vdev(0).unwrap(), 0);

        // A submitter holding the interface from before the detach
        let rejected = dev.transmit(&vdev, plain(5));
        assert_eq!(rejected.iter().map(|b| b.id()).collect::<Vec<_>>(), alloc::vec![5]);
        assert_eq!(vdev.backlog_depth(), 0);
        assert!(!vdev.is_backlog_timer_armed());
        assert_eq!(vdev.counters().dropped_flush, 1);
        assert_eq!(vdev.counters().dropped_queue_full, 0);
        assert!(hw.sent().is_empty());
    }

    #[test]
    fn test_bundle_and_ack_racing_detach_are_refused() {
        let hw = FakeHw::new(1000);
        let config = TxConfig {
            coalescing_enabled: true,
            bundling_enabled: true,
            ..TxConfig::default()
        };
        let (dev, _) = device(config, &hw);
        let vdev = dev.attach_vdev(0, VdevConfig::default()).unwrap();
        dev.submit(0, plain(1)).unwrap();
        assert_eq!(dev.bundle_pending(), 1);
        assert_eq!(dev.detach_vdev(0).unwrap(), 1);

        assert_eq!(dev.transmit(&vdev, plain(2)).len(), 1);
        let ack = PacketBuffer::new(3, tcp_frame(FLOW, 100, 0x10, 0));
        assert_eq!(dev.transmit(&vdev, ack).len(), 1);

        assert_eq!(dev.bundle_pending(), 0);
        assert_eq!(vdev.bundle_depth(), 0);
        assert_eq!(vdev.pending_ack_streams(), 0);
        assert_eq!(vdev.counters().dropped_flush, 3);
        assert!(hw.sent().is_empty());
    }
}
