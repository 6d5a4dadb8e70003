//! Per-packet transmit statistics ring
//!
//! A fixed pool of records fed from two sides: the admission path fills in
//! what the host knows when a frame is handed to the hardware, and the
//! completion path adds what the firmware reports afterwards. A reader
//! consumes finished records in completion order.
//!
//! Every slot is on exactly one of three lists at any time:
//!
//! - `free`: unused
//! - `host_filled`: waiting for its completion
//! - `complete`: waiting for the reader
//!
//! so `free + host_filled + complete == capacity` holds after every
//! operation. The pool never grows; when it is full an existing record is
//! sacrificed according to the eviction policy.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use nos_wlan_api::sync::{AtomicBool, AtomicU64, Mutex, Ordering};
use nos_wlan_api::{MacAddr, PacketId, Result, TxError};

/// Which record is sacrificed when every slot is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsEvictionPolicy {
    /// Oldest finished record first, then the oldest pending one
    #[default]
    CompleteOldestFirst,
    /// Newest finished record first, then the oldest pending one
    CompleteNewestFirst,
    /// Oldest pending record first, then the oldest finished one
    HostFilledFirst,
}

/// What the host knows about a frame at submission time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostTxInfo {
    /// Operating channel centre frequency (MHz)
    pub chan_freq: u16,
    /// Channel bandwidth (MHz)
    pub bandwidth: u16,
    pub peer: MacAddr,
    /// Data rate in units of 100 kbps
    pub data_rate: u32,
}

/// One finished per-packet record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStatsRecord {
    pub packet_id: PacketId,
    /// Position of the record in acquisition order
    pub seq: u32,
    pub host: HostTxInfo,
    /// Transmit power reported by the firmware (dBm)
    pub tx_power: i8,
}

/// Sizes of the three lists at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingOccupancy {
    pub free: usize,
    pub host_filled: usize,
    pub complete: usize,
}

impl RingOccupancy {
    pub fn total(&self) -> usize {
        self.free + self.host_filled + self.complete
    }
}

struct RingLists {
    slots: Vec<TxStatsRecord>,
    // Front is oldest on every list
    free: VecDeque<usize>,
    host_filled: VecDeque<usize>,
    complete: VecDeque<usize>,
    next_seq: u32,
}

impl RingLists {
    fn new(capacity: usize) -> Self {
        Self {
            slots: alloc::vec![TxStatsRecord::default(); capacity],
            free: (0..capacity).collect(),
            host_filled: VecDeque::with_capacity(capacity),
            complete: VecDeque::with_capacity(capacity),
            next_seq: 0,
        }
    }

    fn evict(&mut self, policy: StatsEvictionPolicy) -> Option<usize> {
        match policy {
            StatsEvictionPolicy::CompleteOldestFirst => self
                .complete
                .pop_front()
                .or_else(|| self.host_filled.pop_front()),
            StatsEvictionPolicy::CompleteNewestFirst => self
                .complete
                .pop_back()
                .or_else(|| self.host_filled.pop_front()),
            StatsEvictionPolicy::HostFilledFirst => self
                .host_filled
                .pop_front()
                .or_else(|| self.complete.pop_front()),
        }
    }

    fn reset(&mut self) {
        self.free.clear();
        self.host_filled.clear();
        self.complete.clear();
        self.free.extend(0..self.slots.len());
    }
}

/// Bounded per-packet statistics pool
pub struct StatsRingPool {
    lists: Mutex<RingLists>,
    capacity: usize,
    policy: StatsEvictionPolicy,
    enabled: AtomicBool,
    evictions: AtomicU64,
    correlation_misses: AtomicU64,
}

impl StatsRingPool {
    pub fn new(capacity: usize, policy: StatsEvictionPolicy) -> Self {
        Self {
            lists: Mutex::new(RingLists::new(capacity)),
            capacity,
            policy,
            enabled: AtomicBool::new(true),
            evictions: AtomicU64::new(0),
            correlation_misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> StatsEvictionPolicy {
        self.policy
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Switch recording on or off. Switching off discards every record.
    pub fn set_enabled(&self, enabled: bool) {
        let mut lists = self.lists.lock();
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was && !enabled {
            lists.reset();
        }
    }

    /// Record the host side of a frame being handed to the hardware.
    ///
    /// Returns the sequence number assigned to the record.
    pub fn acquire_for_host(&self, packet_id: PacketId, host: HostTxInfo) -> Result<u32> {
        // Checked under the lock so a concurrent disable cannot miss this record
        let mut lists = self.lists.lock();
        if !self.is_enabled() {
            return Err(TxError::StatsDisabled);
        }
        let slot = match lists.free.pop_front() {
            Some(slot) => slot,
            None => {
                let slot = lists.evict(self.policy).ok_or(TxError::PoolExhausted)?;
                self.evictions.fetch_add(1, Ordering::Relaxed);
                slot
            }
        };

        let seq = lists.next_seq;
        lists.next_seq = seq.wrapping_add(1);
        lists.slots[slot] = TxStatsRecord {
            packet_id,
            seq,
            host,
            tx_power: 0,
        };
        lists.host_filled.push_back(slot);
        Ok(seq)
    }

    /// Attach the firmware's completion data to the pending record for
    /// `packet_id`. Returns false (and counts a miss) if none is pending.
    pub fn complete_with_device(&self, packet_id: PacketId, tx_power: i8) -> bool {
        let mut lists = self.lists.lock();
        // Newest first: a recycled id most likely refers to the latest frame
        let position = {
            let RingLists { slots, host_filled, .. } = &*lists;
            host_filled
                .iter()
                .rposition(|&slot| slots[slot].packet_id == packet_id)
        };

        match position.and_then(|pos| lists.host_filled.remove(pos)) {
            Some(slot) => {
                lists.slots[slot].tx_power = tx_power;
                lists.complete.push_back(slot);
                true
            }
            None => {
                drop(lists);
                self.correlation_misses.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Take the oldest finished record
    pub fn consume(&self) -> Option<TxStatsRecord> {
        let mut lists = self.lists.lock();
        let slot = lists.complete.pop_front()?;
        let record = lists.slots[slot];
        lists.free.push_back(slot);
        Some(record)
    }

    pub fn occupancy(&self) -> RingOccupancy {
        let lists = self.lists.lock();
        RingOccupancy {
            free: lists.free.len(),
            host_filled: lists.host_filled.len(),
            complete: lists.complete.len(),
        }
    }

    /// Records overwritten because the pool was full
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Completions that matched no pending record
    pub fn correlation_misses(&self) -> u64 {
        self.correlation_misses.load(Ordering::Relaxed)
    }
}

impl core::fmt::Debug for StatsRingPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StatsRingPool")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("occupancy", &self.occupancy())
            .finish()
    }
}
