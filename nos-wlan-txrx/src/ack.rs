//! TCP pure-ACK coalescing
//!
//! Outgoing pure ACKs of one TCP stream are cumulative, so only the newest
//! one needs to reach the air. Each interface keeps a fixed hash table of
//! pending ACKs keyed by the 4-tuple. A newer ACK replaces the held one
//! (the old frame is freed) until the replace threshold forces a flush.
//!
//! Bucket lists are individually locked; the table never holds a lock
//! while frames are being sent. A closed table gives every new ACK back.

use alloc::vec::Vec;

use static_assertions::const_assert;

use nos_wlan_api::sync::{AtomicBool, AtomicUsize, Mutex, Ordering};
use nos_wlan_api::{BufferList, FlowKey, Milliseconds, PacketBuffer, PacketInfo};

use crate::timer::OneShotTimer;

/// Number of hash buckets per interface
pub const ACK_HASH_SIZE: usize = 256;

const_assert!(ACK_HASH_SIZE.is_power_of_two());

struct AckEntry {
    flow: FlowKey,
    ack_number: u32,
    replaced: u32,
    buf: PacketBuffer,
}

/// What happened to a pure ACK handed to the coalescer
#[derive(Debug)]
pub enum AckOutcome {
    /// First ACK of the stream, now held
    Held,
    /// Replaced the held ACK, which was freed
    Replaced,
    /// Held ACK (and possibly the new one) must be sent now
    Flush(BufferList),
    /// The table is closed; the ACK was not taken
    Closed(PacketBuffer),
}

pub struct AckCoalescer {
    buckets: Vec<Mutex<Vec<AckEntry>>>,
    in_use: AtomicUsize,
    closed: AtomicBool,
    timer: OneShotTimer,
}

impl AckCoalescer {
    pub fn new() -> Self {
        Self {
            buckets: (0..ACK_HASH_SIZE).map(|_| Mutex::new(Vec::new())).collect(),
            in_use: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            timer: OneShotTimer::new(),
        }
    }

    fn bucket(&self, flow: &FlowKey) -> &Mutex<Vec<AckEntry>> {
        &self.buckets[flow.stream_hash() as usize & (ACK_HASH_SIZE - 1)]
    }

    /// Feed one pure ACK classified as `info`.
    ///
    /// `threshold` bounds how many times one entry may be replaced; the
    /// flush timer is armed with `period` when it is not already running.
    pub fn hold(
        &self,
        buf: PacketBuffer,
        info: &PacketInfo,
        threshold: u32,
        now: Milliseconds,
        period: Milliseconds,
    ) -> AckOutcome {
        let mut bucket = self.bucket(&info.flow).lock();
        if self.closed.load(Ordering::Acquire) {
            return AckOutcome::Closed(buf);
        }

        let Some(pos) = bucket.iter().position(|e| e.flow == info.flow) else {
            bucket.push(AckEntry {
                flow: info.flow,
                ack_number: info.ack_number,
                replaced: 0,
                buf,
            });
            self.in_use.fetch_add(1, Ordering::AcqRel);
            drop(bucket);
            if !self.timer.is_armed() {
                self.timer.start(now, period);
            }
            return AckOutcome::Held;
        };

        let entry = &mut bucket[pos];
        if info.ack_number > entry.ack_number && entry.replaced < threshold {
            // Old frame is freed here
            entry.buf = buf;
            entry.ack_number = info.ack_number;
            entry.replaced += 1;

            if entry.replaced >= threshold {
                let entry = bucket.swap_remove(pos);
                self.in_use.fetch_sub(1, Ordering::AcqRel);
                return AckOutcome::Flush(alloc::vec![entry.buf]);
            }
            drop(bucket);
            if !self.timer.is_armed() {
                self.timer.start(now, period);
            }
            return AckOutcome::Replaced;
        }

        // Stale or duplicate ACK: send both, held one first
        let entry = bucket.swap_remove(pos);
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        AckOutcome::Flush(alloc::vec![entry.buf, buf])
    }

    /// Remove the held ACK of one stream
    pub fn take_stream(&self, flow: &FlowKey) -> Option<PacketBuffer> {
        let mut bucket = self.bucket(flow).lock();
        let pos = bucket.iter().position(|e| e.flow == *flow)?;
        let entry = bucket.swap_remove(pos);
        self.in_use.fetch_sub(1, Ordering::AcqRel);
        Some(entry.buf)
    }

    /// Remove every held ACK, in bucket order
    pub fn take_all(&self) -> BufferList {
        let mut frames = BufferList::new();
        if self.in_use() == 0 {
            return frames;
        }
        for bucket in &self.buckets {
            let mut bucket = bucket.lock();
            if bucket.is_empty() {
                continue;
            }
            let taken = bucket.len();
            frames.extend(bucket.drain(..).map(|e| e.buf));
            self.in_use.fetch_sub(taken, Ordering::AcqRel);
        }
        frames
    }

    /// Refuse every later ACK and remove the held ones.
    ///
    /// Every bucket is locked in turn, so an ACK inserted concurrently is
    /// either refused or collected here.
    pub fn close(&self) -> BufferList {
        self.closed.store(true, Ordering::Release);
        let mut frames = BufferList::new();
        for bucket in &self.buckets {
            let mut bucket = bucket.lock();
            let taken = bucket.len();
            frames.extend(bucket.drain(..).map(|e| e.buf));
            self.in_use.fetch_sub(taken, Ordering::AcqRel);
        }
        frames
    }

    /// Acknowledgement number and replace count held for a stream
    pub fn pending(&self, flow: &FlowKey) -> Option<(u32, u32)> {
        let bucket = self.bucket(flow).lock();
        bucket
            .iter()
            .find(|e| e.flow == *flow)
            .map(|e| (e.ack_number, e.replaced))
    }

    /// Number of streams with a held ACK
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn timer(&self) -> &OneShotTimer {
        &self.timer
    }
}

impl Default for AckCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_wlan_api::PacketKind;

    const FLOW: FlowKey = FlowKey::new(0x0a00_0001, 0x0a00_0002, 40000, 80);

    fn ack(id: u32, ack_number: u32) -> (PacketBuffer, PacketInfo) {
        let info = PacketInfo {
            kind: PacketKind::TcpPureAck,
            flow: FLOW,
            ack_number,
        };
        (PacketBuffer::new(id, alloc::vec![0u8; 54]), info)
    }

    fn ids(list: &BufferList) -> Vec<u32> {
        list.iter().map(|b| b.id()).collect()
    }

    #[test]
    fn test_newer_ack_replaces_held_one() {
        let table = AckCoalescer::new();
        let (b1, i1) = ack(1, 10);
        let (b2, i2) = ack(2, 20);

        assert!(matches!(table.hold(b1, &i1, 3, 0, 3), AckOutcome::Held));
        assert!(matches!(table.hold(b2, &i2, 3, 1, 3), AckOutcome::Replaced));
        assert_eq!(table.pending(&FLOW), Some((20, 1)));
        assert_eq!(table.in_use(), 1);
        assert!(table.timer().is_armed());

        let held = table.take_stream(&FLOW).unwrap();
        assert_eq!(held.id(), 2);
        assert_eq!(table.in_use(), 0);
    }

    #[test]
    fn test_threshold_forces_flush() {
        let table = AckCoalescer::new();
        let threshold = 2;
        let (b, i) = ack(0, 100);
        table.hold(b, &i, threshold, 0, 3);
        let (b, i) = ack(1, 101);
        assert!(matches!(table.hold(b, &i, threshold, 0, 3), AckOutcome::Replaced));
        let (b, i) = ack(2, 102);
        match table.hold(b, &i, threshold, 0, 3) {
            AckOutcome::Flush(list) => assert_eq!(ids(&list), alloc::vec![2]),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(table.in_use(), 0);
        assert!(table.pending(&FLOW).is_none());
    }

    #[test]
    fn test_stale_ack_flushes_chain() {
        let table = AckCoalescer::new();
        let (b1, i1) = ack(1, 50);
        let (b2, i2) = ack(2, 50);
        table.hold(b1, &i1, 5, 0, 3);
        match table.hold(b2, &i2, 5, 0, 3) {
            AckOutcome::Flush(list) => assert_eq!(ids(&list), alloc::vec![1, 2]),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(table.in_use(), 0);
    }

    #[test]
    fn test_take_all_empties_every_bucket() {
        let table = AckCoalescer::new();
        for port in 0..10u16 {
            let info = PacketInfo {
                kind: PacketKind::TcpPureAck,
                flow: FlowKey::new(1, 2, port, 80),
                ack_number: 1,
            };
            table.hold(PacketBuffer::new(port as u32, alloc::vec![0u8; 54]), &info, 3, 0, 3);
        }
        assert_eq!(table.in_use(), 10);
        assert_eq!(table.take_all().len(), 10);
        assert_eq!(table.in_use(), 0);
        assert!(table.take_all().is_empty());
    }

    #[test]
    fn test_closed_table_refuses_acks() {
        let table = AckCoalescer::new();
        let (b1, i1) = ack(1, 10);
        table.hold(b1, &i1, 3, 0, 3);
        assert_eq!(ids(&table.close()), alloc::vec![1]);

        let (b2, i2) = ack(2, 20);
        match table.hold(b2, &i2, 3, 0, 3) {
            AckOutcome::Closed(buf) => assert_eq!(buf.id(), 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(table.in_use(), 0);
        assert!(table.pending(&FLOW).is_none());
    }
}
