//! Per-interface bundle queue
//!
//! Frames are held back and released in groups. Every interface of a
//! device adds to one shared frame counter; the device flushes all bundle
//! queues when that counter reaches its threshold. The counter is only
//! touched with the owning queue's lock held, so it always equals the sum
//! of all queue depths.

use alloc::collections::VecDeque;

use nos_wlan_api::sync::{AtomicUsize, Mutex, Ordering};
use nos_wlan_api::{BufferList, Milliseconds, PacketBuffer};

use crate::timer::OneShotTimer;

struct Pending {
    frames: VecDeque<PacketBuffer>,
    closed: bool,
}

pub struct BundleQueue {
    pending: Mutex<Pending>,
    timer: OneShotTimer,
}

impl BundleQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                frames: VecDeque::new(),
                closed: false,
            }),
            timer: OneShotTimer::new(),
        }
    }

    /// Append a chain, adding its length to `shared`.
    ///
    /// Arms the flush timer when the queue was empty. Returns the value of
    /// the shared counter after the append, or the chain itself if the
    /// queue has been closed.
    pub fn push(
        &self,
        list: BufferList,
        shared: &AtomicUsize,
        now: Milliseconds,
        period: Milliseconds,
    ) -> core::result::Result<usize, BufferList> {
        let added = list.len();
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(list);
        }
        let was_empty = pending.frames.is_empty();
        pending.frames.extend(list);
        let total = shared.fetch_add(added, Ordering::AcqRel) + added;
        drop(pending);

        if was_empty && added > 0 {
            self.timer.start(now, period);
        }
        Ok(total)
    }

    /// Remove every queued frame, subtracting them from `shared`
    pub fn take(&self, shared: &AtomicUsize) -> BufferList {
        self.drain(shared, false)
    }

    /// Like [`take`](Self::take), and refuse every later push
    pub fn close(&self, shared: &AtomicUsize) -> BufferList {
        self.drain(shared, true)
    }

    fn drain(&self, shared: &AtomicUsize, close: bool) -> BufferList {
        let mut pending = self.pending.lock();
        pending.closed |= close;
        let taken: BufferList = pending.frames.drain(..).collect();
        shared.fetch_sub(taken.len(), Ordering::AcqRel);
        drop(pending);

        self.timer.cancel();
        taken
    }

    pub fn depth(&self) -> usize {
        self.pending.lock().frames.len()
    }

    pub fn timer(&self) -> &OneShotTimer {
        &self.timer
    }
}

impl Default for BundleQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(ids: core::ops::Range<u32>) -> BufferList {
        ids.map(|id| PacketBuffer::new(id, alloc::vec![0u8; 60])).collect()
    }

    #[test]
    fn test_shared_counter_tracks_depth() {
        let shared = AtomicUsize::new(0);
        let a = BundleQueue::new();
        let b = BundleQueue::new();

        assert_eq!(a.push(frames(0..2), &shared, 0, 100).ok(), Some(2));
        assert_eq!(b.push(frames(2..5), &shared, 0, 100).ok(), Some(5));

        let taken = a.take(&shared);
        assert_eq!(taken.iter().map(|f| f.id()).collect::<alloc::vec::Vec<_>>(), alloc::vec![0, 1]);
        assert_eq!(shared.load(Ordering::Acquire), 3);
        assert_eq!(b.depth(), 3);
    }

    #[test]
    fn test_timer_armed_on_first_insert() {
        let shared = AtomicUsize::new(0);
        let queue = BundleQueue::new();
        queue.push(frames(0..1), &shared, 10, 100).unwrap();
        assert_eq!(queue.timer().deadline(), Some(110));

        // Later inserts keep the original deadline
        queue.push(frames(1..2), &shared, 50, 100).unwrap();
        assert_eq!(queue.timer().deadline(), Some(110));

        queue.take(&shared);
        assert!(!queue.timer().is_armed());
    }

    #[test]
    fn test_closed_queue_hands_frames_back() {
        let shared = AtomicUsize::new(0);
        let queue = BundleQueue::new();
        queue.push(frames(0..3), &shared, 0, 100).unwrap();

        assert_eq!(queue.close(&shared).len(), 3);
        assert_eq!(shared.load(Ordering::Acquire), 0);
        assert!(!queue.timer().is_armed());

        let refused = queue.push(frames(3..5), &shared, 10, 100).unwrap_err();
        assert_eq!(refused.len(), 2);
        assert_eq!(queue.depth(), 0);
        assert_eq!(shared.load(Ordering::Acquire), 0);
        assert!(!queue.timer().is_armed());
    }
}
