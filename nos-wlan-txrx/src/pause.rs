//! Per-interface backlog queue and pause state
//!
//! The backlog holds frames that could not go to the hardware right away,
//! either because the interface is paused for some reason or because
//! descriptors are scarce. Its depth is hard-capped: once full, new frames
//! are refused rather than waited on.
//!
//! The pause mask lives under the same lock as the queue so that "paused,
//! so append" and "resumed, so drain" can never interleave badly. Closing
//! the queue happens under that lock as well: once closed, every append
//! hands its frames back.

use alloc::collections::VecDeque;

use nos_wlan_api::sync::Mutex;
use nos_wlan_api::{BufferList, PacketBuffer, PauseReason};

struct Backlog {
    frames: VecDeque<PacketBuffer>,
    reasons: PauseReason,
    closed: bool,
}

/// Bounded FIFO plus pause-reason mask
pub struct PauseQueue {
    inner: Mutex<Backlog>,
    max_depth: usize,
}

/// Outcome of appending a chain to the backlog
#[derive(Debug, Default)]
pub struct AppendResult {
    pub queued: usize,
    /// Frames refused because the queue was full, in submission order
    pub rejected: BufferList,
    /// Depth after the append
    pub depth: usize,
    /// The queue was closed; every frame is in `rejected`
    pub closed: bool,
}

impl PauseQueue {
    pub fn new(max_depth: usize) -> Self {
        Self {
            inner: Mutex::new(Backlog {
                frames: VecDeque::new(),
                reasons: PauseReason::empty(),
                closed: false,
            }),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Append as many frames as fit; the rest are handed back
    pub fn append<I>(&self, frames: I) -> AppendResult
    where
        I: IntoIterator<Item = PacketBuffer>,
    {
        let mut inner = self.inner.lock();
        Self::append_locked(&mut inner, self.max_depth, frames)
    }

    fn append_locked<I>(inner: &mut Backlog, max_depth: usize, frames: I) -> AppendResult
    where
        I: IntoIterator<Item = PacketBuffer>,
    {
        let mut result = AppendResult::default();
        if inner.closed {
            result.rejected.extend(frames);
            result.closed = true;
            return result;
        }
        for buf in frames {
            if inner.frames.len() < max_depth {
                inner.frames.push_back(buf);
                result.queued += 1;
            } else {
                result.rejected.push(buf);
            }
        }
        result.depth = inner.frames.len();
        result
    }

    /// Append only if the queue is paused or already holds frames.
    ///
    /// Returns the frames back untouched (`Err`) when the caller may send
    /// them directly. `must_queue` forces queueing regardless.
    pub fn append_if_blocked(
        &self,
        frames: BufferList,
        must_queue: bool,
    ) -> core::result::Result<(PauseReason, AppendResult), BufferList> {
        let mut inner = self.inner.lock();
        let idle = inner.reasons.is_empty() && inner.frames.is_empty();
        if idle && !inner.closed && !must_queue {
            return Err(frames);
        }
        let reasons = inner.reasons;
        Ok((reasons, Self::append_locked(&mut inner, self.max_depth, frames)))
    }

    /// Dequeue the oldest frame unless the interface is paused
    pub fn pop_unpaused(&self) -> Option<PacketBuffer> {
        let mut inner = self.inner.lock();
        if !inner.reasons.is_empty() {
            return None;
        }
        inner.frames.pop_front()
    }

    /// Remove every queued frame
    pub fn take_all(&self) -> BufferList {
        self.inner.lock().frames.drain(..).collect()
    }

    /// Refuse all later appends and remove every queued frame
    pub fn close(&self) -> BufferList {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.frames.drain(..).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Add `reason`; returns the mask afterwards
    pub fn pause(&self, reason: PauseReason) -> PauseReason {
        let mut inner = self.inner.lock();
        inner.reasons |= reason;
        inner.reasons
    }

    /// Clear `reason`; returns the mask before and after
    pub fn resume(&self, reason: PauseReason) -> (PauseReason, PauseReason) {
        let mut inner = self.inner.lock();
        let before = inner.reasons;
        inner.reasons.remove(reason);
        (before, inner.reasons)
    }

    pub fn reasons(&self) -> PauseReason {
        self.inner.lock().reasons
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Depth and mask read under one lock
    pub fn state(&self) -> (usize, PauseReason) {
        let inner = self.inner.lock();
        (inner.frames.len(), inner.reasons)
    }

    /// Frames waiting that the scheduler is allowed to send
    pub fn has_unpaused_backlog(&self) -> bool {
        let inner = self.inner.lock();
        inner.reasons.is_empty() && !inner.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(ids: core::ops::Range<u32>) -> BufferList {
        ids.map(|id| PacketBuffer::new(id, alloc::vec![0u8; 60])).collect()
    }

    #[test]
    fn test_append_is_bounded() {
        let queue = PauseQueue::new(3);
        let result = queue.append(frames(0..5));
        assert_eq!(result.queued, 3);
        assert_eq!(result.depth, 3);
        let rejected: alloc::vec::Vec<u32> = result.rejected.iter().map(|b| b.id()).collect();
        assert_eq!(rejected, alloc::vec![3, 4]);
    }

    #[test]
    fn test_paused_queue_does_not_pop() {
        let queue = PauseQueue::new(8);
        queue.append(frames(0..2));
        queue.pause(PauseReason::FW);
        assert!(queue.pop_unpaused().is_none());
        assert!(!queue.has_unpaused_backlog());

        let (before, after) = queue.resume(PauseReason::FW);
        assert_eq!(before, PauseReason::FW);
        assert!(after.is_empty());
        assert_eq!(queue.pop_unpaused().unwrap().id(), 0);
    }

    #[test]
    fn test_reasons_are_independent() {
        let queue = PauseQueue::new(8);
        queue.pause(PauseReason::FW);
        queue.pause(PauseReason::THERMAL);
        let (_, after) = queue.resume(PauseReason::FW);
        assert_eq!(after, PauseReason::THERMAL);
    }

    #[test]
    fn test_append_if_blocked() {
        let queue = PauseQueue::new(8);
        let list = queue.append_if_blocked(frames(0..2), false).unwrap_err();
        assert_eq!(list.len(), 2);

        let (reasons, result) = queue.append_if_blocked(list, true).unwrap();
        assert!(reasons.is_empty());
        assert_eq!(result.depth, 2);

        // Existing backlog forces queueing behind it
        assert!(queue.append_if_blocked(frames(2..3), false).is_ok());
        assert_eq!(queue.depth(), 3);
    }

    #[test]
    fn test_closed_queue_refuses_appends() {
        let queue = PauseQueue::new(8);
        queue.append(frames(0..2));
        assert_eq!(queue.close().len(), 2);
        assert!(queue.is_closed());

        // An idle closed queue must not offer frames for direct send either
        let (_, result) = queue.append_if_blocked(frames(2..4), false).unwrap();
        assert!(result.closed);
        assert_eq!(result.queued, 0);
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(queue.depth(), 0);
    }
}
