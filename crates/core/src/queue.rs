//! Buffer for unconfirmed feed messages.
//!
//! The feed races ahead of L1. Messages it proposes are held here until the
//! confirmed path either matches them (they are spliced into the insert and
//! the queue drains) or overrides them. The queue is only mutated under the
//! insertion mutex; its start position is additionally published through an
//! atomic so the insertion path can compute its overlap bound without
//! re-reading queue contents.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use streamer_types::MessageWithMetadata;
use tracing::warn;

#[derive(Debug)]
pub(crate) struct BroadcastQueue {
    messages: Vec<MessageWithMetadata>,
    /// First queued message's index; shared with the streamer for lock-free
    /// reads. 0 when the queue is empty.
    start_pos: Arc<AtomicU64>,
    /// Set when the queued messages diverge from stored history and are
    /// waiting on L1 confirmation.
    active_reorg: bool,
}

impl BroadcastQueue {
    pub(crate) fn new(start_pos: Arc<AtomicU64>) -> Self {
        Self { messages: Vec::new(), start_pos, active_reorg: false }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn start_pos(&self) -> u64 {
        self.start_pos.load(Ordering::SeqCst)
    }

    pub(crate) fn active_reorg(&self) -> bool {
        self.active_reorg
    }

    fn replace(&mut self, start_pos: u64, messages: Vec<MessageWithMetadata>, active_reorg: bool) {
        self.messages = messages;
        self.start_pos.store(start_pos, Ordering::SeqCst);
        self.active_reorg = active_reorg;
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.start_pos.store(0, Ordering::SeqCst);
        self.active_reorg = false;
    }

    /// Integrates a reconciled feed batch, returning the queue's start
    /// position after integration (the position a drain would begin at).
    pub(crate) fn integrate(
        &mut self,
        start_pos: u64,
        messages: Vec<MessageWithMetadata>,
        feed_reorg: bool,
        max_queue_size: u64,
    ) -> u64 {
        if self.messages.is_empty() || (feed_reorg && !self.active_reorg) {
            // Empty queue, or the feed now disagrees with the store while the
            // queue doesn't: hold the new batch until L1 catches up.
            self.replace(start_pos, messages, feed_reorg);
            return start_pos;
        }

        let queue_start = self.start_pos();
        if queue_start >= start_pos {
            // Incoming batch is at or behind the queue.
            self.replace(start_pos, messages, feed_reorg);
            start_pos
        } else if queue_start + self.len() as u64 == start_pos {
            if max_queue_size == 0 || self.messages.len() as u64 <= max_queue_size {
                self.messages.extend(messages);
            }
            // An over-full queue drops the incoming batch without touching
            // any other state.
            queue_start
        } else {
            warn!(
                target: "transaction_streamer",
                queued_messages = self.messages.len(),
                expected_next_pos = queue_start + self.len() as u64,
                got_pos = start_pos,
                "broadcaster queue jumped positions"
            );
            self.replace(start_pos, messages, feed_reorg);
            start_pos
        }
    }

    /// Splices the overlapping tail of the queue into an incoming range
    /// `[start, after)`. `queue_start` is the caller's lock-free read of the
    /// published start position. Returns whether the queue was consumed or
    /// replaced by the range and should be cleared once the insert commits.
    pub(crate) fn splice_overlap(
        &self,
        queue_start: u64,
        start: u64,
        after: u64,
        messages: &mut Vec<MessageWithMetadata>,
    ) -> bool {
        if (self.active_reorg && start <= queue_start)
            || (!self.active_reorg && queue_start <= after)
        {
            if after >= queue_start {
                let overlap = (after - queue_start) as usize;
                if overlap < self.messages.len() {
                    messages.extend_from_slice(&self.messages[overlap..]);
                }
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::message;

    fn queue() -> BroadcastQueue {
        BroadcastQueue::new(Arc::new(AtomicU64::new(0)))
    }

    fn batch(n: usize) -> Vec<MessageWithMetadata> {
        (0..n).map(|i| message(1, i as u8)).collect()
    }

    #[test]
    fn empty_queue_takes_batch() {
        let mut q = queue();
        let start = q.integrate(5, batch(2), false, 0);
        assert_eq!(start, 5);
        assert_eq!(q.start_pos(), 5);
        assert_eq!(q.len(), 2);
        assert!(!q.active_reorg());
    }

    #[test]
    fn contiguous_batch_appends() {
        let mut q = queue();
        q.integrate(5, batch(2), false, 0);
        let start = q.integrate(7, batch(3), false, 0);
        assert_eq!(start, 5, "drain starts at the original queue position");
        assert_eq!(q.len(), 5);
    }

    #[test]
    fn append_respects_bound() {
        let mut q = queue();
        q.integrate(5, batch(3), false, 0);
        q.integrate(8, batch(1), false, 2);
        assert_eq!(q.len(), 3, "over-full queue drops the incoming batch");
        assert_eq!(q.start_pos(), 5);
    }

    #[test]
    fn batch_behind_queue_replaces() {
        let mut q = queue();
        q.integrate(5, batch(4), false, 0);
        let start = q.integrate(3, batch(1), false, 0);
        assert_eq!(start, 3);
        assert_eq!(q.start_pos(), 3);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn positional_jump_replaces() {
        let mut q = queue();
        q.integrate(5, batch(2), false, 0);
        let start = q.integrate(10, batch(1), false, 0);
        assert_eq!(start, 10);
        assert_eq!(q.start_pos(), 10);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn fresh_feed_reorg_replaces_clean_queue() {
        let mut q = queue();
        q.integrate(5, batch(3), false, 0);
        let start = q.integrate(7, batch(1), true, 0);
        assert_eq!(start, 7);
        assert!(q.active_reorg());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn splice_appends_tail_past_overlap() {
        let mut q = queue();
        q.integrate(3, vec![message(1, 10), message(1, 11), message(1, 12)], false, 0);

        let mut incoming = vec![message(1, 0)];
        let cleared = q.splice_overlap(q.start_pos(), 3, 4, &mut incoming);
        assert!(cleared);
        assert_eq!(incoming.len(), 3, "tail at positions 4 and 5 spliced in");
        assert_eq!(incoming[1], message(1, 11));
        assert_eq!(incoming[2], message(1, 12));
    }

    #[test]
    fn splice_skips_disjoint_future_queue() {
        let mut q = queue();
        q.integrate(10, batch(2), false, 0);

        let mut incoming = vec![message(1, 0)];
        let cleared = q.splice_overlap(q.start_pos(), 3, 4, &mut incoming);
        assert!(!cleared);
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn splice_under_active_reorg_requires_start_at_or_before_queue() {
        let mut q = queue();
        q.integrate(5, batch(2), true, 0);

        let mut incoming = vec![message(1, 0)];
        assert!(
            !q.splice_overlap(q.start_pos(), 6, 7, &mut incoming),
            "confirmed range past the reorg point"
        );
        assert!(q.splice_overlap(q.start_pos(), 4, 5, &mut incoming));
    }
}
