//! Reconciliation of candidate messages against stored history.
//!
//! The feed is untrusted and may race ahead of L1 with a different candidate
//! sequence. A mismatch inside the confirmed prefix is authoritative and
//! forces a truncation; a feed mismatch is speculative and only buffers. The
//! batch-gas-cost exception keeps a lazily populated cost cache from reading
//! as a divergent message.

use crate::error::StreamerError;
use alloy_rlp::Decodable;
use std::time::{Duration, Instant};
use streamer_storage::{Batch, MessageStore};
use streamer_types::MessageWithMetadata;
use tracing::warn;

/// Arms at most once per period. Used for the per-streamer feed-reorg log
/// clocks and the producer's scheduled-upgrade check.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    last: Option<Instant>,
    period: Duration,
}

impl RateLimiter {
    pub(crate) const fn new(period: Duration) -> Self {
        Self { last: None, period }
    }

    /// True when the period has elapsed since the last arming (or the limiter
    /// never fired); arming happens as a side effect.
    pub(crate) fn due(&mut self) -> bool {
        match self.last {
            Some(at) if at.elapsed() < self.period => false,
            _ => {
                self.last = Some(Instant::now());
                true
            }
        }
    }
}

/// Outcome of reconciling a candidate range against the store.
#[derive(Debug)]
pub(crate) struct Reconciled {
    /// The feed proposed a divergence from stored history.
    pub(crate) feed_reorg: bool,
    /// L1-confirmed input diverged from stored history; the store must be
    /// truncated to `start_pos` before writing.
    pub(crate) confirmed_reorg: bool,
    /// Delayed-read count of the last duplicate skipped (input value when
    /// none were).
    pub(crate) prev_delayed_read: u64,
    /// First position not yet skipped.
    pub(crate) start_pos: u64,
    /// Candidates remaining after duplicate removal.
    pub(crate) messages: Vec<MessageWithMetadata>,
}

/// Skips candidates already present in the store and classifies the first
/// mismatch, if any.
///
/// `confirmed_message_count` is the length of the prefix of `messages` known
/// to come from L1. When a confirmed duplicate carries a gas-cost cache the
/// stored row lacks, the richer encoding is appended to `batch`, lazily
/// allocating it; passing `None` for `batch` makes that case an error.
pub(crate) fn skip_duplicate_messages<S: MessageStore>(
    store: &S,
    feed_reorg_log: &mut RateLimiter,
    mut prev_delayed_read: u64,
    mut pos: u64,
    mut messages: Vec<MessageWithMetadata>,
    mut confirmed_message_count: usize,
    mut batch: Option<&mut Option<Batch>>,
) -> Result<Reconciled, StreamerError> {
    let mut feed_reorg = false;
    let mut confirmed_reorg = false;
    let mut skipped = 0usize;

    loop {
        let Some(next) = messages.get(skipped) else { break };
        let Some(stored) = store.message(pos)? else { break };
        let want = next.encoded();

        if stored != want {
            let stored_msg = match MessageWithMetadata::decode(&mut stored.as_slice()) {
                Ok(msg) => msg,
                Err(err) => {
                    if confirmed_message_count > 0 {
                        confirmed_reorg = true;
                    } else {
                        feed_reorg = true;
                    }
                    warn!(
                        target: "transaction_streamer",
                        pos,
                        %err,
                        confirmed_message_count,
                        "reorg detected, failed parsing stored message"
                    );
                    break;
                }
            };

            let mut duplicate = false;
            if (stored_msg.message.batch_gas_cost.is_none()
                || next.message.batch_gas_cost.is_none())
                && stored_msg.eq_ignoring_batch_gas_cost(next)
            {
                // Only the gas-cost caches differ. When the confirmed copy is
                // the richer one, upgrade the stored row in place.
                if next.message.batch_gas_cost.is_some() && confirmed_message_count > 0 {
                    let Some(slot) = batch.as_deref_mut() else {
                        return Err(StreamerError::MissingBatchHandle);
                    };
                    slot.get_or_insert_with(Batch::new).put_message(pos, want);
                }
                duplicate = true;
            }

            if !duplicate {
                let mut log_feed_reorg = false;
                if confirmed_message_count > 0 {
                    confirmed_reorg = true;
                } else {
                    feed_reorg = true;
                    log_feed_reorg = feed_reorg_log.due();
                }
                if confirmed_reorg || log_feed_reorg {
                    warn!(
                        target: "transaction_streamer",
                        pos,
                        got_delayed = next.delayed_messages_read,
                        got_header = ?next.message.header,
                        db_delayed = stored_msg.delayed_messages_read,
                        db_header = ?stored_msg.message.header,
                        confirmed_message_count,
                        "reorg detected"
                    );
                }
                break;
            }
        }

        // Duplicate of the stored row: skip it.
        prev_delayed_read = next.delayed_messages_read;
        skipped += 1;
        confirmed_message_count = confirmed_message_count.saturating_sub(1);
        pos += 1;
    }

    messages.drain(..skipped);
    Ok(Reconciled { feed_reorg, confirmed_reorg, prev_delayed_read, start_pos: pos, messages })
}
