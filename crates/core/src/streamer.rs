//! The insertion coordinator: sole writer to the message store and the
//! broadcast queue.
//!
//! Every mutation (feed, confirmed, sequencer, or explicit reorg) funnels
//! through the insertion mutex. The lock hierarchy is insertion mutex, then
//! create-blocks mutex, then the reorg lock; the insertion mutex may never be
//! acquired while either of the others is held, and the create-blocks mutex
//! may never be acquired under the reorg lock.

use crate::{
    config::StreamerConfig,
    error::StreamerError,
    metrics::Metrics,
    queue::BroadcastQueue,
    reconcile::{skip_duplicate_messages, RateLimiter},
    traits::{
        BlockValidator, BlockWriteStatus, Blockchain, Broadcaster, ExecutionEngine, InboxReader,
        SequencerCoordinator, SequencingHooks,
    },
};
use alloy_primitives::{Address, Bytes, ChainId, B256, U256};
use alloy_rlp::Decodable;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc, Mutex as StdMutex, OnceLock,
    },
    time::{Duration, Instant},
};
use streamer_storage::{Batch, MessageStore};
use streamer_types::{
    l1_message_kind, l2_payload_kind, Block, BroadcastFeedMessage, L1IncomingMessage,
    L1IncomingMessageHeader, LogRecord, MessageIndex, MessageWithMetadata,
};
use tokio::sync::{mpsc, Mutex, RwLock, RwLockReadGuard};
use tracing::{info, warn};

const REORG_LOG_PERIOD: Duration = Duration::from_secs(60);
const VERSION_CHECK_PERIOD: Duration = Duration::from_secs(60);

/// State guarded by the insertion mutex.
#[derive(Debug)]
pub(crate) struct InsertionState {
    pub(crate) queue: BroadcastQueue,
    pub(crate) feed_reorg_log: RateLimiter,
    pub(crate) pending_reorg_log: RateLimiter,
}

/// State guarded by the create-blocks mutex.
#[derive(Debug)]
pub(crate) struct CreateBlocksState {
    pub(crate) version_check: RateLimiter,
}

/// The authoritative, totally ordered log of L2 messages.
///
/// Feed messages, L1-confirmed messages, and locally sequenced messages are
/// merged into one sequence; a background producer loop materializes each
/// message into a block. See the crate docs for the overall control flow.
pub struct TransactionStreamer<S, BC, E> {
    pub(crate) store: Arc<S>,
    pub(crate) chain: Arc<BC>,
    pub(crate) engine: Arc<E>,
    pub(crate) config: StreamerConfig,
    pub(crate) chain_id: ChainId,
    pub(crate) fatal_tx: mpsc::UnboundedSender<StreamerError>,

    pub(crate) insertion: Mutex<InsertionState>,
    pub(crate) create_blocks: Mutex<CreateBlocksState>,
    pub(crate) reorg_lock: RwLock<()>,
    /// Incremented before a reorg writer blocks on the reorg lock, letting
    /// the producer abort a drain without waiting for its read lock to be
    /// contended.
    pub(crate) reorg_pending: AtomicU32,
    /// Lock-free mirror of the queue's start position.
    pub(crate) queued_start_pos: Arc<AtomicU64>,

    pub(crate) new_message_tx: mpsc::Sender<()>,
    pub(crate) new_message_rx: StdMutex<Option<mpsc::Receiver<()>>>,
    pub(crate) new_block_tx: mpsc::Sender<()>,
    pub(crate) new_block_rx: StdMutex<Option<mpsc::Receiver<()>>>,

    /// Most recently produced block and its source message, published
    /// together so observers see a consistent pair.
    pub(crate) latest: StdMutex<Option<(Block, L1IncomingMessage)>>,

    pub(crate) coordinator: OnceLock<Arc<dyn SequencerCoordinator>>,
    pub(crate) broadcaster: Option<Arc<dyn Broadcaster>>,
    pub(crate) validator: OnceLock<Arc<dyn BlockValidator>>,
    pub(crate) inbox_reader: OnceLock<Arc<dyn InboxReader>>,

    pub(crate) started: AtomicBool,
}

impl<S, BC, E> fmt::Debug for TransactionStreamer<S, BC, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStreamer")
            .field("chain_id", &self.chain_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, BC, E> TransactionStreamer<S, BC, E>
where
    S: MessageStore,
    BC: Blockchain,
    E: ExecutionEngine<State = BC::State>,
{
    /// Creates a streamer over an opened store.
    ///
    /// Fatal conditions discovered by the background workers are pushed onto
    /// `fatal_tx`; the host is expected to shut down on receipt.
    pub fn new(
        store: Arc<S>,
        chain: Arc<BC>,
        engine: Arc<E>,
        broadcaster: Option<Arc<dyn Broadcaster>>,
        fatal_tx: mpsc::UnboundedSender<StreamerError>,
        config: StreamerConfig,
    ) -> Arc<Self> {
        Metrics::init();
        let (new_message_tx, new_message_rx) = mpsc::channel(1);
        let (new_block_tx, new_block_rx) = mpsc::channel(1);
        let queued_start_pos = Arc::new(AtomicU64::new(0));
        let chain_id = chain.chain_id();

        Arc::new(Self {
            store,
            chain,
            engine,
            config,
            chain_id,
            fatal_tx,
            insertion: Mutex::new(InsertionState {
                queue: BroadcastQueue::new(Arc::clone(&queued_start_pos)),
                feed_reorg_log: RateLimiter::new(REORG_LOG_PERIOD),
                pending_reorg_log: RateLimiter::new(REORG_LOG_PERIOD),
            }),
            create_blocks: Mutex::new(CreateBlocksState {
                version_check: RateLimiter::new(VERSION_CHECK_PERIOD),
            }),
            reorg_lock: RwLock::new(()),
            reorg_pending: AtomicU32::new(0),
            queued_start_pos,
            new_message_tx,
            new_message_rx: StdMutex::new(Some(new_message_rx)),
            new_block_tx,
            new_block_rx: StdMutex::new(Some(new_block_rx)),
            latest: StdMutex::new(None),
            coordinator: OnceLock::new(),
            broadcaster,
            validator: OnceLock::new(),
            inbox_reader: OnceLock::new(),
            started: AtomicBool::new(false),
        })
    }

    /// Injects the block validator. Must happen before [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// Panics when called after start, or twice.
    pub fn set_block_validator(&self, validator: Arc<dyn BlockValidator>) {
        assert!(
            !self.started.load(Ordering::SeqCst),
            "trying to set block validator after start"
        );
        assert!(
            self.validator.set(validator).is_ok(),
            "trying to set block validator when already set"
        );
    }

    /// Injects the sequencer coordinator. Must happen before
    /// [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// Panics when called after start, or twice.
    pub fn set_seq_coordinator(&self, coordinator: Arc<dyn SequencerCoordinator>) {
        assert!(!self.started.load(Ordering::SeqCst), "trying to set coordinator after start");
        assert!(
            self.coordinator.set(coordinator).is_ok(),
            "trying to set coordinator when already set"
        );
    }

    /// Injects the inbox reader. Must happen before [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// Panics when called after start, or twice.
    pub fn set_inbox_reader(&self, inbox_reader: Arc<dyn InboxReader>) {
        assert!(!self.started.load(Ordering::SeqCst), "trying to set inbox reader after start");
        assert!(
            self.inbox_reader.set(inbox_reader).is_ok(),
            "trying to set inbox reader when already set"
        );
    }

    /// Chain id of the underlying L2 chain.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Block number message index 0 corresponds to.
    pub fn genesis_block_number(&self) -> u64 {
        self.chain.genesis_block_number()
    }

    /// Number of messages a chain extending through `block_number` contains.
    pub fn block_number_to_message_count(&self, block_number: u64) -> MessageIndex {
        block_number + 1 - self.chain.genesis_block_number()
    }

    /// Block number a log of `count` messages extends through. `-1` relative
    /// to genesis when the log is empty.
    pub fn message_count_to_block_number(&self, count: MessageIndex) -> i64 {
        count as i64 + self.chain.genesis_block_number() as i64 - 1
    }

    /// Reads the message at `index`. Non-blocking; never takes the insertion
    /// mutex.
    pub fn get_message(&self, index: MessageIndex) -> Result<MessageWithMetadata, StreamerError> {
        let Some(bytes) = self.store.message(index)? else {
            return Err(StreamerError::MessageNotFound { index });
        };
        MessageWithMetadata::decode(&mut bytes.as_slice())
            .map_err(|source| StreamerError::CorruptMessage { index, source })
    }

    /// Reads the total message count. Non-blocking; never takes the insertion
    /// mutex.
    pub fn get_message_count(&self) -> Result<MessageIndex, StreamerError> {
        Ok(self.store.message_count()?)
    }

    /// Reads the total message count with the insertion mutex held, so no
    /// insertion is mid-flight while the value is taken.
    pub async fn get_message_count_sync(&self) -> Result<MessageIndex, StreamerError> {
        let _state = self.insertion.lock().await;
        Ok(self.store.message_count()?)
    }

    /// Blocks reorgs until the returned guard is dropped. Dropping the guard
    /// is the resume operation; multiple pauses may be held concurrently.
    pub async fn pause_reorgs(&self) -> RwLockReadGuard<'_, ()> {
        self.reorg_lock.read().await
    }

    /// Inserts messages starting at `pos`. `confirmed` marks the entire range
    /// as reconstructed from L1.
    pub async fn add_messages(
        &self,
        pos: MessageIndex,
        confirmed: bool,
        messages: Vec<MessageWithMetadata>,
    ) -> Result<(), StreamerError> {
        self.add_messages_and_end_batch(pos, confirmed, messages, None).await
    }

    /// Like [`add_messages`](Self::add_messages), also committing the
    /// caller's pending batch in the same store transaction as the messages.
    pub async fn add_messages_and_end_batch(
        &self,
        pos: MessageIndex,
        confirmed: bool,
        messages: Vec<MessageWithMetadata>,
        batch: Option<Batch>,
    ) -> Result<(), StreamerError> {
        let mut state = self.insertion.lock().await;
        self.add_messages_impl(&mut state, pos, confirmed, messages, batch).await
    }

    /// Ingests an ordered batch of feed messages.
    ///
    /// Messages already stored are skipped; the remainder is buffered in the
    /// broadcast queue and drained into the store once its predecessor
    /// position exists there.
    pub async fn add_broadcast_messages(
        &self,
        feed_messages: Vec<BroadcastFeedMessage>,
    ) -> Result<(), StreamerError> {
        if feed_messages.is_empty() {
            return Ok(());
        }
        let broadcast_start_pos = feed_messages[0].sequence_number;
        let mut messages = Vec::with_capacity(feed_messages.len());
        let mut expected = broadcast_start_pos;
        for feed_message in feed_messages {
            if feed_message.sequence_number != expected {
                return Err(StreamerError::InvalidFeedSequence {
                    got: feed_message.sequence_number,
                    expected,
                });
            }
            messages.push(feed_message.message);
            expected += 1;
        }

        let mut state = self.insertion.lock().await;

        // Skip any messages already in the store. prev_delayed_read of 0 is
        // fine: the output value is unused on this path. Nothing here is
        // confirmed, so the confirmed-reorg verdict cannot fire.
        let mut batch: Option<Batch> = None;
        let rec = skip_duplicate_messages(
            self.store.as_ref(),
            &mut state.feed_reorg_log,
            0,
            broadcast_start_pos,
            messages,
            0,
            Some(&mut batch),
        )?;
        if let Some(batch) = batch {
            // Store updates made inside reconciliation.
            self.store.write_batch(batch)?;
        }
        if rec.messages.is_empty() {
            // No new messages received.
            return Ok(());
        }

        let start_pos = state.queue.integrate(
            rec.start_pos,
            rec.messages,
            rec.feed_reorg,
            self.config.max_broadcaster_queue_size,
        );

        if state.queue.active_reorg() || state.queue.is_empty() {
            // Waiting on L1 confirmation, or nothing to add.
            return Ok(());
        }

        if start_pos > 0 && self.store.message(start_pos - 1)?.is_none() {
            // Predecessor not stored yet; hold the queue until confirmed
            // ingestion reaches it.
            return Ok(());
        }

        self.add_messages_impl(&mut state, start_pos, false, Vec::new(), None).await
    }

    /// Inserts the index-0 chain-init message carrying the chain id. Only for
    /// tests and local dev nodes.
    pub async fn add_fake_init_message(&self) -> Result<(), StreamerError> {
        self.add_messages(
            0,
            false,
            vec![MessageWithMetadata {
                message: L1IncomingMessage {
                    header: L1IncomingMessageHeader {
                        kind: l1_message_kind::INITIALIZE,
                        sender: Address::ZERO,
                        block_number: 0,
                        timestamp: 0,
                        request_id: Some(B256::ZERO),
                        l1_base_fee: U256::ZERO,
                    },
                    l2_msg: Bytes::copy_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>()),
                    batch_gas_cost: None,
                },
                delayed_messages_read: 1,
            }],
        )
        .await
    }

    /// Truncates the log to `count` messages, rolling the chain and validator
    /// back with it.
    pub async fn reorg_to(&self, count: MessageIndex) -> Result<(), StreamerError> {
        self.reorg_to_and_end_batch(Batch::new(), count).await
    }

    /// Like [`reorg_to`](Self::reorg_to), committing the caller's pending
    /// batch together with the truncation.
    pub async fn reorg_to_and_end_batch(
        &self,
        mut batch: Batch,
        count: MessageIndex,
    ) -> Result<(), StreamerError> {
        let _state = self.insertion.lock().await;
        self.reorg_to_internal(&mut batch, count).await?;
        Ok(self.store.write_batch(batch)?)
    }

    /// Sequencer path: produce a block from raw transactions and append the
    /// resulting message.
    ///
    /// Returns `Ok(None)` when nothing was sequenced (no receipts, or every
    /// transaction errored). The message is committed before the block so a
    /// crash in between recovers by regenerating the block from the log.
    pub async fn sequence_transactions(
        &self,
        header: L1IncomingMessageHeader,
        txs: Vec<Bytes>,
        hooks: &mut SequencingHooks,
    ) -> Result<Option<Block>, StreamerError> {
        let _state = self.insertion.lock().await;
        let _create = self.create_blocks.lock().await;
        let _reorg = self.reorg_lock.read().await;

        let pos = self.store.message_count()?;
        let last_header = self.chain.current_header().ok_or(StreamerError::MissingCurrentHeader)?;
        let expected_block_number = self.message_count_to_block_number(pos);
        if last_header.number as i64 != expected_block_number {
            return Err(StreamerError::RetrySequencer {
                got: last_header.number,
                expected: expected_block_number,
            });
        }
        let mut chain_state =
            self.chain.state_at(last_header.state_root).map_err(StreamerError::Blockchain)?;
        let delayed_messages_read = self.prev_delayed_read(pos)?;

        let started_at = Instant::now();
        let (block, receipts) = self.engine.produce_block_advanced(
            &header,
            &txs,
            delayed_messages_read,
            &last_header,
            &mut chain_state,
            hooks,
        )?;
        if hooks.tx_errors.len() != txs.len() {
            return Err(StreamerError::TxErrorCountMismatch {
                got: hooks.tx_errors.len(),
                expected: txs.len(),
            });
        }
        if receipts.is_empty() || hooks.tx_errors.iter().all(Result::is_err) {
            return Ok(None);
        }

        let message = message_from_txes(header, &txs, &hooks.tx_errors);
        let msg_with_meta = MessageWithMetadata { message, delayed_messages_read };

        if let Some(coordinator) = self.coordinator.get() {
            coordinator
                .sequencing_message(pos, &msg_with_meta)
                .map_err(StreamerError::Coordinator)?;
        }

        self.write_messages(pos, std::slice::from_ref(&msg_with_meta), None)?;

        if let Some(broadcaster) = &self.broadcaster {
            broadcaster
                .broadcast_single(&msg_with_meta, pos)
                .map_err(StreamerError::Broadcaster)?;
        }

        // Only write the block after the message, so a crash in between
        // recovers on startup by regenerating the block from the log.
        let logs: Vec<LogRecord> = receipts.iter().flat_map(|r| r.logs.clone()).collect();
        let status = self
            .chain
            .write_block_and_set_head(
                &block,
                &receipts,
                &logs,
                &mut chain_state,
                true,
                started_at.elapsed(),
            )
            .map_err(StreamerError::Blockchain)?;
        if status == BlockWriteStatus::Side {
            return Err(StreamerError::BlockRejectedAsSide);
        }

        if let Some(validator) = self.validator.get() {
            validator.new_block(&block, &last_header, &msg_with_meta);
        }

        Ok(Some(block))
    }

    /// Appends delayed L1 messages whose delayed-sequence position must equal
    /// the log's current delayed-read count. Drives block production inline
    /// when it was already caught up.
    pub async fn sequence_delayed_messages(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        messages: Vec<L1IncomingMessage>,
        first_delayed_seq_num: u64,
    ) -> Result<(), StreamerError> {
        let _state = self.insertion.lock().await;

        let pos = self.store.message_count()?;
        let delayed_messages_read = self.prev_delayed_read(pos)?;
        if delayed_messages_read != first_delayed_seq_num {
            return Err(StreamerError::DelayedPosition {
                got: first_delayed_seq_num,
                expected: delayed_messages_read,
            });
        }

        let mut messages_with_meta = Vec::with_capacity(messages.len());
        for (i, message) in messages.into_iter().enumerate() {
            let new_message = MessageWithMetadata {
                message,
                delayed_messages_read: delayed_messages_read + i as u64 + 1,
            };
            if let Some(coordinator) = self.coordinator.get() {
                coordinator
                    .sequencing_message(pos + i as u64, &new_message)
                    .map_err(StreamerError::Coordinator)?;
            }
            messages_with_meta.push(new_message);
        }

        info!(
            target: "transaction_streamer",
            pos,
            length = messages_with_meta.len(),
            "added delayed messages"
        );
        self.write_messages(pos, &messages_with_meta, None)?;

        if let Some(broadcaster) = &self.broadcaster {
            for (i, message) in messages_with_meta.iter().enumerate() {
                broadcaster
                    .broadcast_single(message, pos + i as u64)
                    .map_err(StreamerError::Broadcaster)?;
            }
        }

        let expected_block_number = self.message_count_to_block_number(pos);
        let current = self.chain.current_header().ok_or(StreamerError::MissingCurrentHeader)?;
        // Already caught up to the latest message: make sure the delayed
        // messages get blocks without waiting for the producer's wake.
        if current.number as i64 >= expected_block_number {
            self.create_blocks(cancel).await?;
        }

        Ok(())
    }

    pub(crate) fn prev_delayed_read(&self, pos: MessageIndex) -> Result<u64, StreamerError> {
        if pos == 0 {
            return Ok(0);
        }
        Ok(self.get_message(pos - 1)?.delayed_messages_read)
    }

    /// Core merged-insertion algorithm. The insertion mutex must be held.
    pub(crate) async fn add_messages_impl(
        &self,
        state: &mut InsertionState,
        message_start_pos: MessageIndex,
        confirmed: bool,
        mut messages: Vec<MessageWithMetadata>,
        mut batch: Option<Batch>,
    ) -> Result<(), StreamerError> {
        let confirmed_message_count = if confirmed { messages.len() } else { 0 };
        let messages_after_pos = message_start_pos + messages.len() as u64;
        let broadcast_start_pos = self.queued_start_pos.load(Ordering::SeqCst);

        let prev_delayed_read = self.prev_delayed_read(message_start_pos)?;

        // When the incoming range reaches the queue, splice the queue's tail
        // onto it; the queue is then consumed (or overridden) by this insert.
        let mut clear_queue_on_success = state.queue.splice_overlap(
            broadcast_start_pos,
            message_start_pos,
            messages_after_pos,
            &mut messages,
        );

        let mut rec = skip_duplicate_messages(
            self.store.as_ref(),
            &mut state.feed_reorg_log,
            prev_delayed_read,
            message_start_pos,
            messages,
            confirmed_message_count,
            Some(&mut batch),
        )?;
        if rec.feed_reorg {
            // Never allow the feed to reorg confirmed history.
            rec.messages.clear();
            clear_queue_on_success = false;
        }

        // Validate delayed-read accounting of everything left to write.
        let mut running_delayed_read = rec.prev_delayed_read;
        for (i, msg) in rec.messages.iter().enumerate() {
            let diff = msg.delayed_messages_read.wrapping_sub(running_delayed_read);
            if diff != 0 && diff != 1 {
                return Err(StreamerError::DelayedReadJump {
                    from: running_delayed_read,
                    to: msg.delayed_messages_read,
                    pos: rec.start_pos + i as u64,
                });
            }
            running_delayed_read = msg.delayed_messages_read;
        }

        if rec.confirmed_reorg {
            let mut reorg_batch = Batch::new();
            self.reorg_to_internal(&mut reorg_batch, rec.start_pos).await?;
            self.store.write_batch(reorg_batch)?;
        } else if rec.feed_reorg {
            if !state.pending_reorg_log.due() {
                return Ok(());
            }
            return Err(StreamerError::ReorgWaitingForConfirmation);
        }

        if rec.messages.is_empty() {
            return match batch {
                Some(batch) => Ok(self.store.write_batch(batch)?),
                None => Ok(()),
            };
        }

        self.write_messages(rec.start_pos, &rec.messages, batch)?;

        if clear_queue_on_success {
            state.queue.clear();
        }

        Ok(())
    }

    /// Truncates everything at and past `count` into `batch` and rolls the
    /// chain back. The caller commits the batch; the insertion mutex must be
    /// held.
    pub(crate) async fn reorg_to_internal(
        &self,
        batch: &mut Batch,
        count: MessageIndex,
    ) -> Result<(), StreamerError> {
        if count == 0 {
            return Err(StreamerError::ReorgOutInitMessage);
        }
        self.reorg_pending.fetch_add(1, Ordering::SeqCst);
        let _reorg_guard = self.reorg_lock.write().await;
        self.reorg_pending.fetch_sub(1, Ordering::SeqCst);

        // count > 0, so the target block number is non-negative.
        let target_block_number = self.message_count_to_block_number(count);
        match self.chain.block_by_number(target_block_number as u64) {
            Some(target) => {
                if let Some(validator) = self.validator.get() {
                    validator
                        .reorg_to_block(target.header.number, target.header.hash)
                        .map_err(StreamerError::Validator)?;
                }
                self.chain.reorg_to_old_block(&target).map_err(StreamerError::Blockchain)?;
            }
            None => {
                warn!(
                    target: "transaction_streamer",
                    block = target_block_number,
                    "reorg target block not found"
                );
            }
        }

        batch.delete_messages_from(count);
        batch.set_message_count(count);
        Metrics::record_message_count(count);
        Ok(())
    }

    /// Writes `messages` at `pos`, advances the count, commits, and signals
    /// the new-message notifier. The insertion mutex must be held and `pos`
    /// must equal the current count.
    pub(crate) fn write_messages(
        &self,
        pos: MessageIndex,
        messages: &[MessageWithMetadata],
        batch: Option<Batch>,
    ) -> Result<(), StreamerError> {
        let mut batch = batch.unwrap_or_default();
        for (i, message) in messages.iter().enumerate() {
            batch.put_message(pos + i as u64, message.encoded());
        }
        let count = pos + messages.len() as u64;
        batch.set_message_count(count);
        self.store.write_batch(batch)?;
        Metrics::record_message_count(count);

        // Coalescing signal: a pending wake already covers this write.
        let _ = self.new_message_tx.try_send(());

        Ok(())
    }
}

/// Packs sequenced transactions into an L2 message body, skipping
/// transactions their hooks rejected.
fn message_from_txes(
    header: L1IncomingMessageHeader,
    txs: &[Bytes],
    tx_errors: &[Result<(), crate::traits::SourceError>],
) -> L1IncomingMessage {
    let mut l2_msg = Vec::new();
    if txs.len() == 1 && tx_errors[0].is_ok() {
        l2_msg.push(l2_payload_kind::SIGNED_TX);
        l2_msg.extend_from_slice(&txs[0]);
    } else {
        l2_msg.push(l2_payload_kind::BATCH);
        for (tx, result) in txs.iter().zip(tx_errors) {
            if result.is_err() {
                continue;
            }
            l2_msg.extend_from_slice(&((tx.len() + 1) as u64).to_be_bytes());
            l2_msg.push(l2_payload_kind::SIGNED_TX);
            l2_msg.extend_from_slice(tx);
        }
    }
    L1IncomingMessage { header, l2_msg: l2_msg.into(), batch_gas_cost: None }
}
