//! The block producer: drains committed messages into blocks.
//!
//! Two long-lived workers run here. The producer loop wakes on the
//! new-message notifier (or a 10-second timer), takes the create-blocks mutex
//! and a read share of the reorg lock, and materializes every unblocked
//! message through the execution engine. The announce task logs newly
//! produced blocks off the new-block notifier, at most once per second.

use crate::{
    error::StreamerError,
    metrics::Metrics,
    streamer::TransactionStreamer,
    traits::{BlockWriteStatus, Blockchain, ExecutionEngine, SourceError},
};
use alloy_primitives::B256;
use std::{
    sync::{atomic::Ordering, Arc},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use streamer_storage::MessageStore;
use streamer_types::LogRecord;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const PRODUCER_WAKE_PERIOD: Duration = Duration::from_secs(10);
const ANNOUNCE_MIN_PERIOD: Duration = Duration::from_secs(1);
const UPGRADE_ERROR_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

impl<S, BC, E> TransactionStreamer<S, BC, E>
where
    S: MessageStore + 'static,
    BC: Blockchain + 'static,
    E: ExecutionEngine<State = BC::State> + 'static,
{
    /// Launches the background workers. Collaborator injection must be
    /// complete before this is called.
    ///
    /// # Panics
    ///
    /// Panics when called twice.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        assert!(
            !self.started.swap(true, Ordering::SeqCst),
            "transaction streamer already started"
        );
        let new_messages = self
            .new_message_rx
            .lock()
            .expect("notifier mutex poisoned")
            .take()
            .expect("new-message notifier already consumed");
        let new_blocks = self
            .new_block_rx
            .lock()
            .expect("notifier mutex poisoned")
            .take()
            .expect("new-block notifier already consumed");

        vec![
            tokio::spawn(Arc::clone(self).produce_blocks_task(cancel.clone(), new_messages)),
            tokio::spawn(Arc::clone(self).announce_blocks_task(cancel, new_blocks)),
        ]
    }

    async fn produce_blocks_task(
        self: Arc<Self>,
        cancel: CancellationToken,
        mut new_messages: tokio::sync::mpsc::Receiver<()>,
    ) {
        loop {
            if let Err(err) = self.create_blocks(&cancel).await {
                error!(target: "transaction_streamer", %err, "error creating blocks");
                if err.is_fatal() {
                    let _ = self.fatal_tx.send(err);
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = new_messages.recv() => {}
                _ = tokio::time::sleep(PRODUCER_WAKE_PERIOD) => {}
            }
        }
    }

    async fn announce_blocks_task(
        self: Arc<Self>,
        cancel: CancellationToken,
        mut new_blocks: tokio::sync::mpsc::Receiver<()>,
    ) {
        let mut last_announced: Option<B256> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                signal = new_blocks.recv() => {
                    if signal.is_none() {
                        return;
                    }
                }
            }
            let latest = self.latest.lock().expect("latest block mutex poisoned").clone();
            let Some((block, message)) = latest else { continue };
            if last_announced == Some(block.header.hash) {
                continue;
            }
            info!(
                target: "transaction_streamer",
                l2_block = block.header.number,
                l2_block_hash = %block.header.hash,
                l1_block = message.header.block_number,
                l1_timestamp = message.header.timestamp,
                "created block"
            );
            last_announced = Some(block.header.hash);
            tokio::select! {
                _ = tokio::time::sleep(ANNOUNCE_MIN_PERIOD) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}

impl<S, BC, E> TransactionStreamer<S, BC, E>
where
    S: MessageStore,
    BC: Blockchain,
    E: ExecutionEngine<State = BC::State>,
{
    /// Produces and records blocks for all available messages.
    ///
    /// Exits early and without error when a reorg is pending (the writer is
    /// waiting on the read lock held here) or when `cancel` fires between
    /// blocks.
    pub async fn create_blocks(&self, cancel: &CancellationToken) -> Result<(), StreamerError> {
        let mut create_state = self.create_blocks.lock().await;
        let _reorg_guard = self.reorg_lock.read().await;

        let msg_count = self.store.message_count()?;
        let initial_header =
            self.chain.current_header().ok_or(StreamerError::MissingCurrentHeader)?;
        self.chain.recover_state(&initial_header).map_err(StreamerError::StateRecovery)?;
        let mut last_header = initial_header;
        let mut pos = self.block_number_to_message_count(last_header.number);

        let inbox_reader = self.inbox_reader.get().cloned();
        let batch_fetcher = move |batch_num: u64| -> Result<Vec<u8>, SourceError> {
            match &inbox_reader {
                Some(reader) => reader.sequencer_message_bytes(batch_num),
                None => Err("inbox reader not configured".into()),
            }
        };

        while pos < msg_count {
            let mut chain_state =
                self.chain.state_at(last_header.state_root).map_err(StreamerError::Blockchain)?;

            if self.reorg_pending.load(Ordering::SeqCst) > 0 {
                // Stop block creation; the pending reorg needs our read lock.
                break;
            }
            if cancel.is_cancelled() {
                return Ok(());
            }

            let msg = self.get_message(pos)?;

            let started_at = Instant::now();
            let (block, receipts) = self.engine.produce_block(
                &msg.message,
                msg.delayed_messages_read,
                &last_header,
                &mut chain_state,
                &batch_fetcher,
            )?;

            // produce_block advances one message.
            pos += 1;

            let logs: Vec<LogRecord> =
                receipts.iter().flat_map(|receipt| receipt.logs.clone()).collect();
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
                validator.new_block(&block, &last_header, &msg);
            }

            if create_state.version_check.due() {
                self.check_scheduled_upgrade(&chain_state)?;
            }

            Metrics::record_message_in_block(pos);
            *self.latest.lock().expect("latest block mutex poisoned") =
                Some((block.clone(), msg.message.clone()));
            let _ = self.new_block_tx.try_send(());

            last_header = block.header;
        }

        Ok(())
    }

    fn check_scheduled_upgrade(&self, chain_state: &BC::State) -> Result<(), StreamerError> {
        let upgrade = self.engine.scheduled_upgrade(chain_state)?;
        let max_supported = self.engine.max_supported_version();
        if upgrade.version <= max_supported {
            return Ok(());
        }
        let time_until_upgrade = if upgrade.activation_timestamp == 0 {
            // The upgrade takes effect in the next block.
            Duration::ZERO
        } else {
            UNIX_EPOCH
                .checked_add(Duration::from_secs(upgrade.activation_timestamp))
                .and_then(|at| at.duration_since(SystemTime::now()).ok())
                .unwrap_or(Duration::ZERO)
        };
        if time_until_upgrade < UPGRADE_ERROR_WINDOW {
            error!(
                target: "transaction_streamer",
                seconds_until_upgrade = time_until_upgrade.as_secs(),
                upgrade_scheduled_at = upgrade.activation_timestamp,
                max_supported_version = max_supported,
                pending_version = upgrade.version,
                "you need to update your node to the latest version before this scheduled protocol upgrade"
            );
        } else {
            warn!(
                target: "transaction_streamer",
                seconds_until_upgrade = time_until_upgrade.as_secs(),
                upgrade_scheduled_at = upgrade.activation_timestamp,
                max_supported_version = max_supported,
                pending_version = upgrade.version,
                "you need to update your node to the latest version before this scheduled protocol upgrade"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{init_message, message, setup, setup_with_engine, MockEngine, TestSetup},
        traits::ScheduledUpgrade,
    };
    use std::sync::Mutex as StdMutex;
    use streamer_types::MessageWithMetadata;

    async fn seed(t: &TestSetup, extra: usize) {
        let mut messages = vec![init_message()];
        for i in 0..extra {
            messages.push(message(1, i as u8));
        }
        t.streamer.add_messages(0, false, messages).await.unwrap();
    }

    #[tokio::test]
    async fn drain_materializes_every_stored_message() {
        let t = setup();
        seed(&t, 3).await;

        let cancel = CancellationToken::new();
        t.streamer.create_blocks(&cancel).await.unwrap();

        assert_eq!(t.chain.head_number(), 3);
        assert_eq!(t.engine.produced.load(Ordering::SeqCst), 3);

        let latest = t.streamer.latest.lock().unwrap().clone();
        let (block, source) = latest.expect("latest pair published");
        assert_eq!(block.header.number, 3);
        assert_eq!(source, t.streamer.get_message(3).unwrap().message);

        let mut rx = t.streamer.new_block_rx.lock().unwrap().take().unwrap();
        assert!(rx.try_recv().is_ok(), "new-block notifier signaled");
    }

    #[tokio::test]
    async fn drain_is_idempotent_when_caught_up() {
        let t = setup();
        seed(&t, 2).await;

        let cancel = CancellationToken::new();
        t.streamer.create_blocks(&cancel).await.unwrap();
        t.streamer.create_blocks(&cancel).await.unwrap();

        assert_eq!(t.chain.head_number(), 2);
        assert_eq!(t.engine.produced.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancellation_between_blocks_is_not_an_error() {
        let t = setup();
        seed(&t, 3).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        t.streamer.create_blocks(&cancel).await.unwrap();

        assert_eq!(t.engine.produced.load(Ordering::SeqCst), 0);
        assert_eq!(t.chain.head_number(), 0);
    }

    #[tokio::test]
    async fn pending_upgrade_is_logged_not_fatal() {
        let engine = MockEngine::new();
        *engine.upgrade.lock().unwrap() =
            ScheduledUpgrade { version: 99, activation_timestamp: 0 };
        let t = setup_with_engine(engine);
        seed(&t, 1).await;

        let cancel = CancellationToken::new();
        t.streamer.create_blocks(&cancel).await.unwrap();
        assert_eq!(t.chain.head_number(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fatal_engine_error_reaches_fatal_channel() {
        let engine = MockEngine { node_out_of_date: true, ..MockEngine::new() };
        let mut t = setup_with_engine(engine);
        seed(&t, 1).await;

        let cancel = CancellationToken::new();
        let handles = t.streamer.start(cancel.clone());

        let fatal = tokio::time::timeout(Duration::from_secs(5), t.fatal_rx.recv())
            .await
            .expect("fatal error within deadline")
            .expect("fatal channel open");
        assert!(fatal.is_fatal());

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pending_reorg_aborts_drain_cooperatively() {
        let (gate_tx, gate_rx) = std::sync::mpsc::channel();
        let engine = MockEngine { gate: Some(StdMutex::new(gate_rx)), ..MockEngine::new() };
        let t = setup_with_engine(engine);
        seed(&t, 4).await;

        let cancel = CancellationToken::new();
        let handles = t.streamer.start(cancel.clone());

        // Let exactly one block through, then request a reorg mid-drain.
        gate_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while t.chain.head_number() < 1 {
            assert!(Instant::now() < deadline, "first block never produced");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let streamer = Arc::clone(&t.streamer);
        let reorg = tokio::spawn(async move { streamer.reorg_to(2).await });
        let deadline = Instant::now() + Duration::from_secs(5);
        while t.streamer.reorg_pending.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "reorg never became pending");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // Unblock the producer; it must yield to the reorg instead of
        // draining the remaining messages.
        gate_tx.send(()).unwrap();
        reorg.await.unwrap().unwrap();

        assert_eq!(t.streamer.get_message_count().unwrap(), 2);
        assert_eq!(t.chain.head_number(), 1, "chain rolled back to the reorg target");
        assert!(
            t.engine.produced.load(Ordering::SeqCst) < 4,
            "drain stopped before materializing everything"
        );

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn started_workers_drain_new_messages() {
        let t = setup();
        seed(&t, 0).await;

        let cancel = CancellationToken::new();
        let handles = t.streamer.start(cancel.clone());

        let pos = t.streamer.get_message_count().unwrap();
        t.streamer.add_messages(pos, true, vec![message(1, 0x51)]).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while t.chain.head_number() < 1 {
            assert!(Instant::now() < deadline, "notifier-driven drain never happened");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn missing_message_mid_drain_is_an_error() {
        let t = setup();
        seed(&t, 1).await;
        // Corrupt the count upward so the drain runs past the stored rows.
        let mut batch = streamer_storage::Batch::new();
        batch.set_message_count(5);
        t.streamer.store.write_batch(batch).unwrap();

        let cancel = CancellationToken::new();
        let err = t.streamer.create_blocks(&cancel).await.unwrap_err();
        assert!(matches!(err, StreamerError::MessageNotFound { index: 2 }));
    }

    #[tokio::test]
    async fn announce_uses_latest_pair() {
        let t = setup();
        seed(&t, 1).await;

        let cancel = CancellationToken::new();
        t.streamer.create_blocks(&cancel).await.unwrap();

        let latest = t.streamer.latest.lock().unwrap().clone();
        let (block, source) = latest.expect("latest pair published");
        let stored: MessageWithMetadata = t.streamer.get_message(1).unwrap();
        assert_eq!(block.header.number, 1);
        assert_eq!(source, stored.message);
    }
}
