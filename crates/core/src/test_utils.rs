//! Mock implementations and builders shared by the crate's tests.

use crate::{
    config::StreamerConfig,
    error::{EngineError, StreamerError},
    streamer::TransactionStreamer,
    traits::{
        BatchFetcher, BlockWriteStatus, Blockchain, ExecutionEngine, ScheduledUpgrade,
        SequencingHooks, SourceError,
    },
};
use alloy_primitives::{Address, Bytes, ChainId, B256, U256};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};
use streamer_storage::{Batch, BatchOp, MessageStore, StorageError};
use streamer_types::{
    l1_message_kind, Block, BlockHeader, BroadcastFeedMessage, L1IncomingMessage,
    L1IncomingMessageHeader, LogRecord, MessageWithMetadata, Receipt,
};
use tokio::sync::mpsc;

/// In-memory message store with the same batch semantics as the mdbx backend.
#[derive(Debug, Default)]
pub(crate) struct MemoryMessageStore {
    inner: StdMutex<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    messages: BTreeMap<u64, Vec<u8>>,
    count: u64,
}

impl Default for MemoryInner {
    fn default() -> Self {
        // Mirrors the count-initialized-to-zero state of a freshly opened db.
        Self { messages: BTreeMap::new(), count: 0 }
    }
}

impl MemoryMessageStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryMessageStore {
    fn message(&self, index: u64) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.inner.lock().unwrap().messages.get(&index).cloned())
    }

    fn message_count(&self) -> Result<u64, StorageError> {
        Ok(self.inner.lock().unwrap().count)
    }

    fn write_batch(&self, batch: Batch) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        for op in batch.into_ops() {
            match op {
                BatchOp::PutMessage { index, encoded } => {
                    inner.messages.insert(index, encoded);
                }
                BatchOp::DeleteMessagesFrom { index } => {
                    let _stale = inner.messages.split_off(&index);
                }
                BatchOp::SetMessageCount { count } => {
                    inner.count = count;
                }
            }
        }
        Ok(())
    }
}

/// Mutable-state stand-in; the mocks never carry real state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MockState;

/// Blockchain mock tracking a simple canonical chain of produced blocks.
#[derive(Debug)]
pub(crate) struct MockBlockchain {
    chain_id: ChainId,
    genesis: u64,
    blocks: StdMutex<Vec<Block>>,
}

pub(crate) fn block_hash(number: u64) -> B256 {
    let mut bytes = [0xb1u8; 32];
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

impl MockBlockchain {
    pub(crate) fn new(genesis: u64) -> Self {
        let genesis_block = Block {
            header: BlockHeader {
                number: genesis,
                hash: block_hash(genesis),
                parent_hash: B256::ZERO,
                state_root: B256::from(U256::from(genesis)),
                timestamp: 0,
            },
            transactions: Vec::new(),
        };
        Self { chain_id: 412_346, genesis, blocks: StdMutex::new(vec![genesis_block]) }
    }

    pub(crate) fn head_number(&self) -> u64 {
        self.blocks.lock().unwrap().last().map(|b| b.header.number).unwrap_or_default()
    }
}

impl Blockchain for MockBlockchain {
    type State = MockState;

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn genesis_block_number(&self) -> u64 {
        self.genesis
    }

    fn current_header(&self) -> Option<BlockHeader> {
        self.blocks.lock().unwrap().last().map(|b| b.header.clone())
    }

    fn block_by_number(&self, number: u64) -> Option<Block> {
        let offset = number.checked_sub(self.genesis)?;
        self.blocks.lock().unwrap().get(offset as usize).cloned()
    }

    fn state_at(&self, _state_root: B256) -> Result<Self::State, SourceError> {
        Ok(MockState)
    }

    fn recover_state(&self, _head: &BlockHeader) -> Result<(), SourceError> {
        Ok(())
    }

    fn reorg_to_old_block(&self, block: &Block) -> Result<(), SourceError> {
        let keep = (block.header.number - self.genesis + 1) as usize;
        self.blocks.lock().unwrap().truncate(keep);
        Ok(())
    }

    fn write_block_and_set_head(
        &self,
        block: &Block,
        _receipts: &[Receipt],
        _logs: &[LogRecord],
        _state: &mut Self::State,
        _persist: bool,
        _elapsed: Duration,
    ) -> Result<BlockWriteStatus, SourceError> {
        self.blocks.lock().unwrap().push(block.clone());
        Ok(BlockWriteStatus::Canonical)
    }
}

/// Execution-engine mock producing one deterministic block per message.
#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    /// Gate received on (with a timeout) before each produced block, letting
    /// tests pace the producer loop.
    pub(crate) gate: Option<StdMutex<std::sync::mpsc::Receiver<()>>>,
    /// When set, `produce_block_advanced` reports every transaction failed.
    pub(crate) fail_all_txs: bool,
    /// When set, `produce_block` fails fatally.
    pub(crate) node_out_of_date: bool,
    pub(crate) upgrade: StdMutex<ScheduledUpgrade>,
    pub(crate) max_version: u64,
    pub(crate) produced: AtomicUsize,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            upgrade: StdMutex::new(ScheduledUpgrade { version: 0, activation_timestamp: 0 }),
            max_version: 10,
            ..Self::default()
        }
    }

    fn next_block(&self, parent: &BlockHeader, timestamp: u64) -> Block {
        let number = parent.number + 1;
        Block {
            header: BlockHeader {
                number,
                hash: block_hash(number),
                parent_hash: parent.hash,
                state_root: B256::from(U256::from(number)),
                timestamp,
            },
            transactions: Vec::new(),
        }
    }
}

impl ExecutionEngine for MockEngine {
    type State = MockState;

    fn produce_block(
        &self,
        message: &L1IncomingMessage,
        _delayed_messages_read: u64,
        parent: &BlockHeader,
        _state: &mut Self::State,
        _batch_fetcher: &BatchFetcher<'_>,
    ) -> Result<(Block, Vec<Receipt>), EngineError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(5));
        }
        if self.node_out_of_date {
            return Err(EngineError::NodeOutOfDate);
        }
        self.produced.fetch_add(1, Ordering::SeqCst);
        Ok((self.next_block(parent, message.header.timestamp), vec![Receipt::default()]))
    }

    fn produce_block_advanced(
        &self,
        header: &L1IncomingMessageHeader,
        txs: &[Bytes],
        _delayed_messages_read: u64,
        parent: &BlockHeader,
        _state: &mut Self::State,
        hooks: &mut SequencingHooks,
    ) -> Result<(Block, Vec<Receipt>), EngineError> {
        hooks.tx_errors = txs
            .iter()
            .map(|_| {
                if self.fail_all_txs {
                    Err(SourceError::from("rejected"))
                } else {
                    Ok(())
                }
            })
            .collect();
        let receipts = if self.fail_all_txs {
            Vec::new()
        } else {
            txs.iter().map(|_| Receipt::default()).collect()
        };
        Ok((self.next_block(parent, header.timestamp), receipts))
    }

    fn scheduled_upgrade(&self, _state: &Self::State) -> Result<ScheduledUpgrade, EngineError> {
        Ok(*self.upgrade.lock().unwrap())
    }

    fn max_supported_version(&self) -> u64 {
        self.max_version
    }
}

pub(crate) fn message(delayed_messages_read: u64, payload: u8) -> MessageWithMetadata {
    MessageWithMetadata {
        message: L1IncomingMessage {
            header: L1IncomingMessageHeader {
                kind: l1_message_kind::L2_MESSAGE,
                sender: Address::repeat_byte(0x01),
                block_number: 100,
                timestamp: 1_700_000_000,
                request_id: None,
                l1_base_fee: U256::ZERO,
            },
            l2_msg: Bytes::copy_from_slice(&[payload]),
            batch_gas_cost: None,
        },
        delayed_messages_read,
    }
}

pub(crate) fn message_with_gas_cost(
    delayed_messages_read: u64,
    payload: u8,
    cost: u64,
) -> MessageWithMetadata {
    let mut msg = message(delayed_messages_read, payload);
    msg.message.batch_gas_cost = Some(cost);
    msg
}

pub(crate) fn feed_message(sequence_number: u64, msg: MessageWithMetadata) -> BroadcastFeedMessage {
    BroadcastFeedMessage { sequence_number, message: msg }
}

pub(crate) fn init_message() -> MessageWithMetadata {
    MessageWithMetadata {
        message: L1IncomingMessage {
            header: L1IncomingMessageHeader {
                kind: l1_message_kind::INITIALIZE,
                sender: Address::ZERO,
                block_number: 0,
                timestamp: 0,
                request_id: Some(B256::ZERO),
                l1_base_fee: U256::ZERO,
            },
            l2_msg: Bytes::copy_from_slice(&[0u8; 32]),
            batch_gas_cost: None,
        },
        delayed_messages_read: 1,
    }
}

pub(crate) type TestStreamer = TransactionStreamer<MemoryMessageStore, MockBlockchain, MockEngine>;

pub(crate) struct TestSetup {
    pub(crate) streamer: Arc<TestStreamer>,
    pub(crate) chain: Arc<MockBlockchain>,
    pub(crate) engine: Arc<MockEngine>,
    pub(crate) fatal_rx: mpsc::UnboundedReceiver<StreamerError>,
}

pub(crate) fn setup() -> TestSetup {
    setup_with_engine(MockEngine::new())
}

pub(crate) fn setup_with_engine(engine: MockEngine) -> TestSetup {
    let store = Arc::new(MemoryMessageStore::new());
    let chain = Arc::new(MockBlockchain::new(0));
    let engine = Arc::new(engine);
    let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
    let streamer = TransactionStreamer::new(
        store,
        Arc::clone(&chain),
        Arc::clone(&engine),
        None,
        fatal_tx,
        StreamerConfig::default(),
    );
    TestSetup { streamer, chain, engine, fatal_rx }
}
