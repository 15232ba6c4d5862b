//! Capability traits the streamer consumes.
//!
//! The streamer never owns a blockchain, an execution engine, or any of its
//! optional collaborators; it drives them through the narrow seams below.
//! Implementations are expected to be thread-safe; every entry point is
//! callable from arbitrary task contexts.

use crate::error::EngineError;
use alloy_primitives::{Bytes, ChainId, B256};
use std::time::Duration;
use streamer_types::{
    Block, BlockHeader, L1IncomingMessage, L1IncomingMessageHeader, LogRecord, MessageIndex,
    MessageWithMetadata, Receipt,
};

/// A dynamic error type for collaborator failures.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves a sequencer batch number to its raw payload bytes. Bound to the
/// inbox reader by the block producer before each drain.
pub type BatchFetcher<'a> = dyn Fn(u64) -> Result<Vec<u8>, SourceError> + Send + Sync + 'a;

/// Verdict of [`Blockchain::write_block_and_set_head`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWriteStatus {
    /// The block extended the canonical chain.
    Canonical,
    /// The block was written as a side chain. The streamer treats this as
    /// fatal: its log admits exactly one canonical materialization.
    Side,
}

/// Blockchain and state storage underneath the streamer.
pub trait Blockchain: Send + Sync {
    /// Handle to mutable execution state at some root.
    type State: Send;

    /// Chain id of the L2 chain.
    fn chain_id(&self) -> ChainId;

    /// Block number the chain was initialized at. Message index 0 maps to
    /// this block.
    fn genesis_block_number(&self) -> u64;

    /// Header of the current canonical head, if the chain has one.
    fn current_header(&self) -> Option<BlockHeader>;

    /// Canonical block at `number`, if present.
    fn block_by_number(&self, number: u64) -> Option<Block>;

    /// Opens mutable state at the given state root.
    fn state_at(&self, state_root: B256) -> Result<Self::State, SourceError>;

    /// Ensures state at the given head is available, re-deriving it if the
    /// chain was shut down uncleanly.
    fn recover_state(&self, head: &BlockHeader) -> Result<(), SourceError>;

    /// Rolls the canonical head back to an existing older block.
    fn reorg_to_old_block(&self, block: &Block) -> Result<(), SourceError>;

    /// Persists a produced block, its receipts and logs, and advances the
    /// canonical head.
    #[allow(clippy::too_many_arguments)]
    fn write_block_and_set_head(
        &self,
        block: &Block,
        receipts: &[Receipt],
        logs: &[LogRecord],
        state: &mut Self::State,
        persist: bool,
        elapsed: Duration,
    ) -> Result<BlockWriteStatus, SourceError>;
}

/// A protocol upgrade scheduled in on-chain state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduledUpgrade {
    /// Protocol version the upgrade activates. 0 when nothing is scheduled.
    pub version: u64,
    /// Activation timestamp in seconds since the epoch; 0 means the upgrade
    /// takes effect in the next block.
    pub activation_timestamp: u64,
}

/// Per-transaction sequencing callbacks and results.
///
/// Filled by [`ExecutionEngine::produce_block_advanced`]: after a successful
/// call, `tx_errors` holds one entry per submitted transaction.
#[derive(Debug, Default)]
pub struct SequencingHooks {
    /// Outcome of each submitted transaction, in submission order.
    pub tx_errors: Vec<Result<(), SourceError>>,
}

/// The execution engine that materializes messages into blocks.
pub trait ExecutionEngine: Send + Sync {
    /// Handle to mutable execution state; shared with the blockchain.
    type State: Send;

    /// Executes one message on top of `parent`, producing the next block and
    /// its receipts. `batch_fetcher` resolves sequencer batch references
    /// found inside the message.
    fn produce_block(
        &self,
        message: &L1IncomingMessage,
        delayed_messages_read: u64,
        parent: &BlockHeader,
        state: &mut Self::State,
        batch_fetcher: &BatchFetcher<'_>,
    ) -> Result<(Block, Vec<Receipt>), EngineError>;

    /// Sequencer-path block production from raw transactions. Reports
    /// per-transaction outcomes through `hooks` in addition to the produced
    /// block.
    fn produce_block_advanced(
        &self,
        header: &L1IncomingMessageHeader,
        txs: &[Bytes],
        delayed_messages_read: u64,
        parent: &BlockHeader,
        state: &mut Self::State,
        hooks: &mut SequencingHooks,
    ) -> Result<(Block, Vec<Receipt>), EngineError>;

    /// Reads the scheduled protocol upgrade from on-chain state.
    fn scheduled_upgrade(&self, state: &Self::State) -> Result<ScheduledUpgrade, EngineError>;

    /// Highest protocol version this binary supports.
    ///
    /// Implementations report the dev-test parameter set's initial protocol
    /// version here, matching long-standing node behavior. Arguably the
    /// running node's own maximum is what was intended.
    fn max_supported_version(&self) -> u64;
}

/// Reader of sequencer batches already posted to L1.
pub trait InboxReader: Send + Sync {
    /// Fetches the raw bytes of sequencer batch `batch_num`.
    fn sequencer_message_bytes(&self, batch_num: u64) -> Result<Vec<u8>, SourceError>;
}

/// Coordinator gating locally sequenced messages across redundant sequencers.
pub trait SequencerCoordinator: Send + Sync {
    /// Claims the right to sequence `message` at `pos`. An error aborts the
    /// sequencer path before anything is written.
    fn sequencing_message(
        &self,
        pos: MessageIndex,
        message: &MessageWithMetadata,
    ) -> Result<(), SourceError>;
}

/// Outbound feed relay for locally sequenced messages.
pub trait Broadcaster: Send + Sync {
    /// Relays one sequenced message at `pos` to feed subscribers.
    fn broadcast_single(
        &self,
        message: &MessageWithMetadata,
        pos: MessageIndex,
    ) -> Result<(), SourceError>;
}

/// Block validator kept in sync with the streamer's log.
pub trait BlockValidator: Send + Sync {
    /// Drops all validator state above the given block before the streamer
    /// truncates its log.
    fn reorg_to_block(&self, block_number: u64, block_hash: B256) -> Result<(), SourceError>;

    /// Notifies the validator of a newly materialized block.
    fn new_block(&self, block: &Block, parent: &BlockHeader, message: &MessageWithMetadata);
}
