//! Streamer error types.

use crate::traits::SourceError;
use streamer_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The node is too old to execute a scheduled protocol upgrade. Fatal:
    /// continuing would diverge from the canonical chain.
    #[error("node software is out of date for an activated protocol upgrade")]
    NodeOutOfDate,

    /// Block execution failed.
    #[error("block execution failed")]
    Execution(#[source] SourceError),
}

/// Errors returned by the streamer's entry points.
#[derive(Debug, Error)]
pub enum StreamerError {
    /// The sequencer path found block production not caught up with the
    /// message log. Transient: callers retry.
    #[error("block production not caught up: last block number {got} but expected {expected}")]
    RetrySequencer {
        /// Current chain head block number.
        got: u64,
        /// Block number the message count implies.
        expected: i64,
    },

    /// The feed proposed a divergence from stored history; the streamer is
    /// holding it until L1 confirms. Non-fatal and rate limited.
    #[error("reorg waiting for on-chain confirmation")]
    ReorgWaitingForConfirmation,

    /// Reorg target would drop the init message.
    #[error("cannot reorg out init message")]
    ReorgOutInitMessage,

    /// A message's delayed-read count stepped by more than one.
    #[error(
        "attempted to insert jump from {from} delayed messages read to {to} delayed messages read at message index {pos}"
    )]
    DelayedReadJump {
        /// Running delayed-read count before the message.
        from: u64,
        /// Delayed-read count carried by the message.
        to: u64,
        /// Index the message was destined for.
        pos: u64,
    },

    /// Feed batch sequence numbers were not contiguous.
    #[error("invalid sequence number {got}, expected {expected}")]
    InvalidFeedSequence {
        /// Sequence number carried by the feed message.
        got: u64,
        /// Sequence number the batch implied.
        expected: u64,
    },

    /// Delayed messages arrived at the wrong delayed-sequence position.
    #[error("attempted to insert delayed messages at incorrect position got {got} expected {expected}")]
    DelayedPosition {
        /// Position claimed by the caller.
        got: u64,
        /// Position implied by the stored log.
        expected: u64,
    },

    /// No message is stored at the requested index.
    #[error("message {index} not found")]
    MessageNotFound {
        /// The missing index.
        index: u64,
    },

    /// A stored message failed to decode.
    #[error("failed to decode stored message at index {index}")]
    CorruptMessage {
        /// Index of the corrupt row.
        index: u64,
        /// Decode failure.
        #[source]
        source: alloy_rlp::Error,
    },

    /// The blockchain has no current head header.
    #[error("current block header not found")]
    MissingCurrentHeader,

    /// A duplicate-message gas-cost upgrade was requested without a write
    /// batch to record it in.
    #[error("duplicate-message upgrade missing pointer to batch")]
    MissingBatchHandle,

    /// The sequencing hooks reported a different number of per-transaction
    /// results than transactions submitted.
    #[error("unexpected number of error results: {got} vs number of txes {expected}")]
    TxErrorCountMismatch {
        /// Number of per-transaction results.
        got: usize,
        /// Number of transactions submitted.
        expected: usize,
    },

    /// The chain refused to adopt a produced block as canonical. Fatal.
    #[error("chain rejected block as non-canonical")]
    BlockRejectedAsSide,

    /// Failure recovering chain state at the current head.
    #[error("failed to recover state")]
    StateRecovery(#[source] SourceError),

    /// The message store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The execution engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A blockchain operation failed.
    #[error("blockchain operation failed")]
    Blockchain(#[source] SourceError),

    /// The sequencer coordinator refused a message.
    #[error("sequencer coordinator rejected message")]
    Coordinator(#[source] SourceError),

    /// The broadcaster failed to relay a message.
    #[error("broadcast failed")]
    Broadcaster(#[source] SourceError),

    /// The block validator failed to follow a reorg.
    #[error("block validator reorg failed")]
    Validator(#[source] SourceError),
}

impl StreamerError {
    /// Whether this error must shut the node down.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Engine(EngineError::NodeOutOfDate) | Self::BlockRejectedAsSide)
    }

    /// Whether the caller should simply retry the sequencer path.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RetrySequencer { .. })
    }
}
