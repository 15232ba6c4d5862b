//! Minimal block-side vocabulary consumed by the capability traits.
//!
//! The streamer never interprets block contents; these types only carry what
//! the producer loop threads between the blockchain and the execution engine.

use alloy_primitives::{Address, Bytes, B256};

/// Header of a materialized L2 block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// State root after executing the block.
    pub state_root: B256,
    /// Block timestamp.
    pub timestamp: u64,
}

/// A materialized L2 block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Encoded transactions included in the block.
    pub transactions: Vec<Bytes>,
}

/// A log emitted during block execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    /// Address that emitted the log.
    pub address: Address,
    /// Log topics.
    pub topics: Vec<B256>,
    /// Log data.
    pub data: Bytes,
}

/// Execution receipt for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Logs emitted by the transaction.
    pub logs: Vec<LogRecord>,
}
