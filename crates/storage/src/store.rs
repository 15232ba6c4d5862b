//! The message-store seam and its buffered write batch.

use crate::StorageError;

/// A single buffered operation inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Store the canonical encoding of the message at `index`.
    PutMessage {
        /// Message index to write.
        index: u64,
        /// Canonical message bytes.
        encoded: Vec<u8>,
    },
    /// Delete every stored message with index `>= index`.
    DeleteMessagesFrom {
        /// First index to delete.
        index: u64,
    },
    /// Update the total-count cell.
    SetMessageCount {
        /// New total message count.
        count: u64,
    },
}

/// A buffered set of writes committed atomically by
/// [`MessageStore::write_batch`].
///
/// Buffered operations are invisible to reads until committed; composing a
/// truncation and the matching count update in one batch is what makes a
/// reorg atomic for concurrent readers.
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a message write at `index`.
    pub fn put_message(&mut self, index: u64, encoded: Vec<u8>) {
        self.ops.push(BatchOp::PutMessage { index, encoded });
    }

    /// Buffers a range delete of all messages with index `>= index`.
    pub fn delete_messages_from(&mut self, index: u64) {
        self.ops.push(BatchOp::DeleteMessagesFrom { index });
    }

    /// Buffers an update of the total-count cell.
    pub fn set_message_count(&mut self, count: u64) {
        self.ops.push(BatchOp::SetMessageCount { count });
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the batch, yielding its operations in insertion order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Persistent ordered map from message index to canonical message bytes.
///
/// Reads never block on writers. All mutation goes through [`write_batch`],
/// which commits in a single database transaction; the store never silently
/// drops a write.
///
/// [`write_batch`]: MessageStore::write_batch
pub trait MessageStore: Send + Sync {
    /// Returns the canonical bytes of the message at `index`, or `None` if no
    /// such row exists.
    fn message(&self, index: u64) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns the total number of messages stored.
    fn message_count(&self) -> Result<u64, StorageError>;

    /// Atomically applies all buffered operations of `batch`.
    fn write_batch(&self, batch: Batch) -> Result<(), StorageError>;
}
