//! Persistent message store backing the transaction streamer.
//!
//! The store is an ordered map from message index to the canonical encoding
//! of the message at that index, plus a total-count cell written atomically
//! with every batch. Reads are non-blocking; all writes flow through
//! [`Batch`]es committed in a single database transaction.

mod error;
pub use error::{SourceError, StorageError};

mod tables;
pub use tables::{MessageBytes, Messages, StreamerMeta, MESSAGE_COUNT_KEY};

mod store;
pub use store::{Batch, BatchOp, MessageStore};

mod mdbx;
pub use mdbx::MdbxMessageStore;
