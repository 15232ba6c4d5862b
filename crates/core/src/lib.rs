//! The transaction streamer: the authoritative ordered log of L2 messages.
//!
//! Messages arrive from three asynchronous sources: an unauthenticated gossip
//! feed, reconstruction of confirmed L1 batches, and a local sequencer. They
//! are merged into one totally ordered sequence, and a background producer
//! loop materializes each message into an L2 block through an injected
//! execution engine.

mod config;
pub use config::StreamerConfig;

mod error;
pub use error::{EngineError, StreamerError};

mod traits;
pub use traits::{
    BatchFetcher, BlockValidator, BlockWriteStatus, Blockchain, Broadcaster, ExecutionEngine,
    InboxReader, ScheduledUpgrade, SequencerCoordinator, SequencingHooks, SourceError,
};

mod metrics;

mod queue;

mod reconcile;

mod streamer;
pub use streamer::TransactionStreamer;

mod producer;

#[cfg(test)]
pub(crate) mod test_utils;
