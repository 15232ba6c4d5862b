//! Core types shared across transaction-streamer components.
//!
//! This crate defines the message data model recorded by the streamer's
//! ordered log, the canonical byte encoding used for storage and duplicate
//! detection, and the minimal block-side vocabulary consumed by the
//! capability traits of the core crate.

mod message;
pub use message::{
    l1_message_kind, l2_payload_kind, L1IncomingMessage, L1IncomingMessageHeader,
    MessageWithMetadata,
};

mod feed;
pub use feed::BroadcastFeedMessage;

mod block;
pub use block::{Block, BlockHeader, LogRecord, Receipt};

/// Zero-based position of a message in the streamer's total order.
///
/// Index 0 is the chain-init message and can never be reorged out.
pub type MessageIndex = u64;
