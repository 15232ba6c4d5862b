//! Feed-side input shape.

use crate::{MessageIndex, MessageWithMetadata};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// A single message received from the sequencer feed, tagged with the
/// position the feed claims for it.
///
/// Feed messages are unauthenticated and speculative: the streamer buffers
/// them until L1 either confirms or overrides them.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BroadcastFeedMessage {
    /// Position claimed by the feed for this message.
    pub sequence_number: MessageIndex,
    /// The message payload.
    pub message: MessageWithMetadata,
}
