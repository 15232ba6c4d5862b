//! Database table schemas used by the transaction streamer.
//!
//! Message rows are keyed by index; reth encodes `u64` keys as 8-byte
//! big-endian, so cursor iteration order equals numerical order. Values are
//! the opaque canonical encoding produced by the types crate. The store never
//! interprets them, which is what lets duplicate detection byte-compare
//! stored rows against candidate encodings.

use reth_db::table::Table;
use reth_db_api::{
    table::{Compress, Decompress, TableInfo},
    TableSet,
};
use serde::{Deserialize, Serialize};

/// Reserved [`StreamerMeta`] row holding the total message count.
pub const MESSAGE_COUNT_KEY: u64 = 0;

/// Raw value bytes stored without interpretation.
///
/// The canonical message encoding is produced (and compared) above the
/// storage layer; compression is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBytes(pub Vec<u8>);

impl Compress for MessageBytes {
    type Compressed = Vec<u8>;

    fn compress_to_buf<B: bytes::BufMut + AsMut<[u8]>>(&self, buf: &mut B) {
        buf.put_slice(&self.0);
    }
}

impl Decompress for MessageBytes {
    fn decompress(value: &[u8]) -> Result<Self, reth_db_api::DatabaseError> {
        Ok(Self(value.to_vec()))
    }
}

/// A table for the ordered message log.
///
/// - **Key**: `u64` — message index (big-endian on disk).
/// - **Value**: [`MessageBytes`] — canonical encoding of the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Messages;

impl Table for Messages {
    const NAME: &'static str = "messages";
    const DUPSORT: bool = false;

    type Key = u64;
    type Value = MessageBytes;
}

/// A table for streamer bookkeeping cells.
///
/// Holds a single row today: [`MESSAGE_COUNT_KEY`] mapping to the RLP-encoded
/// total message count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct StreamerMeta;

impl Table for StreamerMeta {
    const NAME: &'static str = "streamer_meta";
    const DUPSORT: bool = false;

    type Key = u64;
    type Value = MessageBytes;
}

impl TableInfo for Messages {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_dupsort(&self) -> bool {
        Self::DUPSORT
    }
}

impl TableInfo for StreamerMeta {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_dupsort(&self) -> bool {
        Self::DUPSORT
    }
}

/// The set of tables initialized for a streamer database.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamerTables;

impl TableSet for StreamerTables {
    fn tables() -> Box<dyn Iterator<Item = Box<dyn TableInfo>>> {
        Box::new(
            vec![
                Box::new(Messages) as Box<dyn TableInfo>,
                Box::new(StreamerMeta) as Box<dyn TableInfo>,
            ]
            .into_iter(),
        )
    }
}
