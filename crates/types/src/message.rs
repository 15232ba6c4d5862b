//! The message data model recorded by the streamer.
//!
//! Messages are persisted under a canonical RLP encoding: two semantically
//! equal messages always produce identical bytes, which is what duplicate
//! detection byte-compares against the store.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{
    length_of_length, Decodable, Encodable, Header, RlpDecodable, RlpEncodable, EMPTY_STRING_CODE,
};

/// Kinds of L1 inbox messages understood by the streamer.
pub mod l1_message_kind {
    /// The chain-init message. Always at index 0, never reorged out.
    pub const INITIALIZE: u8 = 11;
    /// A batch of L2 transactions sequenced off-chain.
    pub const L2_MESSAGE: u8 = 3;
    /// Placeholder for a message dropped by the inbox.
    pub const INVALID: u8 = 0xFF;
}

/// Kinds of payload segments inside an [`l1_message_kind::L2_MESSAGE`] body.
pub mod l2_payload_kind {
    /// A single signed transaction.
    pub const SIGNED_TX: u8 = 4;
    /// A batch of length-prefixed segments.
    pub const BATCH: u8 = 3;
}

/// Header of an L1 inbox message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct L1IncomingMessageHeader {
    /// Message kind, one of [`l1_message_kind`].
    pub kind: u8,
    /// L1 address that posted the message.
    pub sender: Address,
    /// L1 block number the message was posted in.
    pub block_number: u64,
    /// L1 timestamp of that block.
    pub timestamp: u64,
    /// L1 request id, when the message originated from an L1 request.
    pub request_id: Option<B256>,
    /// L1 base fee observed when the message was posted.
    pub l1_base_fee: U256,
}

impl L1IncomingMessageHeader {
    fn rlp_payload_length(&self) -> usize {
        self.kind.length()
            + self.sender.length()
            + self.block_number.length()
            + self.timestamp.length()
            + self.request_id.as_ref().map_or(1, Encodable::length)
            + self.l1_base_fee.length()
    }
}

impl Encodable for L1IncomingMessageHeader {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let payload_length = self.rlp_payload_length();
        Header { list: true, payload_length }.encode(out);
        self.kind.encode(out);
        self.sender.encode(out);
        self.block_number.encode(out);
        self.timestamp.encode(out);
        match &self.request_id {
            Some(id) => id.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.l1_base_fee.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for L1IncomingMessageHeader {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let kind = u8::decode(&mut payload)?;
        let sender = Address::decode(&mut payload)?;
        let block_number = u64::decode(&mut payload)?;
        let timestamp = u64::decode(&mut payload)?;
        let request_id = {
            let raw = Bytes::decode(&mut payload)?;
            match raw.len() {
                0 => None,
                32 => Some(B256::from_slice(&raw)),
                _ => return Err(alloy_rlp::Error::UnexpectedLength),
            }
        };
        let l1_base_fee = U256::decode(&mut payload)?;
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }

        Ok(Self { kind, sender, block_number, timestamp, request_id, l1_base_fee })
    }
}

/// An L1 inbox message: header plus opaque L2 payload bytes.
///
/// `batch_gas_cost` is a cached execution-cost estimate populated lazily by
/// batch posters. It is semantically redundant: two messages equal in every
/// other field are the same message. Equality modulo this field is exposed
/// through [`MessageWithMetadata::eq_ignoring_batch_gas_cost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct L1IncomingMessage {
    /// The message header.
    pub header: L1IncomingMessageHeader,
    /// Opaque L2 payload bytes.
    pub l2_msg: Bytes,
    /// Optional cached batch gas cost. Encoded as a trailing list element
    /// only when present.
    pub batch_gas_cost: Option<u64>,
}

impl L1IncomingMessage {
    fn rlp_payload_length(&self) -> usize {
        self.header.length()
            + self.l2_msg.length()
            + self.batch_gas_cost.map_or(0, |cost| cost.length())
    }
}

impl Encodable for L1IncomingMessage {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let payload_length = self.rlp_payload_length();
        Header { list: true, payload_length }.encode(out);
        self.header.encode(out);
        self.l2_msg.encode(out);
        if let Some(cost) = self.batch_gas_cost {
            cost.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for L1IncomingMessage {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let msg_header = L1IncomingMessageHeader::decode(&mut payload)?;
        let l2_msg = Bytes::decode(&mut payload)?;
        let batch_gas_cost =
            if payload.is_empty() { None } else { Some(u64::decode(&mut payload)?) };
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }

        Ok(Self { header: msg_header, l2_msg, batch_gas_cost })
    }
}

/// A message paired with its delayed-message accounting.
///
/// `delayed_messages_read` is the cumulative count of delayed L1 messages
/// consumed up to and including this message. Along the stored sequence it is
/// non-decreasing and each step increments by 0 or 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct MessageWithMetadata {
    /// The inbox message.
    pub message: L1IncomingMessage,
    /// Cumulative delayed messages consumed through this message.
    pub delayed_messages_read: u64,
}

impl MessageWithMetadata {
    /// Canonical encoding of this message, as stored and byte-compared by the
    /// streamer.
    pub fn encoded(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Structural equality with `batch_gas_cost` masked on both sides.
    ///
    /// Callers decide when the mask applies; this helper never consults the
    /// field itself.
    pub fn eq_ignoring_batch_gas_cost(&self, other: &Self) -> bool {
        self.delayed_messages_read == other.delayed_messages_read
            && self.message.header == other.message.header
            && self.message.l2_msg == other.message.l2_msg
    }
}
