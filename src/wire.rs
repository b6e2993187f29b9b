//! Wire format primitives shared by every encodable entity.
//!
//! All integers travel as little-endian `u32`. Keys and signatures travel
//! in fixed [`KEY_FIELD`]-byte slots: content is written left-aligned and
//! zero-padded, and recovered on decode by slicing the capability's fixed
//! content width. Hashes are raw 32-byte fields. Peer messages are a single
//! tag byte followed by an opaque payload.

use crate::crypto::Hash;
use crate::error::{ChainError, Result};

/// Width of every key and signature slot on the wire.
pub const KEY_FIELD: usize = 80;

/// Width of a SHA-256 digest field.
pub const HASH_SIZE: usize = 32;

/// Encoded transaction header: from + to + timestamp + payload hash +
/// payload length + nonce.
pub const TRANSACTION_HEADER_SIZE: usize = 2 * KEY_FIELD + 4 + HASH_SIZE + 4 + 4;

/// Encoded block header: origin + timestamp + previous hash + merkle root +
/// nonce.
pub const BLOCK_HEADER_SIZE: usize = KEY_FIELD + 4 + 2 * HASH_SIZE + 4;

/// Smallest decodable transaction frame: header plus signature slot.
pub const TRANSACTION_MIN_SIZE: usize = TRANSACTION_HEADER_SIZE + KEY_FIELD;

/// Smallest decodable block frame: header plus signature slot.
pub const BLOCK_MIN_SIZE: usize = BLOCK_HEADER_SIZE + KEY_FIELD;

/// Append `bytes` as a fixed-width slot, left-aligned and zero-padded.
/// Content wider than the slot is truncated to fit.
pub fn put_field(out: &mut Vec<u8>, bytes: &[u8]) {
    let content = bytes.len().min(KEY_FIELD);
    out.extend_from_slice(&bytes[..content]);
    out.resize(out.len() + (KEY_FIELD - content), 0);
}

/// Append a little-endian u32.
pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Split `count` bytes off the front of the cursor.
pub fn take<'a>(input: &mut &'a [u8], count: usize) -> Result<&'a [u8]> {
    if input.len() < count {
        return Err(ChainError::ShortFrame {
            expected: count,
            actual: input.len(),
        });
    }
    let (head, rest) = input.split_at(count);
    *input = rest;
    Ok(head)
}

/// Consume a little-endian u32.
pub fn take_u32(input: &mut &[u8]) -> Result<u32> {
    let bytes = take(input, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Consume a raw 32-byte hash field.
pub fn take_hash(input: &mut &[u8]) -> Result<Hash> {
    let bytes = take(input, HASH_SIZE)?;
    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

/// Consume a [`KEY_FIELD`] slot and recover its content: the first `width`
/// bytes, or empty when the whole slot is zero (unsigned entity, genesis
/// origin).
pub fn take_field(input: &mut &[u8], width: usize) -> Result<Vec<u8>> {
    let slot = take(input, KEY_FIELD)?;
    if slot.iter().all(|b| *b == 0) {
        return Ok(Vec::new());
    }
    Ok(slot[..width.min(KEY_FIELD)].to_vec())
}

/// Peer message taxonomy. The tag values are part of the wire contract and
/// must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    GetNodes = 20,
    SendNodes = 21,
    GetTransaction = 22,
    SendTransaction = 23,
    GetBlock = 24,
    SendBlock = 25,
}

impl MessageKind {
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            20 => Ok(MessageKind::GetNodes),
            21 => Ok(MessageKind::SendNodes),
            22 => Ok(MessageKind::GetTransaction),
            23 => Ok(MessageKind::SendTransaction),
            24 => Ok(MessageKind::GetBlock),
            25 => Ok(MessageKind::SendBlock),
            other => Err(ChainError::UnknownMessage(other)),
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A routed peer message: one tag byte, then an opaque payload whose shape
/// the tag implies (an encoded transaction, an encoded block, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.data.len());
        out.push(self.kind.tag());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let tag = take(&mut cursor, 1)?[0];
        Ok(Self {
            kind: MessageKind::from_tag(tag)?,
            data: cursor.to_vec(),
        })
    }
}
