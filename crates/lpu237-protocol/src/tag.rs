//! Keyboard-emulation tags (prefix/postfix/remove strings).
//!
//! Wire layout: one length byte (number of key pairs) followed by
//! `(modifier, keycode)` pairs, zero padded to the tag's fixed size. A
//! modifier of [`KeyPair::ASCII_MODIFIER`] means the keycode is a literal
//! ASCII code rather than a HID usage.

use crate::error::{ProtocolError, ProtocolResult};
use crate::memory::{REMOVE_TAG_SIZE, TAG_SIZE};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// 15-byte prefix/postfix tag.
    Normal,
    /// 41-byte iButton remove tag.
    IButtonRemove,
}

impl TagKind {
    /// Fixed encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Normal => usize::from(TAG_SIZE),
            Self::IButtonRemove => usize::from(REMOVE_TAG_SIZE),
        }
    }

    pub fn max_pairs(self) -> usize {
        (self.size() - 1) / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPair {
    pub modifier: u8,
    pub key: u8,
}

impl KeyPair {
    pub const ASCII_MODIFIER: u8 = 0xFF;

    pub const fn new(modifier: u8, key: u8) -> Self {
        Self { modifier, key }
    }

    pub const fn ascii(code: u8) -> Self {
        Self::new(Self::ASCII_MODIFIER, code)
    }

    /// The literal character, if this pair carries one.
    pub fn as_ascii(&self) -> Option<char> {
        (self.modifier == Self::ASCII_MODIFIER && self.key.is_ascii()).then_some(char::from(self.key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    kind: TagKind,
    keys: Vec<KeyPair>,
}

impl Tag {
    pub fn empty(kind: TagKind) -> Self {
        Self {
            kind,
            keys: Vec::new(),
        }
    }

    pub fn new(kind: TagKind, keys: Vec<KeyPair>) -> ProtocolResult<Self> {
        if keys.len() > kind.max_pairs() {
            return Err(ProtocolError::InvalidTag(format!(
                "{} key pairs exceed the {} pair limit",
                keys.len(),
                kind.max_pairs()
            )));
        }
        Ok(Self { kind, keys })
    }

    /// Builds a tag that types `text` literally.
    pub fn from_ascii(kind: TagKind, text: &str) -> ProtocolResult<Self> {
        if !text.is_ascii() {
            return Err(ProtocolError::InvalidTag(format!(
                "non-ASCII text {text:?}"
            )));
        }
        Self::new(kind, text.bytes().map(KeyPair::ascii).collect())
    }

    /// Decodes a length-prefixed tag. Input may be shorter than the fixed size
    /// but never longer, and must hold every pair the length byte declares.
    pub fn from_bytes(kind: TagKind, bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() > kind.size() {
            return Err(ProtocolError::InvalidTag(format!(
                "{} bytes exceed the {} byte tag size",
                bytes.len(),
                kind.size()
            )));
        }
        let Some((&count, body)) = bytes.split_first() else {
            return Ok(Self::empty(kind));
        };
        let count = usize::from(count);
        if count > kind.max_pairs() {
            return Err(ProtocolError::InvalidTag(format!(
                "length byte {count} exceeds the {} pair limit",
                kind.max_pairs()
            )));
        }
        let Some(data) = body.get(..count * 2) else {
            return Err(ProtocolError::InvalidTag(format!(
                "length byte {count} but only {} data bytes",
                body.len()
            )));
        };
        let keys = data
            .chunks_exact(2)
            .filter_map(|pair| match pair {
                [modifier, key] => Some(KeyPair::new(*modifier, *key)),
                _ => None,
            })
            .collect();
        Ok(Self { kind, keys })
    }

    pub fn from_hex(kind: TagKind, text: &str) -> ProtocolResult<Self> {
        Self::from_bytes(kind, &hex::decode(text)?)
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn keys(&self) -> &[KeyPair] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Fixed-size wire image; an empty tag is all zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.kind.size()];
        let mut slots = out.iter_mut();
        if let Some(length) = slots.next() {
            *length = u8::try_from(self.keys.len()).unwrap_or(0);
        }
        for pair in &self.keys {
            if let Some(slot) = slots.next() {
                *slot = pair.modifier;
            }
            if let Some(slot) = slots.next() {
                *slot = pair.key;
            }
        }
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pair in &self.keys {
            match pair.as_ascii() {
                Some(c) => write!(f, "{c}")?,
                None => write!(f, "[{:02x}:{:02x}]", pair.modifier, pair.key)?,
            }
        }
        Ok(())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
