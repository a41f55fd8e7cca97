// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Generic TLV element: a type number, a length, and either a byte string or
//! nested elements. Higher layers (Name, Interest, Data, the command
//! records) are built on top of [`Element`] rather than hand-rolling their
//! own framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{error::WireError, wire::varnumber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub typ: u64,
    pub value: Bytes,
}

impl Element {
    pub fn new(typ: u64, value: impl Into<Bytes>) -> Self {
        Self { typ, value: value.into() }
    }

    pub fn nonneg(typ: u64, value: u64) -> Self {
        let mut buf = BytesMut::with_capacity(8);
        varnumber::encode_nonneg(value, &mut buf);
        Self::new(typ, buf.freeze())
    }

    pub fn empty(typ: u64) -> Self {
        Self { typ, value: Bytes::new() }
    }

    pub fn as_nonneg(&self) -> Result<u64, WireError> {
        varnumber::decode_nonneg(&self.value)
    }

    pub fn encoded_len(&self) -> usize {
        varnumber::encoded_len(self.typ) + varnumber::encoded_len(self.value.len() as u64) + self.value.len()
    }

    pub fn encode(&self, out: &mut impl BufMut) {
        varnumber::encode(self.typ, out);
        varnumber::encode(self.value.len() as u64, out);
        out.put_slice(&self.value);
    }

    /// Decodes a single element, consuming exactly its bytes from `buf`.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        let typ = varnumber::decode(buf)?;
        let len = varnumber::decode(buf)? as usize;
        if buf.remaining() < len {
            return Err(WireError::Truncated);
        }
        let value = buf.copy_to_bytes(len);
        Ok(Self { typ, value })
    }

    /// Decodes every element nested in this element's value, in order.
    pub fn children(&self) -> Result<Vec<Element>, WireError> {
        let mut cursor = self.value.clone();
        let mut out = Vec::new();
        while cursor.has_remaining() {
            out.push(Element::decode(&mut cursor)?);
        }
        Ok(out)
    }

    pub fn child(&self, typ: u64) -> Option<Element> {
        self.children().ok()?.into_iter().find(|e| e.typ == typ)
    }
}

/// Attempts to decode every element from a buffer and returns how many
/// trailing bytes were not part of a complete element (0 means the buffer
/// held exactly N whole elements).
pub fn decode_stream(buf: &[u8]) -> (Vec<Element>, usize) {
    let mut elements = Vec::new();
    let mut offset = 0usize;
    loop {
        let mut cursor = &buf[offset..];
        let before = cursor.remaining();
        match Element::decode(&mut cursor) {
            Ok(el) => {
                let consumed = before - cursor.remaining();
                elements.push(el);
                offset += consumed;
            },
            Err(_) => break,
        }
    }
    (elements, buf.len() - offset)
}
