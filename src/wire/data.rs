// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use sha2::{Digest as _, Sha256};

use crate::{
    error::WireError,
    wire::{
        name::{Component, Name},
        tlv::Element,
        varnumber, wire_types,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    pub freshness: Option<Duration>,
    pub final_block_id: Option<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub key_locator_hash: Option<[u8; 32]>,
    pub bits: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    pub meta: MetaInfo,
    pub signature: Signature,
}

impl Data {
    /// Encodes the full packet without the trailing implicit digest — this
    /// is what the repository hashes to derive the full name.
    pub fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        self.name.encode().encode(&mut buf);

        let mut meta_buf = BytesMut::new();
        if let Some(fresh) = self.meta.freshness {
            Element::nonneg(wire_types::FRESHNESS_PERIOD, fresh.as_millis() as u64)
                .encode(&mut meta_buf);
        }
        if let Some(fbi) = &self.meta.final_block_id {
            let mut inner = BytesMut::new();
            fbi.encode().encode(&mut inner);
            Element::new(wire_types::FINAL_BLOCK_ID, inner.freeze()).encode(&mut meta_buf);
        }
        Element::new(wire_types::META_INFO, meta_buf.freeze()).encode(&mut buf);

        Element::new(wire_types::CONTENT, self.content.clone()).encode(&mut buf);

        let mut sig_info = BytesMut::new();
        if let Some(hash) = &self.signature.key_locator_hash {
            let mut kl = BytesMut::new();
            Element::new(wire_types::KEY_DIGEST, hash.to_vec()).encode(&mut kl);
            Element::new(wire_types::KEY_LOCATOR, kl.freeze()).encode(&mut sig_info);
        }
        Element::new(wire_types::SIGNATURE_INFO, sig_info.freeze()).encode(&mut buf);
        Element::new(wire_types::SIGNATURE_VALUE, self.signature.bits.clone())
            .encode(&mut buf);

        Element::new(wire_types::DATA, buf.freeze())
    }

    pub fn decode(el: &Element) -> Result<Data, WireError> {
        if el.typ != wire_types::DATA {
            return Err(WireError::UnexpectedType {
                expected: wire_types::DATA,
                found: el.typ,
            });
        }
        let children = el.children()?;
        let name = Name::decode(
            children
                .iter()
                .find(|c| c.typ == wire_types::NAME)
                .ok_or(WireError::MissingField("Name"))?,
        )?;
        let content = children
            .iter()
            .find(|c| c.typ == wire_types::CONTENT)
            .map(|c| c.value.clone())
            .unwrap_or_default();

        let mut meta = MetaInfo::default();
        if let Some(meta_el) = children.iter().find(|c| c.typ == wire_types::META_INFO) {
            for child in meta_el.children()? {
                match child.typ {
                    wire_types::FRESHNESS_PERIOD => {
                        meta.freshness =
                            Some(Duration::from_millis(varnumber::decode_nonneg(&child.value)?));
                    },
                    wire_types::FINAL_BLOCK_ID => {
                        let inner = child.children()?;
                        if let Some(comp) = inner.first() {
                            meta.final_block_id = Some(Component(comp.value.clone()));
                        }
                    },
                    _ => {},
                }
            }
        }

        let mut key_locator_hash = None;
        if let Some(sig_info) = children
            .iter()
            .find(|c| c.typ == wire_types::SIGNATURE_INFO)
        {
            for child in sig_info.children()? {
                if child.typ == wire_types::KEY_LOCATOR {
                    for kl_child in child.children()? {
                        if kl_child.typ == wire_types::KEY_DIGEST {
                            let arr: [u8; 32] = kl_child
                                .value
                                .as_ref()
                                .try_into()
                                .map_err(|_| WireError::ComponentOverrun)?;
                            key_locator_hash = Some(arr);
                        }
                    }
                }
            }
        }
        let bits = children
            .iter()
            .find(|c| c.typ == wire_types::SIGNATURE_VALUE)
            .map(|c| c.value.clone())
            .unwrap_or_default();

        Ok(Data { name, content, meta, signature: Signature { key_locator_hash, bits } })
    }

    /// The full name: `self.name` extended by the SHA-256 digest of this
    /// packet's complete wire encoding.
    pub fn full_name(&self) -> Name {
        let el = self.encode();
        let mut wire = BytesMut::new();
        el.encode(&mut wire);
        let digest = Sha256::digest(&wire);
        self.name.append(Component::from_bytes(digest.to_vec()))
    }

    pub fn key_locator_hash(&self) -> Option<[u8; 32]> {
        self.signature.key_locator_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Data {
        Data {
            name: Name::from_uri("/a/b/c"),
            content: Bytes::from_static(&[3, 1, 4, 1, 5, 9, 2, 6]),
            meta: MetaInfo::default(),
            signature: Signature { key_locator_hash: None, bits: Bytes::from_static(b"sig") },
        }
    }

    #[test]
    fn round_trips() {
        let d = sample();
        let el = d.encode();
        let decoded = Data::decode(&el).expect("decode");
        assert_eq!(decoded, d);
    }

    #[test]
    fn full_name_extends_with_32_byte_digest() {
        let d = sample();
        let full = d.full_name();
        assert_eq!(full.len(), d.name.len() + 1);
        assert_eq!(full.0.last().expect("component").0.len(), 32);
    }

    #[test]
    fn two_encodings_of_same_logical_name_get_distinct_full_names() {
        let mut d1 = sample();
        let mut d2 = sample();
        d1.content = Bytes::from_static(b"one");
        d2.content = Bytes::from_static(b"two");
        assert_ne!(d1.full_name(), d2.full_name());
    }
}
