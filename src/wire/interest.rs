// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use bytes::BytesMut;

use crate::{
    error::WireError,
    wire::{name::Name, selectors::Selectors, tlv::Element, varnumber, wire_types},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub name: Name,
    pub selectors: Selectors,
    pub must_be_fresh: bool,
    pub nonce: u32,
    pub lifetime: Duration,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            selectors: Selectors::default(),
            must_be_fresh: false,
            nonce: rand::random(),
            lifetime: Duration::from_millis(4000),
        }
    }

    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        self.name.encode().encode(&mut buf);
        if self.selectors != Selectors::default() {
            self.selectors.encode().encode(&mut buf);
        }
        let mut nonce_bytes = BytesMut::new();
        nonce_bytes.extend_from_slice(&self.nonce.to_be_bytes());
        Element::new(wire_types::NONCE, nonce_bytes.freeze()).encode(&mut buf);
        Element::nonneg(wire_types::INTEREST_LIFETIME, self.lifetime.as_millis() as u64)
            .encode(&mut buf);
        if self.must_be_fresh {
            Element::empty(wire_types::MUST_BE_FRESH).encode(&mut buf);
        }
        Element::new(wire_types::INTEREST, buf.freeze())
    }

    pub fn decode(el: &Element) -> Result<Interest, WireError> {
        if el.typ != wire_types::INTEREST {
            return Err(WireError::UnexpectedType {
                expected: wire_types::INTEREST,
                found: el.typ,
            });
        }
        let children = el.children()?;
        let name_el = children
            .iter()
            .find(|c| c.typ == wire_types::NAME)
            .ok_or(WireError::MissingField("Name"))?;
        let name = Name::decode(name_el)?;

        let selectors = children
            .iter()
            .find(|c| c.typ == wire_types::SELECTORS)
            .map(Selectors::decode)
            .transpose()?
            .unwrap_or_default();

        let nonce = children
            .iter()
            .find(|c| c.typ == wire_types::NONCE)
            .map(|c| {
                let arr: [u8; 4] = c
                    .value
                    .as_ref()
                    .try_into()
                    .map_err(|_| WireError::ComponentOverrun)?;
                Ok::<u32, WireError>(u32::from_be_bytes(arr))
            })
            .transpose()?
            .unwrap_or(0);

        let lifetime = children
            .iter()
            .find(|c| c.typ == wire_types::INTEREST_LIFETIME)
            .map(|c| varnumber::decode_nonneg(&c.value))
            .transpose()?
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(4000));

        let must_be_fresh = children
            .iter()
            .any(|c| c.typ == wire_types::MUST_BE_FRESH);

        Ok(Interest { name, selectors, must_be_fresh, nonce, lifetime })
    }
}
