// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Hierarchical names: ordered sequences of opaque components, compared
//! component-wise (shorter-then-lexicographically-smaller wins a tie, per
//! NDN canonical order).

use std::{cmp::Ordering, fmt};

use bytes::{Bytes, BytesMut};

use crate::{
    error::WireError,
    wire::{tlv::Element, wire_types},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Component(pub Bytes);

impl Component {
    pub fn from_bytes(b: impl Into<Bytes>) -> Self {
        Self(b.into())
    }

    pub fn from_str(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// The smallest component strictly greater than `self` under
    /// lexicographic-with-length-tiebreak order: under that order `self` is
    /// always a strict prefix of, and therefore less than, `self` with any
    /// byte appended — so the minimal successor is always `self ++ [0x00]`.
    pub fn successor(&self) -> Component {
        let mut bytes = self.0.to_vec();
        bytes.push(0);
        Component(Bytes::from(bytes))
    }

    pub fn encode(&self) -> Element {
        Element::new(wire_types::GENERIC_NAME_COMPONENT, self.0.clone())
    }
}

/// Canonical component order: shorter+lexicographically-smaller prefix wins;
/// when one is a prefix of the other, the shorter one sorts first.
fn compare_components(a: &[u8], b: &[u8]) -> Ordering {
    let min_len = a.len().min(b.len());
    match a[..min_len].cmp(&b[..min_len]) {
        Ordering::Equal => a.len().cmp(&b.len()),
        other => other,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name(pub Vec<Component>);

impl Name {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_components(components: Vec<Component>) -> Self {
        Self(components)
    }

    /// Parses a slash-separated URI such as `/a/b/c` into a [`Name`]. Empty
    /// segments (leading/trailing/duplicate slashes) are dropped.
    pub fn from_uri(uri: &str) -> Self {
        let comps = uri
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Component::from_str)
            .collect();
        Self(comps)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn append(&self, component: Component) -> Name {
        let mut v = self.0.clone();
        v.push(component);
        Name(v)
    }

    pub fn get_prefix(&self, k: usize) -> Name {
        Name(self.0[..k.min(self.0.len())].to_vec())
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Smallest name strictly greater than `self` under canonical order:
    /// the successor of the last component, or a single zero component when
    /// `self` is empty.
    pub fn successor(&self) -> Name {
        if self.0.is_empty() {
            return Name(vec![Component::from_bytes(vec![0u8])]);
        }
        let mut v = self.0.clone();
        let last = v.pop().expect("non-empty checked above");
        v.push(last.successor());
        Name(v)
    }

    pub fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        for c in &self.0 {
            c.encode().encode(&mut buf);
        }
        Element::new(wire_types::NAME, buf.freeze())
    }

    pub fn decode(el: &Element) -> Result<Name, WireError> {
        if el.typ != wire_types::NAME {
            return Err(WireError::UnexpectedType {
                expected: wire_types::NAME,
                found: el.typ,
            });
        }
        let mut comps = Vec::new();
        for child in el.children()? {
            comps.push(Component(child.value));
        }
        Ok(Name(comps))
    }

    pub fn to_uri(&self) -> String {
        let mut s = String::new();
        for c in &self.0 {
            s.push('/');
            for &b in &c.0 {
                if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                    s.push(b as char);
                } else {
                    s.push_str(&format!("%{b:02X}"));
                }
            }
        }
        s
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match compare_components(&a.0, &b.0) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_prefers_shorter_prefix() {
        let a = Name::from_uri("/a");
        let b = Name::from_uri("/aa");
        assert_eq!(a.cmp(&b), Ordering::Less);
    }

    #[test]
    fn successor_appends_a_zero_byte() {
        let n = Name::from_components(vec![Component::from_bytes(vec![1, 2, 3])]);
        let s = n.successor();
        assert_eq!(s.0[0].0.as_ref(), &[1, 2, 3, 0x00]);
    }

    #[test]
    fn successor_appends_a_zero_byte_even_when_last_byte_is_0xff() {
        let n = Name::from_components(vec![Component::from_bytes(vec![0xFF])]);
        let s = n.successor();
        assert_eq!(s.0[0].0.as_ref(), &[0xFF, 0x00]);
    }

    #[test]
    fn round_trips_through_wire() {
        let n = Name::from_uri("/a/b/c");
        let el = n.encode();
        let decoded = Name::decode(&el).expect("decode");
        assert_eq!(n, decoded);
    }

    #[test]
    fn is_prefix_of_respects_length() {
        let p = Name::from_uri("/a/b");
        let full = Name::from_uri("/a/b/c");
        assert!(p.is_prefix_of(&full));
        assert!(!full.is_prefix_of(&p));
    }
}
