// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::BytesMut;

use crate::{
    error::WireError,
    wire::{
        name::Component,
        tlv::Element,
        wire_types,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSelector {
    Leftmost,
    Rightmost,
}

/// A single entry in an ordered exclude filter: either a literal component
/// or the `Any` wildcard marker that opens a range up to the next literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeEntry {
    Component(Component),
    Any,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude(pub Vec<ExcludeEntry>);

impl Exclude {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds an exclude that rejects `component` and everything canonically
    /// less than it (`Any` then the component), used by the watch handler to
    /// refine its filter after each reply.
    pub fn before(component: Component) -> Self {
        Self(vec![ExcludeEntry::Any, ExcludeEntry::Component(component)])
    }

    /// Merges `other` into `self`, keeping the result sorted with `Any`
    /// markers de-duplicated. Entries are assumed already canonical within
    /// each operand.
    pub fn merge(&mut self, other: &Exclude) {
        for entry in &other.0 {
            if !self.0.contains(entry) {
                self.0.push(entry.clone());
            }
        }
    }

    pub fn excludes(&self, component: &Component) -> bool {
        let mut excluding = false;
        for entry in &self.0 {
            match entry {
                ExcludeEntry::Any => excluding = true,
                ExcludeEntry::Component(c) => {
                    if c == component {
                        return true;
                    }
                    if excluding && component < c {
                        return true;
                    }
                    excluding = false;
                },
            }
        }
        false
    }

    fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        for entry in &self.0 {
            match entry {
                ExcludeEntry::Any => Element::empty(wire_types::ANY).encode(&mut buf),
                ExcludeEntry::Component(c) => c.encode().encode(&mut buf),
            }
        }
        Element::new(wire_types::EXCLUDE, buf.freeze())
    }

    fn decode(el: &Element) -> Result<Exclude, WireError> {
        let mut entries = Vec::new();
        for child in el.children()? {
            if child.typ == wire_types::ANY {
                entries.push(ExcludeEntry::Any);
            } else {
                entries.push(ExcludeEntry::Component(Component(child.value)));
            }
        }
        Ok(Exclude(entries))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    pub min_suffix_components: Option<u64>,
    pub max_suffix_components: Option<u64>,
    pub publisher_key_hash: Option<[u8; 32]>,
    pub exclude: Option<Exclude>,
    pub child_selector: Option<ChildSelector>,
}

impl Selectors {
    pub fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        if let Some(v) = self.min_suffix_components {
            Element::nonneg(wire_types::MIN_SUFFIX_COMPONENTS, v).encode(&mut buf);
        }
        if let Some(v) = self.max_suffix_components {
            Element::nonneg(wire_types::MAX_SUFFIX_COMPONENTS, v).encode(&mut buf);
        }
        if let Some(hash) = &self.publisher_key_hash {
            Element::new(wire_types::PUBLISHER_PUBLIC_KEY_LOCATOR, hash.to_vec())
                .encode(&mut buf);
        }
        if let Some(ex) = &self.exclude {
            ex.encode().encode(&mut buf);
        }
        if let Some(sel) = self.child_selector {
            let v = match sel {
                ChildSelector::Leftmost => 0,
                ChildSelector::Rightmost => 1,
            };
            Element::nonneg(wire_types::CHILD_SELECTOR, v).encode(&mut buf);
        }
        Element::new(wire_types::SELECTORS, buf.freeze())
    }

    pub fn decode(el: &Element) -> Result<Selectors, WireError> {
        let mut out = Selectors::default();
        for child in el.children()? {
            match child.typ {
                wire_types::MIN_SUFFIX_COMPONENTS => {
                    out.min_suffix_components = Some(child.as_nonneg()?)
                },
                wire_types::MAX_SUFFIX_COMPONENTS => {
                    out.max_suffix_components = Some(child.as_nonneg()?)
                },
                wire_types::PUBLISHER_PUBLIC_KEY_LOCATOR => {
                    let arr: [u8; 32] = child
                        .value
                        .as_ref()
                        .try_into()
                        .map_err(|_| WireError::ComponentOverrun)?;
                    out.publisher_key_hash = Some(arr);
                },
                wire_types::EXCLUDE => out.exclude = Some(Exclude::decode(&child)?),
                wire_types::CHILD_SELECTOR => {
                    out.child_selector = Some(match child.as_nonneg()? {
                        0 => ChildSelector::Leftmost,
                        _ => ChildSelector::Rightmost,
                    });
                },
                _ => {},
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_rejects_range_and_point() {
        let mut ex = Exclude::new();
        ex.0.push(ExcludeEntry::Component(Component::from_str("b")));
        assert!(ex.excludes(&Component::from_str("b")));
        assert!(!ex.excludes(&Component::from_str("c")));

        let ranged = Exclude::before(Component::from_str("d"));
        assert!(ranged.excludes(&Component::from_str("a")));
        assert!(!ranged.excludes(&Component::from_str("e")));
    }

    #[test]
    fn selectors_round_trip() {
        let sel = Selectors {
            min_suffix_components: Some(1),
            max_suffix_components: Some(2),
            publisher_key_hash: Some([7u8; 32]),
            exclude: Some(Exclude::before(Component::from_str("z"))),
            child_selector: Some(ChildSelector::Rightmost),
        };
        let el = sel.encode();
        let decoded = Selectors::decode(&el).expect("decode");
        assert_eq!(sel, decoded);
    }
}
