// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The in-memory name index: an ordered map from full name to row id, with
//! selector-aware interest matching. Backed by `BTreeMap` rather than a
//! bespoke skip list — `range()` already gives logarithmic lower-bound
//! lookups, so there is nothing the original's probabilistic skip list
//! would buy here (see DESIGN.md).

use std::collections::BTreeMap;

use crate::{
    error::IndexError,
    wire::{Data, Interest, Name, selectors::{ChildSelector, Selectors}},
};

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub row_id: u64,
    pub key_locator_hash: Option<[u8; 32]>,
}

pub struct Index {
    entries: BTreeMap<Name, IndexEntry>,
    max_packets: u64,
}

impl Index {
    pub fn new(max_packets: u64) -> Self {
        Self { entries: BTreeMap::new(), max_packets }
    }

    pub fn size(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn has_name(&self, full_name: &Name) -> bool {
        self.entries.contains_key(full_name)
    }

    pub fn has(&self, data: &Data) -> bool {
        self.has_name(&data.full_name())
    }

    /// Inserts a data packet, computing its full name and key-locator hash.
    pub fn insert_data(&mut self, data: &Data, row_id: u64) -> Result<Name, IndexError> {
        let full_name = data.full_name();
        self.insert_entry(full_name.clone(), row_id, data.key_locator_hash())?;
        Ok(full_name)
    }

    /// Inserts a pre-computed entry, used both by `insert_data` and by
    /// startup replay from the storage engine's `enumerate`.
    pub fn insert_entry(
        &mut self,
        full_name: Name,
        row_id: u64,
        key_locator_hash: Option<[u8; 32]>,
    ) -> Result<(), IndexError> {
        if self.entries.contains_key(&full_name) {
            return Err(IndexError::Duplicate);
        }
        if self.entries.len() as u64 >= self.max_packets {
            return Err(IndexError::Capacity(self.max_packets));
        }
        self.entries.insert(full_name, IndexEntry { row_id, key_locator_hash });
        Ok(())
    }

    pub fn erase(&mut self, full_name: &Name) -> Option<u64> {
        self.entries.remove(full_name).map(|e| e.row_id)
    }

    pub fn find_by_name(&self, name: &Name) -> Option<(Name, u64)> {
        self.entries
            .range(name.clone()..)
            .find(|(full, _)| name.is_prefix_of(full))
            .map(|(full, e)| (full.clone(), e.row_id))
    }

    pub fn find(&self, interest: &Interest) -> Option<(Name, u64)> {
        match interest.selectors.child_selector.unwrap_or(ChildSelector::Leftmost) {
            ChildSelector::Leftmost => self.select_leftmost(interest),
            ChildSelector::Rightmost => self.select_rightmost(interest),
        }
    }

    fn select_leftmost(&self, interest: &Interest) -> Option<(Name, u64)> {
        for (full, entry) in self.entries.range(interest.name.clone()..) {
            if !interest.name.is_prefix_of(full) {
                break;
            }
            if satisfies(&interest.name, &interest.selectors, full, entry) {
                return Some((full.clone(), entry.row_id));
            }
        }
        None
    }

    /// Rightmost-child selection: shrink the window `[first, last)` from
    /// the right until the boundary is reached or a satisfying entry is
    /// found among the final sibling group.
    fn select_rightmost(&self, interest: &Interest) -> Option<(Name, u64)> {
        let name = &interest.name;
        let boundary_key = name.clone();

        let mut last_key: Option<Name> = {
            let successor = name.successor();
            self.entries.range(successor..).next().map(|(k, _)| k.clone())
        };

        loop {
            // Collect candidates strictly before `last_key` (or everything,
            // if there is no upper bound yet) that still share the prefix.
            let upper = last_key.clone();
            let mut window: Vec<(&Name, &IndexEntry)> = match &upper {
                Some(u) => self.entries.range(boundary_key.clone()..u.clone()).collect(),
                None => self.entries.range(boundary_key.clone()..).collect(),
            };
            window.retain(|(full, _)| name.is_prefix_of(full));
            if window.is_empty() {
                return None;
            }

            let prev = window.last().copied().expect("non-empty checked above");
            if window.len() == 1 {
                return if satisfies(name, &interest.selectors, prev.0, prev.1) {
                    Some((prev.0.clone(), prev.1.row_id))
                } else {
                    None
                };
            }

            // `first` = smallest entry sharing prev's (|N|+1)-length prefix.
            let prev_prefix = prev.0.get_prefix(name.len() + 1);
            let first_key = window
                .iter()
                .find(|(full, _)| prev_prefix.is_prefix_of(full))
                .map(|(full, _)| (*full).clone())
                .unwrap_or_else(|| prev.0.clone());

            let sibling_group: Vec<&(&Name, &IndexEntry)> = window
                .iter()
                .filter(|(full, _)| *full >= &first_key)
                .collect();
            if let Some((full, entry)) = sibling_group
                .iter()
                .rev()
                .find(|(full, entry)| satisfies(name, &interest.selectors, full, entry))
            {
                return Some(((*full).clone(), entry.row_id));
            }

            last_key = Some(first_key);
        }
    }
}

fn satisfies(
    interest_name: &Name,
    selectors: &Selectors,
    full_name: &Name,
    entry: &IndexEntry,
) -> bool {
    if !interest_name.is_prefix_of(full_name) {
        return false;
    }
    let suffix = (full_name.len() - interest_name.len()) as u64;
    if let Some(min) = selectors.min_suffix_components
        && suffix < min
    {
        return false;
    }
    if let Some(max) = selectors.max_suffix_components
        && suffix > max
    {
        return false;
    }
    if let Some(exclude) = &selectors.exclude
        && full_name.len() > interest_name.len()
        && exclude.excludes(&full_name.0[interest_name.len()])
    {
        return false;
    }
    if let Some(expected) = selectors.publisher_key_hash
        && entry.key_locator_hash != Some(expected)
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::wire::{
        data::{MetaInfo, Signature},
        selectors::ChildSelector,
    };

    fn data(n: &str) -> Data {
        Data {
            name: Name::from_uri(n),
            content: Bytes::from_static(b"x"),
            meta: MetaInfo::default(),
            signature: Signature { key_locator_hash: None, bits: Bytes::new() },
        }
    }

    #[test]
    fn leftmost_returns_a_satisfying_entry_under_the_prefix() {
        let mut idx = Index::new(100);
        let a = data("/a/1");
        let b = data("/a/2");
        idx.insert_data(&a, 1).expect("insert a");
        idx.insert_data(&b, 2).expect("insert b");

        let interest = Interest::new(Name::from_uri("/a"));
        let (full, _) = idx.find(&interest).expect("match");
        assert!(full == a.full_name() || full == b.full_name());
    }

    #[test]
    fn rightmost_prefers_larger_child_over_implicit_digest_of_parent() {
        let mut idx = Index::new(100);
        idx.insert_data(&data("/A/B"), 1).expect("insert");
        idx.insert_data(&data("/A/C"), 2).expect("insert");

        let mut interest = Interest::new(Name::from_uri("/A"));
        interest.selectors.child_selector = Some(ChildSelector::Rightmost);
        let (full, _) = idx.find(&interest).expect("match");
        assert_eq!(full.get_prefix(2), Name::from_uri("/A/C"));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut idx = Index::new(2);
        idx.insert_data(&data("/a"), 1).expect("insert 1");
        idx.insert_data(&data("/b"), 2).expect("insert 2");
        let err = idx.insert_data(&data("/c"), 3).unwrap_err();
        assert!(matches!(err, IndexError::Capacity(2)));
        assert_eq!(idx.size(), 2);
    }

    #[test]
    fn duplicate_full_name_is_rejected() {
        let mut idx = Index::new(100);
        let d = data("/dup");
        idx.insert_data(&d, 1).expect("first insert");
        assert!(matches!(
            idx.insert_data(&d, 2),
            Err(IndexError::Duplicate)
        ));
    }

    #[test]
    fn find_by_name_returns_lowest_matching_entry() {
        let mut idx = Index::new(100);
        idx.insert_data(&data("/p/1"), 1).expect("insert");
        let (full, _) = idx.find_by_name(&Name::from_uri("/p")).expect("match");
        assert!(Name::from_uri("/p").is_prefix_of(&full));
    }
}
