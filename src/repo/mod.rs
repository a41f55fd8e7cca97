// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The repo storage façade: joins the name index and the storage engine
//! under the invariant "index ⇔ engine", and broadcasts insert/delete
//! events for subscribers such as the read handler's auto-listen logic.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    index::Index,
    storage::StorageEngine,
    wire::{ChildSelector, Data, Interest, Name},
};

#[derive(Debug, Clone)]
pub enum StorageEvent {
    Inserted(Name),
    Deleted(Name),
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("a packet with that full name is already stored")]
    AlreadyPresent,
    #[error("index capacity exhausted")]
    Capacity,
    #[error("storage engine failure: {0}")]
    Engine(#[from] crate::error::EngineError),
}

pub struct RepoStorage<E: StorageEngine> {
    engine: E,
    index: Index,
    events: broadcast::Sender<StorageEvent>,
}

impl<E: StorageEngine> RepoStorage<E> {
    pub fn new(mut engine: E, max_packets: u64) -> Result<Self, RepoError> {
        let mut index = Index::new(max_packets);
        let mut startup_err = None;
        engine.enumerate(&mut |meta| {
            if let Err(e) =
                index.insert_entry(meta.full_name, meta.row_id, meta.key_locator_hash)
            {
                startup_err = Some(e);
            }
        })?;
        if let Some(e) = startup_err {
            warn!(error = %e, "startup replay hit an index error, repo may be over capacity");
        }
        let (events, _) = broadcast::channel(1024);
        Ok(Self { engine, index, events })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    pub fn insert_data(&mut self, data: &Data) -> Result<Name, RepoError> {
        if self.index.has(data) {
            return Err(RepoError::AlreadyPresent);
        }
        let row_id = self.engine.insert(data)?;
        match self.index.insert_data(data, row_id) {
            Ok(full_name) => {
                debug!(name = %full_name, "inserted");
                let _ = self.events.send(StorageEvent::Inserted(full_name.clone()));
                Ok(full_name)
            },
            Err(_) => {
                // Roll back the engine write so index and engine stay in sync.
                let _ = self.engine.erase(row_id);
                Err(RepoError::Capacity)
            },
        }
    }

    pub fn read(&self, interest: &Interest) -> Result<Option<Data>, RepoError> {
        match self.index.find(interest) {
            Some((_, row_id)) => Ok(self.engine.read(row_id)?),
            None => Ok(None),
        }
    }

    /// Deletes by exact name (prefix match to the lowest entry), repeating
    /// until no more entries share the prefix. A single-step failure sets
    /// an error flag but the loop keeps removing what it can; the overall
    /// result is `-1` on any failure, else the count.
    pub fn delete_by_name(&mut self, name: &Name) -> i64 {
        let mut count = 0i64;
        let mut failed = false;
        loop {
            let Some((full, row_id)) = self.index.find_by_name(name) else { break };
            match self.engine.erase(row_id) {
                Ok(_) => {
                    self.index.erase(&full);
                    let _ = self.events.send(StorageEvent::Deleted(full));
                    count += 1;
                },
                Err(e) => {
                    warn!(error = %e, "engine erase failed during delete_by_name");
                    self.index.erase(&full);
                    failed = true;
                    continue;
                },
            }
        }
        if failed { -1 } else { count }
    }

    /// Deletes by selector, forcing leftmost child selection so iteration
    /// over matching candidates is total. A single-step failure sets an
    /// error flag but the loop keeps removing what it can.
    pub fn delete_by_interest(&mut self, interest: &Interest) -> i64 {
        let mut forced = interest.clone();
        forced.selectors.child_selector = Some(ChildSelector::Leftmost);

        let mut count = 0i64;
        let mut failed = false;
        loop {
            let Some((full, row_id)) = self.index.find(&forced) else { break };
            match self.engine.erase(row_id) {
                Ok(_) => {
                    self.index.erase(&full);
                    let _ = self.events.send(StorageEvent::Deleted(full));
                    count += 1;
                },
                Err(e) => {
                    warn!(error = %e, "engine erase failed during delete_by_interest");
                    self.index.erase(&full);
                    failed = true;
                    continue;
                },
            }
        }
        if failed { -1 } else { count }
    }

    pub fn size(&self) -> u64 {
        self.index.size()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        storage::SqliteEngine,
        wire::data::{MetaInfo, Signature},
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
    fn insert_then_read_round_trips() {
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 100).expect("repo");
        let d = data("/a/b/c");
        repo.insert_data(&d).expect("insert");

        let interest = Interest::new(d.full_name());
        let read_back = repo.read(&interest).expect("read").expect("present");
        assert_eq!(read_back, d);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 100).expect("repo");
        let d = data("/dup");
        repo.insert_data(&d).expect("first insert");
        assert!(matches!(repo.insert_data(&d), Err(RepoError::AlreadyPresent)));
    }

    #[test]
    fn delete_by_name_removes_every_matching_entry() {
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 100).expect("repo");
        repo.insert_data(&data("/x/seg/0")).expect("insert");
        repo.insert_data(&data("/x/seg/1")).expect("insert");
        repo.insert_data(&data("/y")).expect("insert");

        let removed = repo.delete_by_name(&Name::from_uri("/x"));
        assert_eq!(removed, 2);
        assert_eq!(repo.size(), 1);
    }

    #[test]
    fn capacity_failure_surfaces_without_corrupting_engine_index_invariant() {
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 1).expect("repo");
        repo.insert_data(&data("/a")).expect("first insert succeeds");
        assert!(matches!(repo.insert_data(&data("/b")), Err(RepoError::Capacity)));
        assert_eq!(repo.size(), 1);
    }
}
