// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read handler: resolves interests out of storage and, when auto-listen is
//! enabled, maintains a use-counted registration set over a fixed-length
//! name prefix so the face only advertises reachability for names that are
//! actually present.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::{
    face::Face,
    repo::StorageEvent,
    wire::{Interest, Name},
};

pub struct ReadHandler {
    face: Arc<dyn Face>,
    subset_length: usize,
    use_counts: Mutex<HashMap<Name, u64>>,
}

impl ReadHandler {
    pub fn new(face: Arc<dyn Face>, subset_length: usize) -> Self {
        Self { face, subset_length, use_counts: Mutex::new(HashMap::new()) }
    }

    /// Drives auto-listen registration off a repo storage event stream.
    /// Intended to run as a background task for the lifetime of the repo.
    pub async fn drive_auto_listen(&self, mut events: broadcast::Receiver<StorageEvent>) {
        while let Ok(event) = events.recv().await {
            match event {
                StorageEvent::Inserted(name) => self.on_inserted(&name).await,
                StorageEvent::Deleted(name) => self.on_deleted(&name).await,
            }
        }
    }

    async fn on_inserted(&self, name: &Name) {
        let prefix = name.get_prefix(self.subset_length);
        let mut counts = self.use_counts.lock().await;
        let entry = counts.entry(prefix.clone()).or_insert(0);
        if *entry == 0 {
            self.face.register_prefix(prefix.clone());
            debug!(prefix = %prefix, "registered read prefix");
        }
        *entry += 1;
    }

    async fn on_deleted(&self, name: &Name) {
        let prefix = name.get_prefix(self.subset_length);
        let mut counts = self.use_counts.lock().await;
        if let Some(entry) = counts.get_mut(&prefix) {
            *entry = entry.saturating_sub(1);
            if *entry == 0 {
                counts.remove(&prefix);
                self.face.unregister_prefix(prefix.clone());
                debug!(prefix = %prefix, "unregistered read prefix");
            }
        }
    }

    /// Answers a single interest out of `repo`, delivering any match to the
    /// face. Silently drops non-matches — the consumer times out.
    pub fn on_interest<E: crate::storage::StorageEngine>(
        &self,
        repo: &crate::repo::RepoStorage<E>,
        interest: &Interest,
    ) {
        if let Ok(Some(data)) = repo.read(interest) {
            self.face.put_data(data);
        }
    }
}
