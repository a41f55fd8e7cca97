// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The external network boundary. The production face — wire transport and
//! packet signing — is out of scope; [`LoopbackFace`] is the in-process
//! stand-in used by tests and the demo binaries, matching outstanding
//! requests by a key in a `DashMap` rather than a bespoke registry.

use std::{sync::Mutex, time::Duration};

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};

use crate::wire::{Data, Interest, Name};

#[derive(Debug)]
pub enum FaceEvent {
    Data(Data),
    Timeout,
}

/// One pending interest handed to whichever producer registered a prefix
/// that covers it; the producer replies on `reply`. `reply` is shared with
/// an internal timeout task — whichever fires first wins, the other is a
/// silent no-op.
pub struct PendingInterest {
    pub interest: Interest,
    pub reply: SharedReply,
}

pub type SharedReply = std::sync::Arc<Mutex<Option<oneshot::Sender<FaceEvent>>>>;

impl PendingInterest {
    /// Answers with `data`, unless the face's own timeout already fired.
    pub fn reply_data(&self, data: Data) {
        if let Ok(mut guard) = self.reply.lock()
            && let Some(tx) = guard.take()
        {
            let _ = tx.send(FaceEvent::Data(data));
        }
    }
}

pub trait Face: Send + Sync {
    /// Expresses an interest on the face; the returned receiver resolves to
    /// `FaceEvent::Data` or `FaceEvent::Timeout` after `interest.lifetime`.
    fn express_interest(&self, interest: Interest) -> oneshot::Receiver<FaceEvent>;
    fn register_prefix(&self, prefix: Name);
    fn unregister_prefix(&self, prefix: Name);
    /// Delivers `data` to whoever is consuming the prefix it falls under —
    /// used by the read handler to answer a matched interest.
    fn put_data(&self, data: Data);
}

/// An in-process face. Registered prefixes get an mpsc channel of pending
/// interests; a test or demo task drains it and answers via the bundled
/// `oneshot`. `put_data` is a direct callback list keyed by exact name,
/// used by the read handler's reply path.
#[derive(Default)]
pub struct LoopbackFace {
    producers: DashMap<Name, mpsc::UnboundedSender<PendingInterest>>,
    data_sinks: DashMap<Name, mpsc::UnboundedSender<Data>>,
}

impl LoopbackFace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a producer for `prefix`, returning the receiving half the
    /// test/demo drives to answer interests.
    pub fn register_producer(&self, prefix: Name) -> mpsc::UnboundedReceiver<PendingInterest> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.producers.insert(prefix, tx);
        rx
    }

    /// Registers a consumer for data delivered under exactly `name`.
    pub fn register_consumer(&self, name: Name) -> mpsc::UnboundedReceiver<Data> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.data_sinks.insert(name, tx);
        rx
    }

    fn find_producer(
        &self,
        name: &Name,
    ) -> Option<mpsc::UnboundedSender<PendingInterest>> {
        self.producers
            .iter()
            .filter(|entry| entry.key().is_prefix_of(name))
            .max_by_key(|entry| entry.key().len())
            .map(|entry| entry.value().clone())
    }
}

impl Face for LoopbackFace {
    fn express_interest(&self, interest: Interest) -> oneshot::Receiver<FaceEvent> {
        let (tx, rx) = oneshot::channel();
        let shared = std::sync::Arc::new(Mutex::new(Some(tx)));
        let lifetime = interest.lifetime;

        if let Some(sender) = self.find_producer(&interest.name) {
            let _ = sender.send(PendingInterest { interest, reply: shared.clone() });
        }

        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Ok(mut guard) = shared.lock()
                && let Some(tx) = guard.take()
            {
                let _ = tx.send(FaceEvent::Timeout);
            }
        });
        rx
    }

    fn register_prefix(&self, _prefix: Name) {
        // Prefix registration in the loopback face is implicit: producers
        // register directly via `register_producer`. Kept as a no-op entry
        // point so handlers can call it uniformly regardless of face.
    }

    fn unregister_prefix(&self, prefix: Name) {
        self.producers.remove(&prefix);
    }

    fn put_data(&self, data: Data) {
        if let Some(sink) = self.data_sinks.get(&data.name) {
            let _ = sink.send(data);
        }
    }
}

pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);
