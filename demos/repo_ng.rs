// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Thin sketch of the `repo-ng` daemon role against the in-process loopback
//! `Face`: builds an in-memory repo, accepts one hardcoded insert command,
//! and prints the resulting state. Not the production daemon — see
//! `src/main.rs` for that.

use std::sync::Arc;

use bytes::Bytes;
use ndn_repo_rs::{
    face::{Face, LoopbackFace},
    handlers::command_frontend::{AcceptAllValidator, CommandFrontend, CommandKind},
    process::{InsertTable, WatchTable},
    repo::RepoStorage,
    storage::SqliteEngine,
    wire::{
        Data, Interest, Name, RepoCommandParameter,
        data::{MetaInfo, Signature},
    },
};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    let engine = SqliteEngine::open_in_memory().expect("open in-memory storage");
    let repo = Arc::new(Mutex::new(RepoStorage::new(engine, 1_000).expect("build repo")));
    let face = Arc::new(LoopbackFace::new());

    let name = Name::from_uri("/demo/repo-ng/hello");
    let mut producer_rx = face.register_producer(name.clone());
    tokio::spawn(async move {
        if let Some(pending) = producer_rx.recv().await {
            pending.reply_data(Data {
                name: pending.interest.name.clone(),
                content: Bytes::from_static(b"daemon demo payload"),
                meta: MetaInfo::default(),
                signature: Signature { key_locator_hash: None, bits: Bytes::new() },
            });
        }
    });

    let frontend = CommandFrontend {
        validator: Arc::new(AcceptAllValidator),
        face: face.clone() as Arc<dyn Face>,
        repo: repo.clone(),
        inserts: Arc::new(Mutex::new(InsertTable::default())),
        watches: Arc::new(Mutex::new(WatchTable::default())),
    };

    let interest = Interest::new(Name::from_uri("/repo/insert"));
    let param = RepoCommandParameter { name: Some(name), ..Default::default() };
    let resp = frontend.dispatch(CommandKind::Insert, &interest, param).await;
    println!("insert response: {:?}", resp.status_code);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    println!("packets stored: {}", repo.lock().await.size());
}
