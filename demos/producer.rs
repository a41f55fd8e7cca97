// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Thin sketch of the producer CLI role: drives an `insert` command to
//! completion against an in-process repo over the loopback `Face`, polling
//! `insert check` the way a real producer client would. Not the production
//! `put` tool.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use ndn_repo_rs::{
    face::{Face, LoopbackFace},
    handlers::command_frontend::{AcceptAllValidator, CommandFrontend, CommandKind},
    process::{InsertTable, WatchTable},
    repo::RepoStorage,
    storage::SqliteEngine,
    wire::{
        Data, Interest, Name, RepoCommandParameter, StatusCode,
        data::{MetaInfo, Signature},
    },
};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    let engine = SqliteEngine::open_in_memory().expect("open in-memory storage");
    let repo = Arc::new(Mutex::new(RepoStorage::new(engine, 1_000).expect("build repo")));
    let face = Arc::new(LoopbackFace::new());

    let name = Name::from_uri("/demo/producer/item");
    let mut producer_rx = face.register_producer(name.clone());
    tokio::spawn(async move {
        if let Some(pending) = producer_rx.recv().await {
            pending.reply_data(Data {
                name: pending.interest.name.clone(),
                content: Bytes::from_static(b"hello from the producer demo"),
                meta: MetaInfo::default(),
                signature: Signature { key_locator_hash: None, bits: Bytes::new() },
            });
        }
    });

    let frontend = CommandFrontend {
        validator: Arc::new(AcceptAllValidator),
        face: face.clone() as Arc<dyn Face>,
        repo,
        inserts: Arc::new(Mutex::new(InsertTable::default())),
        watches: Arc::new(Mutex::new(WatchTable::default())),
    };

    let insert_interest = Interest::new(Name::from_uri("/repo/insert"));
    let param = RepoCommandParameter { name: Some(name), ..Default::default() };
    let accepted = frontend.dispatch(CommandKind::Insert, &insert_interest, param).await;
    println!(
        "insert accepted: process_id={:?} status={:?}",
        accepted.process_id, accepted.status_code
    );
    let process_id = accepted.process_id.expect("insert always assigns a process id");

    let check_interest = Interest::new(Name::from_uri("/repo/insert check"));
    loop {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let check_param = RepoCommandParameter { process_id: Some(process_id), ..Default::default() };
        let resp = frontend.dispatch(CommandKind::InsertCheck, &check_interest, check_param).await;
        println!("insert check: status={:?} insert_num={:?}", resp.status_code, resp.insert_num);
        if resp.status_code == Some(StatusCode::Completed as u64) {
            break;
        }
    }
}
