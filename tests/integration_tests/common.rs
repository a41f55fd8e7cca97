// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use ndn_repo_rs::{
    face::{Face, LoopbackFace},
    handlers::command_frontend::{AcceptAllValidator, CommandFrontend},
    process::{InsertTable, WatchTable},
    repo::RepoStorage,
    storage::SqliteEngine,
    wire::{
        Name, RepoCommandParameter,
        data::{Data, MetaInfo, Signature},
        tlv,
    },
};
use tokio::sync::Mutex;

pub type Harness = CommandFrontend<SqliteEngine>;

pub fn build_harness() -> (Arc<Harness>, Arc<LoopbackFace>) {
    let engine = SqliteEngine::open_in_memory().expect("open sqlite");
    let repo = Arc::new(Mutex::new(RepoStorage::new(engine, 1_000).expect("build repo")));
    let face = Arc::new(LoopbackFace::new());
    let frontend = Arc::new(CommandFrontend {
        validator: Arc::new(AcceptAllValidator),
        face: face.clone() as Arc<dyn Face>,
        repo,
        inserts: Arc::new(Mutex::new(InsertTable::default())),
        watches: Arc::new(Mutex::new(WatchTable::default())),
    });
    (frontend, face)
}

pub fn data_with(name: &str, content: &[u8]) -> Data {
    Data {
        name: Name::from_uri(name),
        content: Bytes::copy_from_slice(content),
        meta: MetaInfo::default(),
        signature: Signature { key_locator_hash: None, bits: Bytes::new() },
    }
}

pub fn encode_param(param: &RepoCommandParameter) -> tlv::Element {
    param.encode()
}

pub fn param_component(param: &RepoCommandParameter) -> ndn_repo_rs::wire::name::Component {
    let mut buf = BytesMut::new();
    encode_param(param).encode(&mut buf);
    ndn_repo_rs::wire::name::Component::from_bytes(buf.to_vec())
}
